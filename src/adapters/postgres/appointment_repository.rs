//! PostgreSQL implementation of AppointmentRepository.
//!
//! Status changes are compare-and-set: `UPDATE ... WHERE id = $1 AND
//! status = $expected`. The partial unique index on active appointments
//! per slot backs up the slot reservation at the storage level.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::appointment::{
    Appointment, AppointmentStatus, CancellationReason, PaymentReference,
};
use crate::domain::foundation::{
    AppointmentId, ClientId, DomainError, ErrorCode, PatientId, ProfessionalId, SlotId, Timestamp,
};
use crate::ports::AppointmentRepository;

const ACTIVE_SLOT_INDEX: &str = "appointments_active_slot_idx";

const COLUMNS: &str = "id, professional_id, client_id, patient_id, slot_id, status, \
    payment_reference, amount, slot_ends_at, cancellation_reason, created_at, updated_at";

pub struct PostgresAppointmentRepository {
    pool: PgPool,
}

impl PostgresAppointmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_optional(&self, sql: &str, bind: Uuid) -> Result<Option<Appointment>, DomainError> {
        let row: Option<AppointmentRow> = sqlx::query_as(sql)
            .bind(bind)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db("find appointment", e))?;
        row.map(Appointment::try_from).transpose()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AppointmentRow {
    id: Uuid,
    professional_id: String,
    client_id: String,
    patient_id: String,
    slot_id: Uuid,
    status: String,
    payment_reference: String,
    amount: i64,
    slot_ends_at: DateTime<Utc>,
    cancellation_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = DomainError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        let status = AppointmentStatus::parse(&row.status)
            .ok_or_else(|| corrupt("status", &row.status))?;
        let cancellation_reason = row
            .cancellation_reason
            .as_deref()
            .map(|r| CancellationReason::parse(r).ok_or_else(|| corrupt("cancellation_reason", r)))
            .transpose()?;

        Ok(Appointment {
            id: AppointmentId::from_uuid(row.id),
            professional_id: ProfessionalId::new(row.professional_id)
                .map_err(|e| corrupt("professional_id", &e.to_string()))?,
            client_id: ClientId::new(row.client_id).map_err(|e| corrupt("client_id", &e.to_string()))?,
            patient_id: PatientId::new(row.patient_id)
                .map_err(|e| corrupt("patient_id", &e.to_string()))?,
            slot_id: SlotId::from_uuid(row.slot_id),
            status,
            payment_reference: PaymentReference::new(row.payment_reference)
                .map_err(|e| corrupt("payment_reference", &e.to_string()))?,
            amount: row.amount,
            slot_ends_at: Timestamp::from_datetime(row.slot_ends_at),
            cancellation_reason,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn db(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Failed to {}: {}", action, e))
}

fn corrupt(column: &str, value: &str) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid {} value in appointments: {}", column, value),
    )
}

fn limit(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[async_trait]
impl AppointmentRepository for PostgresAppointmentRepository {
    async fn insert(&self, appointment: &Appointment) -> Result<(), DomainError> {
        sqlx::query(&format!(
            "INSERT INTO appointments ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            COLUMNS
        ))
        .bind(appointment.id.as_uuid())
        .bind(appointment.professional_id.as_str())
        .bind(appointment.client_id.as_str())
        .bind(appointment.patient_id.as_str())
        .bind(appointment.slot_id.as_uuid())
        .bind(appointment.status.as_str())
        .bind(appointment.payment_reference.as_str())
        .bind(appointment.amount)
        .bind(appointment.slot_ends_at.as_datetime())
        .bind(appointment.cancellation_reason.map(|r| r.as_str()))
        .bind(appointment.created_at.as_datetime())
        .bind(appointment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some(ACTIVE_SLOT_INDEX) {
                    return DomainError::new(
                        ErrorCode::SlotConflict,
                        format!("slot {} already has an active appointment", appointment.slot_id),
                    )
                    .with_detail("slot_id", appointment.slot_id.to_string());
                }
            }
            db("insert appointment", e)
        })?;

        Ok(())
    }

    async fn compare_and_set(
        &self,
        appointment: &Appointment,
        expected: AppointmentStatus,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE appointments SET
                status = $3,
                cancellation_reason = $4,
                updated_at = $5
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(appointment.id.as_uuid())
        .bind(expected.as_str())
        .bind(appointment.status.as_str())
        .bind(appointment.cancellation_reason.map(|r| r.as_str()))
        .bind(appointment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db("update appointment", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_by_id(&self, id: AppointmentId) -> Result<Option<Appointment>, DomainError> {
        self.fetch_optional(
            &format!("SELECT {} FROM appointments WHERE id = $1", COLUMNS),
            *id.as_uuid(),
        )
        .await
    }

    async fn find_by_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<Appointment>, DomainError> {
        let row: Option<AppointmentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM appointments WHERE payment_reference = $1",
            COLUMNS
        ))
        .bind(reference.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db("find appointment by reference", e))?;
        row.map(Appointment::try_from).transpose()
    }

    async fn find_active_for_slot(&self, slot_id: SlotId) -> Result<Option<Appointment>, DomainError> {
        self.fetch_optional(
            &format!(
                "SELECT {} FROM appointments WHERE slot_id = $1 AND status IN ('pending', 'confirmed')",
                COLUMNS
            ),
            *slot_id.as_uuid(),
        )
        .await
    }

    async fn find_pending_created_before(
        &self,
        cutoff: Timestamp,
        max: usize,
    ) -> Result<Vec<Appointment>, DomainError> {
        let rows: Vec<AppointmentRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM appointments
            WHERE status = 'pending' AND created_at <= $1
            ORDER BY created_at
            LIMIT $2
            "#,
            COLUMNS
        ))
        .bind(cutoff.as_datetime())
        .bind(limit(max))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db("list overdue appointments", e))?;
        rows.into_iter().map(Appointment::try_from).collect()
    }

    async fn find_confirmed_ended_before(
        &self,
        now: Timestamp,
        max: usize,
    ) -> Result<Vec<Appointment>, DomainError> {
        let rows: Vec<AppointmentRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM appointments
            WHERE status = 'confirmed' AND slot_ends_at <= $1
            ORDER BY created_at
            LIMIT $2
            "#,
            COLUMNS
        ))
        .bind(now.as_datetime())
        .bind(limit(max))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db("list ended appointments", e))?;
        rows.into_iter().map(Appointment::try_from).collect()
    }
}
