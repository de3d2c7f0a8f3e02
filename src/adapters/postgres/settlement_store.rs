//! PostgreSQL implementation of SettlementStore.
//!
//! `(reference, outcome)` is the primary key; `ON CONFLICT DO NOTHING`
//! turns a concurrent duplicate into `AlreadyExists`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::appointment::{PaymentReference, SettlementOutcome, SettlementRecord};
use crate::domain::foundation::{AppointmentId, DomainError, ErrorCode, Timestamp};
use crate::ports::{SaveResult, SettlementStore};

pub struct PostgresSettlementStore {
    pool: PgPool,
}

impl PostgresSettlementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SettlementRow {
    reference: String,
    outcome: String,
    appointment_id: Uuid,
    processed_at: DateTime<Utc>,
}

impl TryFrom<SettlementRow> for SettlementRecord {
    type Error = DomainError;

    fn try_from(row: SettlementRow) -> Result<Self, Self::Error> {
        Ok(SettlementRecord {
            reference: PaymentReference::new(row.reference)
                .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))?,
            outcome: SettlementOutcome::parse(&row.outcome).ok_or_else(|| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Invalid outcome value in settlements: {}", row.outcome),
                )
            })?,
            appointment_id: AppointmentId::from_uuid(row.appointment_id),
            processed_at: Timestamp::from_datetime(row.processed_at),
        })
    }
}

fn db(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Failed to {}: {}", action, e))
}

#[async_trait]
impl SettlementStore for PostgresSettlementStore {
    async fn contains(
        &self,
        reference: &PaymentReference,
        outcome: SettlementOutcome,
    ) -> Result<bool, DomainError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM settlements WHERE reference = $1 AND outcome = $2)",
        )
        .bind(reference.as_str())
        .bind(outcome.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db("check settlement", e))
    }

    async fn record(&self, record: &SettlementRecord) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO settlements (reference, outcome, appointment_id, processed_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (reference, outcome) DO NOTHING
            "#,
        )
        .bind(record.reference.as_str())
        .bind(record.outcome.as_str())
        .bind(record.appointment_id.as_uuid())
        .bind(record.processed_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db("record settlement", e))?;

        Ok(if result.rows_affected() == 0 {
            SaveResult::AlreadyExists
        } else {
            SaveResult::Inserted
        })
    }

    async fn find(&self, reference: &PaymentReference) -> Result<Vec<SettlementRecord>, DomainError> {
        let rows: Vec<SettlementRow> = sqlx::query_as(
            r#"
            SELECT reference, outcome, appointment_id, processed_at
            FROM settlements
            WHERE reference = $1
            ORDER BY processed_at
            "#,
        )
        .bind(reference.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db("find settlements", e))?;
        rows.into_iter().map(SettlementRecord::try_from).collect()
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM settlements WHERE processed_at < $1")
            .bind(cutoff.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| db("prune settlements", e))?;
        Ok(result.rows_affected())
    }
}
