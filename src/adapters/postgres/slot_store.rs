//! PostgreSQL implementation of SlotStore.
//!
//! Every slot transition is one conditional UPDATE whose WHERE clause
//! carries the expected state (and holder); `rows_affected() == 0` means
//! the swap lost. A follow-up read only classifies the miss as
//! `NotFound` or `Conflict`, it never decides the outcome.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::foundation::{AppointmentId, ProfessionalId, ScheduleId, SlotId, Timestamp};
use crate::domain::scheduling::{
    AvailabilityInput, DayFilter, Schedule, Slot, SlotError, SlotState, SlotWindow,
};
use crate::ports::SlotStore;

pub struct PostgresSlotStore {
    pool: PgPool,
}

impl PostgresSlotStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Works out why a conditional UPDATE touched no row.
    async fn miss(&self, slot_id: SlotId) -> SlotError {
        let state: Result<Option<String>, sqlx::Error> =
            sqlx::query_scalar("SELECT state FROM slots WHERE id = $1")
                .bind(slot_id.as_uuid())
                .fetch_optional(&self.pool)
                .await;
        match state {
            Ok(None) => SlotError::NotFound(slot_id),
            Ok(Some(s)) => match SlotState::parse(&s) {
                Some(state) => SlotError::Conflict { slot_id, state },
                None => corrupt("state", &s),
            },
            Err(e) => db("classify slot miss", e),
        }
    }

    async fn swap(&self, sql: &str, slot_id: SlotId, holder: AppointmentId) -> Result<Slot, SlotError> {
        let row: Option<SlotRow> = sqlx::query_as(sql)
            .bind(slot_id.as_uuid())
            .bind(holder.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db("update slot", e))?;

        match row {
            Some(row) => Slot::try_from(row),
            None => Err(self.miss(slot_id).await),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ScheduleRow {
    id: Uuid,
    professional_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct SlotRow {
    id: Uuid,
    professional_id: String,
    slot_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    state: String,
    holder: Option<Uuid>,
}

impl TryFrom<SlotRow> for Slot {
    type Error = SlotError;

    fn try_from(row: SlotRow) -> Result<Self, Self::Error> {
        let state = SlotState::parse(&row.state).ok_or_else(|| corrupt("state", &row.state))?;
        Ok(Slot {
            id: SlotId::from_uuid(row.id),
            professional_id: ProfessionalId::new(row.professional_id.clone())
                .map_err(|_| corrupt("professional_id", &row.professional_id))?,
            window: SlotWindow::new(row.slot_date, row.start_time, row.end_time),
            state,
            holder: row.holder.map(AppointmentId::from_uuid),
        })
    }
}

const SLOT_COLUMNS: &str =
    "id, professional_id, slot_date, start_time, end_time, state, holder";

fn db(action: &str, e: sqlx::Error) -> SlotError {
    SlotError::Infrastructure(format!("Failed to {}: {}", action, e))
}

fn corrupt(column: &str, value: &str) -> SlotError {
    SlotError::Infrastructure(format!("Invalid {} value in slots: {}", column, value))
}

fn rows_to_slots(rows: Vec<SlotRow>) -> Result<Vec<Slot>, SlotError> {
    rows.into_iter().map(Slot::try_from).collect()
}

async fn load_schedule_slots(
    tx: &mut Transaction<'_, Postgres>,
    schedule_id: Uuid,
) -> Result<Vec<Slot>, SlotError> {
    let rows: Vec<SlotRow> = sqlx::query_as(&format!(
        "SELECT {} FROM slots WHERE schedule_id = $1 ORDER BY slot_date, start_time FOR UPDATE",
        SLOT_COLUMNS
    ))
    .bind(schedule_id)
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| db("lock schedule slots", e))?;
    rows_to_slots(rows)
}

#[async_trait]
impl SlotStore for PostgresSlotStore {
    async fn publish(
        &self,
        professional_id: &ProfessionalId,
        availability: &[AvailabilityInput],
        now: Timestamp,
    ) -> Result<Schedule, SlotError> {
        let mut tx = self.pool.begin().await.map_err(|e| db("begin transaction", e))?;

        let row: ScheduleRow = sqlx::query_as(
            r#"
            INSERT INTO schedules (id, professional_id, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (professional_id) DO UPDATE SET updated_at = EXCLUDED.updated_at
            RETURNING id, professional_id, created_at, updated_at
            "#,
        )
        .bind(ScheduleId::new().as_uuid())
        .bind(professional_id.as_str())
        .bind(now.as_datetime())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db("upsert schedule", e))?;

        // Row locks keep concurrent reservations out until commit, so the
        // plan below is computed against stable slot states.
        let mut schedule = Schedule {
            id: ScheduleId::from_uuid(row.id),
            professional_id: professional_id.clone(),
            slots: load_schedule_slots(&mut tx, row.id).await?,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        };
        let changes = schedule.plan_publication(availability)?;

        for slot_id in &changes.removed {
            sqlx::query("DELETE FROM slots WHERE id = $1 AND state = 'available'")
                .bind(slot_id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| db("delete slot", e))?;
        }

        for slot in &changes.reshaped {
            sqlx::query(
                r#"
                UPDATE slots SET slot_date = $2, start_time = $3, end_time = $4
                WHERE id = $1 AND state = 'available'
                "#,
            )
            .bind(slot.id.as_uuid())
            .bind(slot.window.date)
            .bind(slot.window.start_time)
            .bind(slot.window.end_time)
            .execute(&mut *tx)
            .await
            .map_err(|e| db("reshape slot", e))?;
        }

        for slot in &changes.inserted {
            sqlx::query(
                r#"
                INSERT INTO slots (id, schedule_id, professional_id, slot_date, start_time, end_time, state)
                VALUES ($1, $2, $3, $4, $5, $6, 'available')
                "#,
            )
            .bind(slot.id.as_uuid())
            .bind(row.id)
            .bind(professional_id.as_str())
            .bind(slot.window.date)
            .bind(slot.window.start_time)
            .bind(slot.window.end_time)
            .execute(&mut *tx)
            .await
            .map_err(|e| db("insert slot", e))?;
        }

        tx.commit().await.map_err(|e| db("commit publication", e))?;

        schedule.apply(&changes, now);
        Ok(schedule)
    }

    async fn find_schedule(&self, professional_id: &ProfessionalId) -> Result<Option<Schedule>, SlotError> {
        let row: Option<ScheduleRow> = sqlx::query_as(
            "SELECT id, professional_id, created_at, updated_at FROM schedules WHERE professional_id = $1",
        )
        .bind(professional_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db("find schedule", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let slots: Vec<SlotRow> = sqlx::query_as(&format!(
            "SELECT {} FROM slots WHERE schedule_id = $1 ORDER BY slot_date, start_time",
            SLOT_COLUMNS
        ))
        .bind(row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db("load slots", e))?;

        Ok(Some(Schedule {
            id: ScheduleId::from_uuid(row.id),
            professional_id: ProfessionalId::new(row.professional_id.clone())
                .map_err(|_| corrupt("professional_id", &row.professional_id))?,
            slots: rows_to_slots(slots)?,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        }))
    }

    async fn find_slot(&self, slot_id: SlotId) -> Result<Option<Slot>, SlotError> {
        let row: Option<SlotRow> =
            sqlx::query_as(&format!("SELECT {} FROM slots WHERE id = $1", SLOT_COLUMNS))
                .bind(slot_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db("find slot", e))?;
        row.map(Slot::try_from).transpose()
    }

    async fn list_available(
        &self,
        professional_id: &ProfessionalId,
        filter: Option<DayFilter>,
    ) -> Result<Vec<Slot>, SlotError> {
        let exists: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM schedules WHERE professional_id = $1")
                .bind(professional_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db("find schedule", e))?;
        if exists.is_none() {
            return Err(SlotError::ScheduleNotFound(professional_id.clone()));
        }

        let rows: Vec<SlotRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM slots
            WHERE professional_id = $1 AND state = 'available'
            ORDER BY slot_date, start_time
            "#,
            SLOT_COLUMNS
        ))
        .bind(professional_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db("list available slots", e))?;

        let slots = rows_to_slots(rows)?;
        Ok(match filter {
            Some(f) => slots.into_iter().filter(|s| f.matches(s.window.date)).collect(),
            None => slots,
        })
    }

    async fn reserve(&self, slot_id: SlotId, holder: AppointmentId) -> Result<Slot, SlotError> {
        self.swap(
            &format!(
                r#"
                UPDATE slots SET state = 'reserved', holder = $2
                WHERE id = $1 AND state = 'available'
                RETURNING {}
                "#,
                SLOT_COLUMNS
            ),
            slot_id,
            holder,
        )
        .await
    }

    async fn finalize(&self, slot_id: SlotId, holder: AppointmentId) -> Result<Slot, SlotError> {
        self.swap(
            &format!(
                r#"
                UPDATE slots SET state = 'booked'
                WHERE id = $1 AND state = 'reserved' AND holder = $2
                RETURNING {}
                "#,
                SLOT_COLUMNS
            ),
            slot_id,
            holder,
        )
        .await
    }

    async fn release(&self, slot_id: SlotId, holder: AppointmentId) -> Result<Slot, SlotError> {
        self.swap(
            &format!(
                r#"
                UPDATE slots SET state = 'available', holder = NULL
                WHERE id = $1 AND state IN ('reserved', 'booked') AND holder = $2
                RETURNING {}
                "#,
                SLOT_COLUMNS
            ),
            slot_id,
            holder,
        )
        .await
    }

    async fn list_elapsed_held(&self, now: Timestamp, limit: usize) -> Result<Vec<Slot>, SlotError> {
        let rows: Vec<SlotRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM slots
            WHERE state <> 'available' AND (slot_date + end_time) <= $1
            ORDER BY slot_date, start_time
            LIMIT $2
            "#,
            SLOT_COLUMNS
        ))
        .bind(now.as_datetime().naive_utc())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db("list elapsed slots", e))?;
        rows_to_slots(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(state: &str, holder: Option<Uuid>) -> SlotRow {
        SlotRow {
            id: Uuid::new_v4(),
            professional_id: "dr-ada".to_string(),
            slot_date: NaiveDate::from_ymd_opt(2030, 1, 8).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            state: state.to_string(),
            holder,
        }
    }

    #[test]
    fn row_maps_to_slot() {
        let holder = Uuid::new_v4();
        let slot = Slot::try_from(row("reserved", Some(holder))).unwrap();
        assert_eq!(slot.state, SlotState::Reserved);
        assert_eq!(slot.holder, Some(AppointmentId::from_uuid(holder)));
        assert_eq!(slot.professional_id.as_str(), "dr-ada");
    }

    #[test]
    fn unknown_state_is_rejected() {
        let err = Slot::try_from(row("held", None)).unwrap_err();
        assert!(matches!(err, SlotError::Infrastructure(_)));
    }

    #[test]
    fn blank_professional_is_rejected() {
        let mut bad = row("available", None);
        bad.professional_id = String::new();
        assert!(Slot::try_from(bad).is_err());
    }
}
