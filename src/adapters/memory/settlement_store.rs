//! In-memory SettlementStore.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::domain::appointment::{PaymentReference, SettlementOutcome, SettlementRecord};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{SaveResult, SettlementStore};

type Key = (PaymentReference, SettlementOutcome);

#[derive(Default)]
pub struct InMemorySettlementStore {
    records: Mutex<HashMap<Key, SettlementRecord>>,
}

impl InMemorySettlementStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Key, SettlementRecord>>, DomainError> {
        self.records
            .lock()
            .map_err(|_| DomainError::new(ErrorCode::InternalError, "settlement store lock poisoned"))
    }

    pub fn len(&self) -> usize {
        self.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SettlementStore for InMemorySettlementStore {
    async fn contains(
        &self,
        reference: &PaymentReference,
        outcome: SettlementOutcome,
    ) -> Result<bool, DomainError> {
        Ok(self.lock()?.contains_key(&(reference.clone(), outcome)))
    }

    async fn record(&self, record: &SettlementRecord) -> Result<SaveResult, DomainError> {
        let mut map = self.lock()?;
        let key = (record.reference.clone(), record.outcome);
        if map.contains_key(&key) {
            return Ok(SaveResult::AlreadyExists);
        }
        map.insert(key, record.clone());
        Ok(SaveResult::Inserted)
    }

    async fn find(&self, reference: &PaymentReference) -> Result<Vec<SettlementRecord>, DomainError> {
        let mut found: Vec<_> = self
            .lock()?
            .values()
            .filter(|r| &r.reference == reference)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.processed_at);
        Ok(found)
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let mut map = self.lock()?;
        let before = map.len();
        map.retain(|_, r| !r.processed_at.is_before(&cutoff));
        Ok((before - map.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::AppointmentId;

    fn record(outcome: SettlementOutcome, at: Timestamp) -> SettlementRecord {
        SettlementRecord {
            reference: PaymentReference::new("cb_42").unwrap(),
            outcome,
            appointment_id: AppointmentId::new(),
            processed_at: at,
        }
    }

    #[tokio::test]
    async fn same_reference_and_outcome_is_recorded_once() {
        let store = InMemorySettlementStore::new();
        let r = record(SettlementOutcome::Success, Timestamp::now());
        assert_eq!(store.record(&r).await.unwrap(), SaveResult::Inserted);
        assert_eq!(store.record(&r).await.unwrap(), SaveResult::AlreadyExists);
        assert!(store.contains(&r.reference, SettlementOutcome::Success).await.unwrap());
        assert!(!store.contains(&r.reference, SettlementOutcome::Failed).await.unwrap());
    }

    #[tokio::test]
    async fn delete_before_prunes_old_records() {
        let store = InMemorySettlementStore::new();
        let now = Timestamp::now();
        store.record(&record(SettlementOutcome::Failed, now.minus_secs(100))).await.unwrap();
        store.record(&record(SettlementOutcome::Success, now)).await.unwrap();

        assert_eq!(store.delete_before(now.minus_secs(10)).await.unwrap(), 1);
        assert_eq!(store.len(), 1);
    }
}
