//! SettlementStore port - idempotency tracking for payment settlements.
//!
//! Gateways deliver at-least-once, so the same reference can arrive any
//! number of times, by webhook and by polling. The store remembers the last
//! outcome applied per reference.

use async_trait::async_trait;

use crate::domain::appointment::{PaymentReference, SettlementOutcome, SettlementRecord};
use crate::domain::foundation::{DomainError, Timestamp};

/// Result of recording a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// First time this `(reference, outcome)` was seen.
    Inserted,
    /// Already recorded; nothing written.
    AlreadyExists,
}

#[async_trait]
pub trait SettlementStore: Send + Sync {
    /// True if `(reference, outcome)` has been applied before.
    async fn contains(
        &self,
        reference: &PaymentReference,
        outcome: SettlementOutcome,
    ) -> Result<bool, DomainError>;

    /// Records an applied settlement.
    async fn record(&self, record: &SettlementRecord) -> Result<SaveResult, DomainError>;

    async fn find(&self, reference: &PaymentReference) -> Result<Vec<SettlementRecord>, DomainError>;

    /// Drops records processed before `cutoff`. Returns how many went.
    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError>;
}
