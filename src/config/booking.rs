//! Booking and maintenance configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::MaintenanceConfig;

/// Booking behaviour and the background sweep
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    /// How long a booking may stay unpaid before the sweep cancels it
    #[serde(default = "default_pending_ttl")]
    pub pending_ttl_secs: u64,

    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Maximum items handled per pass of one sweep
    #[serde(default = "default_sweep_batch_size")]
    pub sweep_batch_size: usize,

    /// How long processed settlement keys are kept
    #[serde(default = "default_settlement_retention")]
    pub settlement_retention_days: u64,
}

impl BookingConfig {
    pub fn maintenance(&self) -> MaintenanceConfig {
        MaintenanceConfig::default()
            .with_interval(Duration::from_secs(self.sweep_interval_secs))
            .with_pending_ttl(Duration::from_secs(self.pending_ttl_secs))
            .with_batch_size(self.sweep_batch_size)
            .with_settlement_retention(Duration::from_secs(self.settlement_retention_days * 86_400))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.pending_ttl_secs < 60 {
            return Err(ValidationError::InvalidBookingSetting("pending_ttl_secs must be at least 60"));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ValidationError::InvalidBookingSetting("sweep_interval_secs must be positive"));
        }
        if self.sweep_batch_size == 0 {
            return Err(ValidationError::InvalidBookingSetting("sweep_batch_size must be positive"));
        }
        if self.settlement_retention_days == 0 {
            return Err(ValidationError::InvalidBookingSetting(
                "settlement_retention_days must be positive",
            ));
        }
        Ok(())
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            pending_ttl_secs: default_pending_ttl(),
            sweep_interval_secs: default_sweep_interval(),
            sweep_batch_size: default_sweep_batch_size(),
            settlement_retention_days: default_settlement_retention(),
        }
    }
}

fn default_pending_ttl() -> u64 {
    15 * 60
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_sweep_batch_size() -> usize {
    200
}

fn default_settlement_retention() -> u64 {
    30
}
