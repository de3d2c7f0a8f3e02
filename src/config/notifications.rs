//! Notification fan-out configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Where appointment notifications are delivered.
///
/// Without a `url` events are only written to the log.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationConfig {
    /// Relay endpoint that receives each event envelope as a JSON POST
    pub url: Option<String>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl NotificationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(5))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(url) = &self.url {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(ValidationError::InvalidUrl("notifications.url"));
            }
        }
        if self.timeout_secs == Some(0) {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_valid() {
        let config = NotificationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn url_must_be_http() {
        let config = NotificationConfig {
            url: Some("relay.internal/events".to_string()),
            timeout_secs: None,
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidUrl("notifications.url")));
    }
}
