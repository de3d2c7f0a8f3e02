//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `CAREBOOK` prefix and
//! nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use carebook::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod booking;
mod database;
mod error;
mod notifications;
mod payment;
mod server;

pub use booking::BookingConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use notifications::NotificationConfig;
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL; in-memory stores when absent
    pub database: Option<DatabaseConfig>,

    /// Paystack; a mock gateway is used when absent outside production
    pub payment: Option<PaymentConfig>,

    #[serde(default)]
    pub booking: BookingConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` if present (development)
    /// 2. Reads variables with the `CAREBOOK` prefix
    /// 3. Splits nested keys on `__`
    ///
    /// - `CAREBOOK__SERVER__LISTEN=0.0.0.0:8080` -> `server.listen`
    /// - `CAREBOOK__PAYMENT__SECRET_KEY=...` -> `payment.secret_key = ...`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CAREBOOK")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        if let Some(database) = &self.database {
            database.validate()?;
        }
        match &self.payment {
            Some(payment) => payment.validate()?,
            None if self.is_production() => return Err(ValidationError::PaymentRequiredInProduction),
            None => {}
        }
        self.booking.validate()?;
        self.notifications.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "CAREBOOK__SERVER__LISTEN",
        "CAREBOOK__SERVER__ENVIRONMENT",
        "CAREBOOK__DATABASE__URL",
        "CAREBOOK__PAYMENT__SECRET_KEY",
        "CAREBOOK__BOOKING__PENDING_TTL_SECS",
        "CAREBOOK__NOTIFICATIONS__URL",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    fn load_with(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        clear_env();
        for (key, value) in vars {
            env::set_var(key, value);
        }
        let result = AppConfig::load();
        clear_env();
        result
    }

    #[test]
    fn test_empty_environment_runs_in_memory() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[]).unwrap();

        assert!(config.database.is_none());
        assert!(config.payment.is_none());
        assert_eq!(config.server.listen, "0.0.0.0:8080");
        assert_eq!(config.booking.pending_ttl_secs, 900);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_nested_values_are_read() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[
            ("CAREBOOK__SERVER__LISTEN", "3000"),
            ("CAREBOOK__DATABASE__URL", "postgresql://test@localhost/carebook"),
            ("CAREBOOK__PAYMENT__SECRET_KEY", "sk_test_xxx"),
            ("CAREBOOK__BOOKING__PENDING_TTL_SECS", "600"),
            ("CAREBOOK__NOTIFICATIONS__URL", "http://relay.local/events"),
        ])
        .unwrap();

        assert_eq!(config.server.socket_addr().unwrap().port(), 3000);
        assert_eq!(config.database.unwrap().url, "postgresql://test@localhost/carebook");
        assert_eq!(config.payment.unwrap().secret_key.expose_secret(), "sk_test_xxx");
        assert_eq!(config.booking.pending_ttl_secs, 600);
        assert_eq!(config.notifications.url.as_deref(), Some("http://relay.local/events"));
    }

    #[test]
    fn test_production_requires_payment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[("CAREBOOK__SERVER__ENVIRONMENT", "production")]).unwrap();

        assert!(config.is_production());
        assert_eq!(config.validate(), Err(ValidationError::PaymentRequiredInProduction));
    }

    #[test]
    fn test_invalid_database_url_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[("CAREBOOK__DATABASE__URL", "mysql://localhost/x")]).unwrap();
        assert_eq!(config.validate(), Err(ValidationError::InvalidDatabaseUrl));
    }
}
