//! HTTP listener settings.

use axum::http::HeaderValue;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

use super::error::ValidationError;

/// Booking requests call out to the gateway; anything slower than this is stuck.
const MAX_REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// `host:port` the API binds to.
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default)]
    pub environment: Environment,

    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Comma-separated browser origins for CORS. Empty allows any origin.
    #[serde(default)]
    pub allowed_origins: String,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ValidationError> {
        self.listen
            .parse()
            .map_err(|_| ValidationError::InvalidSocketAddr)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parsed CORS origins; blank entries between commas are skipped.
    pub fn origins(&self) -> Result<Vec<HeaderValue>, ValidationError> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(|origin| {
                let scheme_ok = origin.starts_with("https://") || origin.starts_with("http://");
                if !scheme_ok || origin.ends_with('/') {
                    return Err(ValidationError::InvalidUrl("server.allowed_origins"));
                }
                HeaderValue::from_str(origin)
                    .map_err(|_| ValidationError::InvalidUrl("server.allowed_origins"))
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.socket_addr()?;
        if !(1..=MAX_REQUEST_TIMEOUT_SECS).contains(&self.request_timeout_secs) {
            return Err(ValidationError::InvalidTimeout);
        }
        self.origins()?;
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            environment: Environment::default(),
            log_filter: default_log_filter(),
            request_timeout_secs: default_request_timeout(),
            allowed_origins: String::new(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_filter() -> String {
    "info,carebook=debug,sqlx=warn".to_string()
}

fn default_request_timeout() -> u64 {
    30
}
