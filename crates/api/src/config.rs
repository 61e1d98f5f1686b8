//! Process configuration for the HTTP server.
//!
//! Read from the environment after `dotenvy` has loaded an optional `.env`.

use agencyops_observability::LogFormat;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub jwt_secret: String,
    pub log_format: LogFormat,
    /// Load the demo agency, users and catalog at startup.
    pub seed_demo: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            log_format: LogFormat::Json,
            seed_demo: false,
        }
    }
}

impl ApiConfig {
    /// - `AGENCYOPS_BIND_ADDR` (default `0.0.0.0:8080`)
    /// - `JWT_SECRET` (insecure dev default when unset)
    /// - `AGENCYOPS_LOG_FORMAT`: `json` | `pretty`
    /// - `AGENCYOPS_SEED_DEMO`: `true` | `false`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("AGENCYOPS_BIND_ADDR").filter(|a| !a.trim().is_empty()) {
            config.bind_addr = addr.trim().to_string();
        }

        match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => config.jwt_secret = secret,
            None => tracing::warn!("JWT_SECRET not set; using insecure dev default"),
        }

        if let Some(raw) = lookup("AGENCYOPS_LOG_FORMAT") {
            match raw.parse() {
                Ok(format) => config.log_format = format,
                Err(err) => tracing::warn!(error = %err, "invalid AGENCYOPS_LOG_FORMAT; using json"),
            }
        }

        if let Some(raw) = lookup("AGENCYOPS_SEED_DEMO") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => config.seed_demo = true,
                "0" | "false" | "no" => config.seed_demo = false,
                _ => tracing::warn!(value = %raw, "invalid AGENCYOPS_SEED_DEMO; demo seed disabled"),
            }
        }

        config
    }
}
