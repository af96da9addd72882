//! Application configuration loaded from environment variables.

use std::time::Duration;

use serde::Deserialize;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Access Control ===
    /// Only requests whose `Host` header equals this value are served.
    /// Unset or empty disables the check.
    #[serde(default)]
    pub allowed_host: Option<String>,

    // === Server Configuration ===
    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// JSON snapshot served by the in-memory store.
    #[serde(default)]
    pub data_path: Option<String>,

    /// Upper bound for the storage check done by `/healthz`.
    #[serde(default = "default_health_timeout_ms")]
    pub health_timeout_ms: u64,

    /// Where `GET /` redirects to.
    #[serde(default = "default_docs_url")]
    pub docs_url: String,

    // === Observability ===
    /// Port for the Prometheus exporter. Unset disables it.
    #[serde(default)]
    pub metrics_port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

fn default_port() -> u16 {
    8000
}

fn default_health_timeout_ms() -> u64 {
    2000
}

fn default_docs_url() -> String {
    "https://docs.minhareceita.org".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allowed_host: None,
            port: default_port(),
            data_path: None,
            health_timeout_ms: default_health_timeout_ms(),
            docs_url: default_docs_url(),
            metrics_port: None,
            rust_log: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.health_timeout_ms == 0 {
            return Err("HEALTH_TIMEOUT_MS must be greater than 0".to_string());
        }

        if let Some(host) = self.allowed_host() {
            if host.contains("://") || host.chars().any(char::is_whitespace) {
                return Err(format!(
                    "ALLOWED_HOST must be a bare host name, got {host:?}"
                ));
            }
        }

        if !self.docs_url.starts_with("http://") && !self.docs_url.starts_with("https://") {
            return Err("DOCS_URL must be an http(s) URL".to_string());
        }

        Ok(())
    }

    /// The allowed host, with an empty value treated as unset.
    pub fn allowed_host(&self) -> Option<&str> {
        self.allowed_host.as_deref().filter(|h| !h.is_empty())
    }

    /// Tracing filter directive: `RUST_LOG`, or crate debug output when
    /// `verbose` is set.
    pub fn log_directive(&self, verbose: bool) -> String {
        if verbose {
            "cnpj_api=debug,info".to_string()
        } else {
            self.rust_log.clone()
        }
    }

    /// Health check timeout as a duration.
    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }
}
