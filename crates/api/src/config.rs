use std::time::Duration;

use bridgit_gef::poll::PollPolicy;

/// Server configuration loaded from environment variables.
///
/// The service map, GEF address and listening port come from the JSON file
/// at `config_path` instead (see [`bridgit_core::config::BridgeConfig`]).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Path of the JSON service-map file.
    pub config_path: String,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// Whole-request timeout in seconds (default: `300`).
    pub request_timeout_secs: u64,
    /// Deadline for each individual GEF call in seconds (default: `60`).
    pub stage_timeout_secs: u64,
    /// Output-location queries per job, including the first (default: `1`).
    pub output_poll_attempts: u32,
    /// Delay before the second output-location query in ms (default: `1000`).
    pub output_poll_interval_ms: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                  |
    /// |---------------------------|--------------------------|
    /// | `HOST`                    | `0.0.0.0`                |
    /// | `BRIDGIT_CONFIG`          | `./config/config.json`   |
    /// | `CORS_ORIGINS`            | `http://localhost:8080`  |
    /// | `REQUEST_TIMEOUT_SECS`    | `300`                    |
    /// | `STAGE_TIMEOUT_SECS`      | `60`                     |
    /// | `OUTPUT_POLL_ATTEMPTS`    | `1`                      |
    /// | `OUTPUT_POLL_INTERVAL_MS` | `1000`                   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let config_path =
            std::env::var("BRIDGIT_CONFIG").unwrap_or_else(|_| "./config/config.json".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:8080".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let stage_timeout_secs: u64 = std::env::var("STAGE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("STAGE_TIMEOUT_SECS must be a valid u64");

        let output_poll_attempts: u32 = std::env::var("OUTPUT_POLL_ATTEMPTS")
            .unwrap_or_else(|_| "1".into())
            .parse()
            .expect("OUTPUT_POLL_ATTEMPTS must be a valid u32");

        let output_poll_interval_ms: u64 = std::env::var("OUTPUT_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "1000".into())
            .parse()
            .expect("OUTPUT_POLL_INTERVAL_MS must be a valid u64");

        Self {
            host,
            config_path,
            cors_origins,
            request_timeout_secs,
            stage_timeout_secs,
            output_poll_attempts,
            output_poll_interval_ms,
        }
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }

    /// Polling policy for not-yet-finished jobs.
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            max_attempts: self.output_poll_attempts.max(1),
            initial_delay: Duration::from_millis(self.output_poll_interval_ms),
            ..PollPolicy::default()
        }
    }
}
