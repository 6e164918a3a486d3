//! Read-only configuration view.
//!
//! Loaded once at startup from the JSON config file and shared behind an
//! `Arc` for the rest of the process lifetime. The file format is:
//!
//! ```json
//! {
//!   "PortNumber": "8443",
//!   "GEFAddress": "https://gef.example.org",
//!   "Apps": { "tokenizer": "a1b2c3" }
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::error::CoreError;
use crate::job::ServiceId;

/// Errors raised while loading the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Mapping from logical service names to GEF service IDs, plus the GEF
/// base address and the port this service listens on.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    #[serde(rename = "PortNumber")]
    pub port_number: String,
    #[serde(rename = "GEFAddress")]
    pub gef_address: String,
    #[serde(rename = "Apps", default)]
    apps: HashMap<String, ServiceId>,
}

impl BridgeConfig {
    /// Build a config in code (tests, embedding).
    pub fn new(
        port_number: impl Into<String>,
        gef_address: impl Into<String>,
        apps: HashMap<String, ServiceId>,
    ) -> Self {
        Self {
            port_number: port_number.into(),
            gef_address: gef_address.into(),
            apps,
        }
    }

    /// Read, parse and validate the config file at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Parse and validate a config document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(ConfigError::Invalid(errors));
        }
        Ok(config)
    }

    /// Check the config invariants.
    ///
    /// Returns an empty `Vec` if valid; otherwise a list of human-readable errors.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.port_number.trim().parse::<u16>().is_err() {
            errors.push(format!(
                "PortNumber '{}' is not a valid TCP port",
                self.port_number
            ));
        }

        let address = self.gef_address.trim();
        if address.is_empty() {
            errors.push("GEFAddress must not be empty".to_string());
        } else {
            match Url::parse(address) {
                Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
                Ok(_) => errors.push(format!(
                    "GEFAddress '{address}' must be an absolute http(s) URI"
                )),
                Err(e) => errors.push(format!("GEFAddress '{address}' is not a valid URI: {e}")),
            }
        }

        for (name, id) in &self.apps {
            if name.is_empty() {
                errors.push("Apps contains an empty service name".to_string());
            }
            if id.as_str().is_empty() {
                errors.push(format!("Apps: service '{name}' maps to an empty ID"));
            }
        }

        errors
    }

    /// Listening port. Only meaningful on a validated config.
    pub fn port(&self) -> Option<u16> {
        self.port_number.trim().parse().ok()
    }

    /// Look up the GEF service ID for a logical service name.
    pub fn resolve_service_id(&self, name: &str) -> Result<&ServiceId, CoreError> {
        self.apps.get(name).ok_or_else(|| CoreError::NotFound {
            entity: "Service",
            name: name.to_string(),
        })
    }

    /// Number of configured services.
    pub fn service_count(&self) -> usize {
        self.apps.len()
    }
}
