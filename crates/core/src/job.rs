//! Per-request job types.
//!
//! Everything here is created and dropped within a single `/jobs` request;
//! nothing is shared between requests.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::sniff;

/// Query parameter carrying the logical service name.
pub const PARAM_SERVICE: &str = "service";
/// Query parameter carrying the caller's opaque access token.
pub const PARAM_TOKEN: &str = "token";
/// Query parameter carrying the input artifact reference.
pub const PARAM_INPUT: &str = "input";

/// Execution-service identifier on the GEF side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(String);

impl ServiceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque job identifier handed back by the execution cluster. Never
/// interpreted, only passed back on the next call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteJobHandle(String);

impl RemoteJobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteJobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a job request was rejected before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobParamError {
    #[error("Missing required query parameter '{0}'")]
    Missing(&'static str),

    #[error("Query parameter '{0}' must not be empty")]
    Empty(&'static str),
}

/// The three inputs a job submission needs, all guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequestParams {
    pub service_name: String,
    pub access_token: String,
    pub input_file_ref: String,
}

impl JobRequestParams {
    /// Build validated params from raw (optional) query values.
    ///
    /// Parameters are checked in `service`, `token`, `input` order and the
    /// first problem found is returned.
    pub fn from_query(
        service: Option<String>,
        token: Option<String>,
        input: Option<String>,
    ) -> Result<Self, JobParamError> {
        Ok(Self {
            service_name: require(PARAM_SERVICE, service)?,
            access_token: require(PARAM_TOKEN, token)?,
            input_file_ref: require(PARAM_INPUT, input)?,
        })
    }
}

fn require(name: &'static str, value: Option<String>) -> Result<String, JobParamError> {
    match value {
        None => Err(JobParamError::Missing(name)),
        Some(v) if v.trim().is_empty() => Err(JobParamError::Empty(name)),
        Some(v) => Ok(v),
    }
}

/// Dereferenceable pointer to a job's output artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputReference {
    pub location: String,
}

impl OutputReference {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

/// Fetched output bytes plus the content type sniffed from them.
#[derive(Debug, Clone)]
pub struct OutputArtifact {
    pub bytes: Bytes,
    pub sniffed_content_type: &'static str,
}

impl OutputArtifact {
    /// Wrap fetched bytes, sniffing their content type.
    pub fn sniffed(bytes: Bytes) -> Self {
        let sniffed_content_type = sniff::detect_content_type(&bytes);
        Self {
            bytes,
            sniffed_content_type,
        }
    }

    /// Content type advertised for a reference to this artifact
    /// (`<sniffed>+url`).
    pub fn reference_content_type(&self) -> String {
        format!("{}+url", self.sniffed_content_type)
    }
}
