//! Wire types for the GEF job API.
//!
//! GEF uses Go-style capitalised field names, except for `jobID` on the
//! submission response.

use serde::Deserialize;

/// `State.Code` value while a job is still executing.
pub const STATE_CODE_RUNNING: i32 = -1;
/// `State.Code` value for a job that finished successfully.
pub const STATE_CODE_SUCCESS: i32 = 0;

/// Body returned by `POST /api/jobs`.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    #[serde(rename = "jobID")]
    pub job_id: String,
    /// Relative link to the created job; logged, not followed.
    #[serde(rename = "Location", default)]
    pub location: Option<String>,
}

/// Body returned by `GET /api/jobs/{id}`.
#[derive(Debug, Deserialize)]
pub struct JobResponse {
    #[serde(rename = "Job")]
    pub job: JobInfo,
}

#[derive(Debug, Deserialize)]
pub struct JobInfo {
    /// Must match the ID the record was requested for.
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "State")]
    pub state: JobState,
    /// Link to the job's output file. May be relative to the GEF base URL.
    #[serde(rename = "OutputURL", default)]
    pub output_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JobState {
    #[serde(rename = "Status", default)]
    pub status: String,
    #[serde(rename = "Error", default)]
    pub error: String,
    #[serde(rename = "Code")]
    pub code: i32,
}

/// Where a job stands, derived from its [`JobState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobPhase {
    Running,
    Finished,
    Failed { code: i32, message: String },
}

impl JobState {
    pub fn phase(&self) -> JobPhase {
        match self.code {
            STATE_CODE_RUNNING => JobPhase::Running,
            STATE_CODE_SUCCESS => JobPhase::Finished,
            code => {
                let message = if self.error.is_empty() {
                    self.status.clone()
                } else {
                    self.error.clone()
                };
                JobPhase::Failed { code, message }
            }
        }
    }
}
