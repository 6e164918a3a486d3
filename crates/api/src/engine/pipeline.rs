//! The job dispatch pipeline.
//!
//! ```text
//! ResolvingService -> Submitting -> LocatingOutput -> Fetching -> done
//!        |                |               |              |
//!        +----------------+---------------+--------------+--> DispatchError
//! ```
//!
//! Each GEF stage consumes the previous stage's output and every GEF call
//! runs under its own deadline; while polling for output, each location
//! query gets a fresh one. The first failure ends the dispatch; later stages
//! never run. Dropping the future (e.g. because the caller disconnected) cancels
//! whichever stage is in flight.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bridgit_core::config::BridgeConfig;
use bridgit_core::error::CoreError;
use bridgit_core::job::{JobRequestParams, OutputArtifact, OutputReference};
use bridgit_gef::api::GefApiError;
use bridgit_gef::backend::ExecutionBackend;
use bridgit_gef::poll::{poll_with_backoff, PollPolicy};
use tracing::Instrument;

use crate::response::Envelope;

/// Default deadline for a single GEF call.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(60);

/// The remote stages of a dispatch, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Submitting,
    LocatingOutput,
    Fetching,
}

impl Stage {
    /// Client-visible description of a failure in this stage.
    pub fn failure_message(self) -> &'static str {
        match self {
            Stage::Submitting => "Error while starting a new job",
            Stage::LocatingOutput => "Error while getting a link to the output file",
            Stage::Fetching => "Error while reading the output file",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Submitting => "job submission",
            Stage::LocatingOutput => "output location lookup",
            Stage::Fetching => "output fetch",
        })
    }
}

/// Why a dispatch did not produce an output reference.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Resolve(#[from] CoreError),

    #[error("{stage} failed: {source}")]
    Remote {
        stage: Stage,
        #[source]
        source: GefApiError,
    },

    #[error("{stage} timed out after {after:?}")]
    TimedOut { stage: Stage, after: Duration },
}

impl DispatchError {
    /// The stage that failed, if the failure was remote.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            DispatchError::Resolve(_) => None,
            DispatchError::Remote { stage, .. } | DispatchError::TimedOut { stage, .. } => {
                Some(*stage)
            }
        }
    }

    /// Whether the failure is a job that has not finished yet.
    fn is_not_ready(&self) -> bool {
        matches!(self, DispatchError::Remote { source, .. } if source.is_not_ready())
    }

    /// Map to the response envelope. Upstream causes stay server-side.
    ///
    /// GEF refusing the caller's token (401/403) is a denial, not an
    /// upstream fault.
    pub fn into_envelope(self) -> Envelope {
        match self {
            DispatchError::Resolve(core) => Envelope::from(core),
            DispatchError::Remote {
                source: GefApiError::ApiError { status: 401 | 403, .. },
                ..
            } => Envelope::DirectiveError,
            DispatchError::Remote { stage, source } => Envelope::UpstreamError {
                message: stage.failure_message().to_string(),
                cause: Some(source.to_string()),
            },
            DispatchError::TimedOut { stage, .. } => Envelope::UpstreamTimeout {
                message: format!("{} (timed out)", stage.failure_message()),
            },
        }
    }
}

/// Result of a successful dispatch.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub reference: OutputReference,
    pub artifact: OutputArtifact,
}

/// Drives jobs through the GEF. Shared read-only across requests.
pub struct JobPipeline {
    bridge: Arc<BridgeConfig>,
    backend: Arc<dyn ExecutionBackend>,
    stage_timeout: Duration,
    poll: PollPolicy,
}

impl JobPipeline {
    pub fn new(bridge: Arc<BridgeConfig>, backend: Arc<dyn ExecutionBackend>) -> Self {
        Self {
            bridge,
            backend,
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
            poll: PollPolicy::default(),
        }
    }

    pub fn with_stage_timeout(mut self, stage_timeout: Duration) -> Self {
        self.stage_timeout = stage_timeout;
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Run one job end to end.
    ///
    /// Failures are logged here with the full dispatch context (service,
    /// masked token, input, job ID, output location, cluster address).
    pub async fn run(&self, params: &JobRequestParams) -> Result<DispatchOutcome, DispatchError> {
        let span = tracing::info_span!(
            "dispatch",
            service = %params.service_name,
            token = %mask_token(&params.access_token),
            input = %params.input_file_ref,
            gef = %self.backend.address(),
            service_id = tracing::field::Empty,
            job_id = tracing::field::Empty,
            location = tracing::field::Empty,
        );

        async {
            let result = self.dispatch(params).await;
            match &result {
                Ok(outcome) => tracing::info!(
                    content_type = outcome.artifact.sniffed_content_type,
                    bytes = outcome.artifact.bytes.len(),
                    "Job output resolved",
                ),
                Err(e) => tracing::error!(error = %e, stage = ?e.stage(), "Job dispatch failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, params: &JobRequestParams) -> Result<DispatchOutcome, DispatchError> {
        let span = tracing::Span::current();

        let service_id = self.bridge.resolve_service_id(&params.service_name)?;
        span.record("service_id", service_id.as_str());

        let handle = self
            .stage(
                Stage::Submitting,
                self.backend
                    .submit_job(service_id, &params.access_token, &params.input_file_ref),
            )
            .await?;
        span.record("job_id", handle.as_str());
        tracing::debug!("Job submitted");

        let token = params.access_token.as_str();
        let job = &handle;
        let reference = poll_with_backoff(&self.poll, DispatchError::is_not_ready, move || {
            self.stage(
                Stage::LocatingOutput,
                self.backend.resolve_output_location(token, job),
            )
        })
        .await?;
        span.record("location", reference.location.as_str());
        tracing::debug!("Output location resolved");

        let bytes = self
            .stage(
                Stage::Fetching,
                self.backend.fetch_output_bytes(&reference.location),
            )
            .await?;

        Ok(DispatchOutcome {
            reference,
            artifact: OutputArtifact::sniffed(bytes),
        })
    }

    /// Run one remote stage under the stage deadline.
    async fn stage<T, F>(&self, stage: Stage, call: F) -> Result<T, DispatchError>
    where
        F: Future<Output = Result<T, GefApiError>>,
    {
        match tokio::time::timeout(self.stage_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(DispatchError::Remote { stage, source }),
            Err(_) => Err(DispatchError::TimedOut {
                stage,
                after: self.stage_timeout,
            }),
        }
    }
}

/// Keep only a short prefix of the caller's token for log correlation.
fn mask_token(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{prefix}****")
}
