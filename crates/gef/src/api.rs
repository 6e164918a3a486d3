//! REST API client for a GEF execution cluster.
//!
//! Wraps the three calls the dispatch pipeline needs (job submission,
//! output location lookup, output download) using [`reqwest`]. Each call is
//! made exactly once; retry and deadline policy live with the caller.

use bytes::Bytes;
use reqwest::Url;

use bridgit_core::job::{OutputReference, RemoteJobHandle, ServiceId};

use crate::messages::{JobPhase, JobResponse, SubmitResponse};

/// HTTP client for a single GEF instance.
#[derive(Debug, Clone)]
pub struct GefApi {
    client: reqwest::Client,
    base_url: Url,
}

/// Errors from the GEF REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum GefApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    ///
    /// The request URL is stripped, since it carries the access token.
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// GEF returned a non-2xx status code.
    #[error("GEF API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A 2xx body that does not have the expected shape.
    #[error("Failed to decode GEF response: {0}")]
    Decode(String),

    /// The base address or an output link is not a usable URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The job exists but has not finished yet.
    #[error("Job {job_id} has not finished yet")]
    NotReady { job_id: String },

    /// The job finished unsuccessfully.
    #[error("Job {job_id} failed (code {code}): {message}")]
    JobFailed {
        job_id: String,
        code: i32,
        message: String,
    },

    /// The job finished but GEF reported no output link.
    #[error("Job {job_id} finished without an output link")]
    MissingOutput { job_id: String },
}

impl From<reqwest::Error> for GefApiError {
    fn from(err: reqwest::Error) -> Self {
        GefApiError::Request(err.without_url())
    }
}

impl GefApiError {
    /// Whether re-querying later could succeed.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, GefApiError::NotReady { .. })
    }
}

impl GefApi {
    /// Create a new API client for a GEF instance.
    ///
    /// * `base_url` - Base HTTP URL, e.g. `https://gef.example.org`.
    pub fn new(base_url: &str) -> Result<Self, GefApiError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, GefApiError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| GefApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(GefApiError::InvalidUrl(format!(
                "{base_url}: not a base URL"
            )));
        }
        // Relative joins below treat the base as a directory.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { client, base_url })
    }

    /// Base HTTP URL of the GEF instance.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Submit a job.
    ///
    /// Sends `POST /api/jobs?access_token=...` with the service ID and the
    /// input reference as form fields. Returns the GEF job ID.
    pub async fn submit_job(
        &self,
        service_id: &ServiceId,
        access_token: &str,
        input_ref: &str,
    ) -> Result<RemoteJobHandle, GefApiError> {
        let url = self.endpoint(&["api", "jobs"])?;
        tracing::debug!(%url, service_id = %service_id, "Submitting GEF job");

        let response = self
            .client
            .post(url)
            .query(&[("access_token", access_token)])
            .form(&[("serviceID", service_id.as_str()), ("pid", input_ref)])
            .send()
            .await?;

        let submitted: SubmitResponse = Self::parse_response(response).await?;
        if submitted.job_id.is_empty() {
            return Err(GefApiError::Decode("empty jobID in submit response".into()));
        }
        tracing::debug!(
            job_id = %submitted.job_id,
            location = submitted.location.as_deref().unwrap_or(""),
            "GEF job created",
        );
        Ok(RemoteJobHandle::new(submitted.job_id))
    }

    /// Look up where a job's output can be downloaded from.
    ///
    /// Sends `GET /api/jobs/{id}?access_token=...`. A running job yields
    /// [`GefApiError::NotReady`]; a failed one [`GefApiError::JobFailed`].
    pub async fn resolve_output_location(
        &self,
        access_token: &str,
        handle: &RemoteJobHandle,
    ) -> Result<OutputReference, GefApiError> {
        let url = self.endpoint(&["api", "jobs", handle.as_str()])?;
        tracing::debug!(%url, "Fetching GEF job state");

        let response = self
            .client
            .get(url)
            .query(&[("access_token", access_token)])
            .send()
            .await?;

        let JobResponse { job } = Self::parse_response(response).await?;
        let job_id = handle.to_string();
        if job.id != job_id {
            return Err(GefApiError::Decode(format!(
                "requested job {job_id}, got record for job {}",
                job.id
            )));
        }

        match job.state.phase() {
            JobPhase::Running => Err(GefApiError::NotReady { job_id }),
            JobPhase::Failed { code, message } => Err(GefApiError::JobFailed {
                job_id,
                code,
                message,
            }),
            JobPhase::Finished => {
                let link = job
                    .output_url
                    .filter(|link| !link.trim().is_empty())
                    .ok_or(GefApiError::MissingOutput { job_id })?;
                let location = self
                    .base_url
                    .join(&link)
                    .map_err(|e| GefApiError::InvalidUrl(format!("{link}: {e}")))?;
                Ok(OutputReference::new(location))
            }
        }
    }

    /// Download the bytes behind an output location with a plain `GET`.
    pub async fn fetch_output_bytes(&self, location: &str) -> Result<Bytes, GefApiError> {
        let url = Url::parse(location)
            .map_err(|e| GefApiError::InvalidUrl(format!("{location}: {e}")))?;
        tracing::debug!(%url, "Fetching job output");

        let response = self.client.get(url).send().await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?)
    }

    // ---- private helpers ----

    /// Build `{base}/seg/seg/...`, escaping each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GefApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GefApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`GefApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, GefApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GefApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GefApiError> {
        let response = Self::ensure_success(response).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| GefApiError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use mockito::{Matcher, Server};

    fn job_body(id: &str, code: i32, output_url: Option<&str>) -> String {
        serde_json::json!({
            "Job": {
                "ID": id,
                "State": {"Status": "whatever", "Error": "", "Code": code},
                "OutputURL": output_url,
            }
        })
        .to_string()
    }

    #[test]
    fn rejects_unparseable_base_url() {
        assert_matches!(GefApi::new("not a url"), Err(GefApiError::InvalidUrl(_)));
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let api = GefApi::new("http://gef.local/prefix").unwrap();
        assert_eq!(api.base_url(), "http://gef.local/prefix/");
    }

    #[tokio::test]
    async fn submit_job_returns_handle() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/jobs")
            .match_query(Matcher::UrlEncoded("access_token".into(), "tok".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("serviceID".into(), "svc-1".into()),
                Matcher::UrlEncoded("pid".into(), "hdl:11022/input".into()),
            ]))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"Location": "/api/jobs/j-42", "jobID": "j-42"}"#)
            .create_async()
            .await;

        let api = GefApi::new(&server.url()).unwrap();
        let handle = api
            .submit_job(&ServiceId::new("svc-1"), "tok", "hdl:11022/input")
            .await
            .unwrap();

        assert_eq!(handle.as_str(), "j-42");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn submit_job_surfaces_non_2xx() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/jobs")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("bad token")
            .create_async()
            .await;

        let api = GefApi::new(&server.url()).unwrap();
        let err = api
            .submit_job(&ServiceId::new("svc-1"), "tok", "in")
            .await
            .unwrap_err();

        assert_matches!(err, GefApiError::ApiError { status: 401, ref body } if body == "bad token");
    }

    #[tokio::test]
    async fn submit_job_rejects_undecodable_body() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/jobs")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let api = GefApi::new(&server.url()).unwrap();
        let err = api
            .submit_job(&ServiceId::new("svc-1"), "tok", "in")
            .await
            .unwrap_err();

        assert_matches!(err, GefApiError::Decode(_));
    }

    #[tokio::test]
    async fn resolve_output_location_joins_relative_link() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/jobs/j-42")
            .match_query(Matcher::UrlEncoded("access_token".into(), "tok".into()))
            .with_status(200)
            .with_body(job_body("j-42", 0, Some("/api/volumes/v-1/out.xml")))
            .create_async()
            .await;

        let api = GefApi::new(&server.url()).unwrap();
        let reference = api
            .resolve_output_location("tok", &RemoteJobHandle::new("j-42"))
            .await
            .unwrap();

        assert_eq!(
            reference.location,
            format!("{}/api/volumes/v-1/out.xml", server.url())
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn resolve_output_location_distinguishes_running_failed_missing() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/jobs/running")
            .match_query(Matcher::Any)
            .with_body(job_body("running", -1, None))
            .create_async()
            .await;
        server
            .mock("GET", "/api/jobs/failed")
            .match_query(Matcher::Any)
            .with_body(job_body("failed", 2, None))
            .create_async()
            .await;
        server
            .mock("GET", "/api/jobs/empty")
            .match_query(Matcher::Any)
            .with_body(job_body("empty", 0, Some("")))
            .create_async()
            .await;

        let api = GefApi::new(&server.url()).unwrap();

        let running = api
            .resolve_output_location("tok", &RemoteJobHandle::new("running"))
            .await
            .unwrap_err();
        assert!(running.is_not_ready());

        let failed = api
            .resolve_output_location("tok", &RemoteJobHandle::new("failed"))
            .await
            .unwrap_err();
        assert_matches!(failed, GefApiError::JobFailed { code: 2, .. });

        let missing = api
            .resolve_output_location("tok", &RemoteJobHandle::new("empty"))
            .await
            .unwrap_err();
        assert_matches!(missing, GefApiError::MissingOutput { .. });
    }

    #[tokio::test]
    async fn resolve_output_location_keeps_absolute_link() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/jobs/j-42")
            .match_query(Matcher::Any)
            .with_body(job_body(
                "j-42",
                0,
                Some("https://storage.example.org/volumes/v-1/out.xml"),
            ))
            .create_async()
            .await;

        let api = GefApi::new(&server.url()).unwrap();
        let reference = api
            .resolve_output_location("tok", &RemoteJobHandle::new("j-42"))
            .await
            .unwrap();

        assert_eq!(
            reference.location,
            "https://storage.example.org/volumes/v-1/out.xml"
        );
    }

    #[tokio::test]
    async fn resolve_output_location_rejects_record_for_other_job() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/jobs/j-42")
            .match_query(Matcher::Any)
            .with_body(job_body("j-7", 0, Some("/out")))
            .create_async()
            .await;

        let api = GefApi::new(&server.url()).unwrap();
        let err = api
            .resolve_output_location("tok", &RemoteJobHandle::new("j-42"))
            .await
            .unwrap_err();

        assert_matches!(err, GefApiError::Decode(ref msg) if msg.contains("j-7"));
    }

    #[tokio::test]
    async fn transport_errors_do_not_carry_the_token() {
        // Nothing listens on the discard port.
        let api = GefApi::new("http://127.0.0.1:9").unwrap();
        let err = api
            .submit_job(&ServiceId::new("svc-1"), "secret-token-123", "in")
            .await
            .unwrap_err();

        assert_matches!(err, GefApiError::Request(_));
        assert!(!err.to_string().contains("secret-token-123"));
        assert!(!format!("{err:?}").contains("secret-token-123"));
    }

    #[tokio::test]
    async fn fetch_output_bytes_returns_body() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/files/out.pdf")
            .with_status(200)
            .with_body("%PDF-1.7 ...")
            .create_async()
            .await;

        let api = GefApi::new(&server.url()).unwrap();
        let bytes = api
            .fetch_output_bytes(&format!("{}/files/out.pdf", server.url()))
            .await
            .unwrap();

        assert_eq!(&bytes[..], b"%PDF-1.7 ...");
    }

    #[tokio::test]
    async fn fetch_output_bytes_fails_on_404() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/files/gone")
            .with_status(404)
            .create_async()
            .await;

        let api = GefApi::new(&server.url()).unwrap();
        let err = api
            .fetch_output_bytes(&format!("{}/files/gone", server.url()))
            .await
            .unwrap_err();

        assert_matches!(err, GefApiError::ApiError { status: 404, .. });
    }
}
