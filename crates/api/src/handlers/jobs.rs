//! Handler for `POST /jobs`.
//!
//! Takes `service`, `token` and `input` from the query string, runs the job
//! through the GEF and answers with a *reference* to the output: the body is
//! the output URI and the content type is the sniffed output type with a
//! `+url` suffix.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use bridgit_core::error::CoreError;
use bridgit_core::job::{JobRequestParams, PARAM_INPUT, PARAM_SERVICE, PARAM_TOKEN};

use crate::error::{AppError, AppResult};
use crate::response::Envelope;
use crate::state::AppState;

/// POST /jobs?service=&token=&input=
///
/// Missing or empty parameters are rejected with 400 before anything is
/// sent to the GEF. When a parameter is repeated, the first value is used.
pub async fn start_job(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> AppResult<Envelope> {
    let Query(pairs) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let params = JobRequestParams::from_query(
        first_value(&pairs, PARAM_SERVICE),
        first_value(&pairs, PARAM_TOKEN),
        first_value(&pairs, PARAM_INPUT),
    )
    .map_err(|e| CoreError::Validation(e.to_string()))?;

    let outcome = state.pipeline.run(&params).await?;

    Ok(Envelope::Reference {
        content_type: outcome.artifact.reference_content_type(),
        location: outcome.reference.location,
    })
}

fn first_value(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
}
