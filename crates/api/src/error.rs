use axum::response::{IntoResponse, Response};
use bridgit_core::error::CoreError;

use crate::engine::pipeline::DispatchError;
use crate::response::Envelope;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`DispatchError`] for job
/// pipeline failures. Converts into an [`Envelope`] so error responses go
/// through the same writer (and the same logging) as success responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `bridgit_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A job dispatch that failed at some stage.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<CoreError> for Envelope {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { entity, name } => Envelope::NotFound {
                message: format!("{entity} '{name}' not found"),
            },
            CoreError::Validation(msg) => Envelope::ClientError {
                message: msg,
                cause: None,
            },
        }
    }
}

impl From<AppError> for Envelope {
    fn from(err: AppError) -> Self {
        match err {
            // --- CoreError variants ---
            AppError::Core(core) => Envelope::from(core),

            // --- Pipeline errors ---
            AppError::Dispatch(dispatch) => dispatch.into_envelope(),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => Envelope::ClientError {
                message: msg,
                cause: None,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        Envelope::from(self).into_response()
    }
}
