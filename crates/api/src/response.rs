//! Response envelope for every BridgIt endpoint.
//!
//! A handler produces exactly one [`Envelope`], which renders to exactly one
//! HTTP response. Success bodies are a closed [`Body`] enum; error bodies use
//! the `{ "error": ..., "code": ... }` shape. Causes attached to error
//! variants are logged server-side and never sent to the client.
//!
//! Every write is logged with its status code, content type and length.

use axum::http::header::{self, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Map, Value};

pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";

/// Client-visible message for a 403.
pub const DIRECTIVE_DENIED_MESSAGE: &str = "API denied by directive";

/// Rendered when a success body cannot be encoded.
pub const UNEXPECTED_BODY_MESSAGE: &str = "Server Error: unexpected Ok body type";

/// Payload of a success response.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Map<String, Value>),
    Text(String),
}

impl From<Map<String, Value>> for Body {
    fn from(map: Map<String, Value>) -> Self {
        Body::Json(map)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl Body {
    fn encode(self) -> Result<(&'static str, Vec<u8>), serde_json::Error> {
        match self {
            Body::Json(map) => Ok((CONTENT_TYPE_JSON, serde_json::to_vec(&map)?)),
            Body::Text(text) => Ok((CONTENT_TYPE_TEXT, text.into_bytes())),
        }
    }
}

/// Every outcome a handler can write.
#[derive(Debug, Clone)]
pub enum Envelope {
    /// 200 with a JSON or text body.
    Ok(Body),
    /// 201 with a JSON or text body.
    Created(Body),
    /// 200 whose body is a URI and whose content type is `<type>+url`.
    Reference { location: String, content_type: String },
    /// 400.
    ClientError { message: String, cause: Option<String> },
    /// 403 with a fixed message.
    DirectiveError,
    /// 404.
    NotFound { message: String },
    /// 502: the execution cluster failed.
    UpstreamError { message: String, cause: Option<String> },
    /// 504: the execution cluster did not answer in time.
    UpstreamTimeout { message: String },
    /// 500.
    ServerError { message: String, cause: Option<String> },
}

impl Envelope {
    pub fn ok(body: impl Into<Body>) -> Self {
        Envelope::Ok(body.into())
    }

    pub fn created(body: impl Into<Body>) -> Self {
        Envelope::Created(body.into())
    }

    pub fn client_error(message: impl Into<String>, cause: impl ToString) -> Self {
        Envelope::ClientError {
            message: message.into(),
            cause: Some(cause.to_string()),
        }
    }

    pub fn server_error(message: impl Into<String>, cause: impl ToString) -> Self {
        Envelope::ServerError {
            message: message.into(),
            cause: Some(cause.to_string()),
        }
    }

    pub fn server_error_no_cause(message: impl Into<String>) -> Self {
        Envelope::ServerError {
            message: message.into(),
            cause: None,
        }
    }

    /// Status code this envelope renders with.
    pub fn status(&self) -> StatusCode {
        match self {
            Envelope::Ok(_) | Envelope::Reference { .. } => StatusCode::OK,
            Envelope::Created(_) => StatusCode::CREATED,
            Envelope::ClientError { .. } => StatusCode::BAD_REQUEST,
            Envelope::DirectiveError => StatusCode::FORBIDDEN,
            Envelope::NotFound { .. } => StatusCode::NOT_FOUND,
            Envelope::UpstreamError { .. } => StatusCode::BAD_GATEWAY,
            Envelope::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Envelope::ServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn render(self) -> Rendered {
        let status = self.status();
        match self {
            Envelope::Ok(body) | Envelope::Created(body) => match body.encode() {
                Ok((content_type, bytes)) => Rendered::new(status, content_type, bytes),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode response body");
                    Rendered::error(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        UNEXPECTED_BODY_MESSAGE,
                    )
                }
            },
            Envelope::Reference {
                location,
                content_type,
            } => match HeaderValue::from_str(&content_type) {
                Ok(content_type) => Rendered {
                    status,
                    location: HeaderValue::from_str(&location).ok(),
                    content_type,
                    bytes: location.into_bytes(),
                },
                Err(_) => {
                    tracing::error!(%content_type, "Unrepresentable reference content type");
                    Rendered::error(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        UNEXPECTED_BODY_MESSAGE,
                    )
                }
            },
            Envelope::ClientError { message, cause } => {
                tracing::warn!(%message, cause = cause.as_deref().unwrap_or(""), "API client error");
                Rendered::error(status, "BAD_REQUEST", &message)
            }
            Envelope::DirectiveError => {
                tracing::warn!("API denied by directive");
                Rendered::error(status, "FORBIDDEN", DIRECTIVE_DENIED_MESSAGE)
            }
            Envelope::NotFound { message } => {
                tracing::warn!(%message, "API resource not found");
                Rendered::error(status, "NOT_FOUND", &message)
            }
            Envelope::UpstreamError { message, cause } => {
                tracing::error!(%message, cause = cause.as_deref().unwrap_or(""), "API upstream error");
                Rendered::error(status, "UPSTREAM_ERROR", &message)
            }
            Envelope::UpstreamTimeout { message } => {
                tracing::error!(%message, "API upstream timeout");
                Rendered::error(status, "UPSTREAM_TIMEOUT", &message)
            }
            Envelope::ServerError { message, cause } => {
                tracing::error!(%message, cause = cause.as_deref().unwrap_or(""), "API server error");
                Rendered::error(status, "INTERNAL_ERROR", &message)
            }
        }
    }
}

/// A fully encoded response, ready to write.
struct Rendered {
    status: StatusCode,
    content_type: HeaderValue,
    location: Option<HeaderValue>,
    bytes: Vec<u8>,
}

impl Rendered {
    fn new(status: StatusCode, content_type: &'static str, bytes: Vec<u8>) -> Self {
        Self {
            status,
            content_type: HeaderValue::from_static(content_type),
            location: None,
            bytes,
        }
    }

    fn error(status: StatusCode, code: &'static str, message: &str) -> Self {
        let body = json!({
            "error": message,
            "code": code,
        });
        Self::new(status, CONTENT_TYPE_JSON, body.to_string().into_bytes())
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let Rendered {
            status,
            content_type,
            location,
            bytes,
        } = self.render();

        tracing::info!(
            status = status.as_u16(),
            content_type = content_type.to_str().unwrap_or("<binary>"),
            bytes = bytes.len(),
            "-> HTTP response",
        );

        let mut response = (status, bytes).into_response();
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, content_type);
        if let Some(location) = location {
            headers.insert(header::LOCATION, location);
        }
        response
    }
}
