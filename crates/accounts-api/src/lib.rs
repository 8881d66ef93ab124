use accounts_query::ParamError;
use accounts_storage::StorageError;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One validation failure, located by where it came from in the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<&ParamError> for ErrorDetail {
    fn from(err: &ParamError) -> Self {
        Self {
            loc: err.location().iter().map(|s| s.to_string()).collect(),
            msg: err.source.to_string(),
            kind: err.source.kind().to_string(),
        }
    }
}

/// Body of every error response.
///
/// Validation errors carry a list of [`ErrorDetail`]; everything else a
/// single message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorBody {
    Validation { detail: Vec<ErrorDetail> },
    Message { detail: String },
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Unprocessable entity: {} validation error(s)", detail.len())]
    UnprocessableEntity { detail: Vec<ErrorDetail> },
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// A 422 for a single hand-built detail, e.g. a bad path segment.
    pub fn invalid_input(loc: [&str; 2], msg: impl Into<String>, kind: &str) -> Self {
        Self::UnprocessableEntity {
            detail: vec![ErrorDetail {
                loc: loc.iter().map(|s| s.to_string()).collect(),
                msg: msg.into(),
                kind: kind.to_string(),
            }],
        }
    }

    /// Aggregate parameter failures into one 422.
    pub fn from_param_errors<'a>(errors: impl IntoIterator<Item = &'a ParamError>) -> Self {
        Self::UnprocessableEntity {
            detail: errors.into_iter().map(ErrorDetail::from).collect(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        match self {
            ApiError::UnprocessableEntity { detail } => ErrorBody::Validation {
                detail: detail.clone(),
            },
            ApiError::NotFound(msg) | ApiError::Internal(msg) => ErrorBody::Message {
                detail: msg.clone(),
            },
        }
    }
}

impl From<ParamError> for ApiError {
    fn from(err: ParamError) -> Self {
        Self::from_param_errors([&err])
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        if err.is_not_found() {
            return Self::NotFound(err.to_string());
        }
        tracing::error!(category = %err.category(), error = %err, "storage operation failed");
        Self::internal("Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::to_vec(&self.to_body()).unwrap_or_else(|_| b"{}".to_vec());

        axum::http::Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(axum::body::Body::from(body))
            .unwrap_or_else(|_| (StatusCode::INTERNAL_SERVER_ERROR, "{}").into_response())
    }
}
