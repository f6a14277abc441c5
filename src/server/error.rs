use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::service::ServiceError;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Failure of one HTTP request, mapped to a status and a JSON body.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid {param}: {message}")]
    InvalidParameter { param: &'static str, message: String },

    #[error("request exceeded the {0:?} deadline")]
    Timeout(std::time::Duration),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ApiError {
    pub fn invalid(param: &'static str, message: impl Into<String>) -> Self {
        ApiError::InvalidParameter {
            param,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            ApiError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            ApiError::Service(e) => match e {
                ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                ServiceError::UpstreamNotFound => StatusCode::NOT_FOUND,
                ServiceError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
                ServiceError::UnsupportedSourceFormat(_)
                | ServiceError::EncodeFailure(_)
                | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Client-facing message. Detail stays in the logs.
    fn public_message(&self) -> String {
        match self {
            ApiError::InvalidParameter { .. } => self.to_string(),
            ApiError::Timeout(_) => "request timed out".to_string(),
            ApiError::Service(e) => match e {
                ServiceError::InvalidRequest(message) => message.clone(),
                ServiceError::UpstreamNotFound => "source image not found".to_string(),
                ServiceError::UpstreamUnavailable(_) => "upstream unavailable".to_string(),
                ServiceError::UnsupportedSourceFormat(_) => "unsupported source format".to_string(),
                ServiceError::EncodeFailure(_) => "internal encoder error".to_string(),
                ServiceError::Internal(_) => "internal error".to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), "Request failed: {}", self);
        } else {
            warn!(status = status.as_u16(), "Request rejected: {}", self);
        }

        let body = ErrorBody {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}
