// src/errors.rs
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Credential(String),

    #[error("{message}")]
    Provider {
        status: Option<u16>,
        message: String,
    },

    #[error("{0}")]
    JobFailed(String),

    #[error("Video generation did not finish after {attempts} polls ({elapsed:?})")]
    Timeout { attempts: u32, elapsed: Duration },

    #[error("Video status polling was cancelled")]
    Cancelled,

    #[error("Server error: {0}")]
    Unexpected(String),
}

impl GenError {
    pub fn provider(status: Option<u16>, message: impl Into<String>) -> Self {
        GenError::Provider {
            status,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for GenError {
    fn from(e: reqwest::Error) -> Self {
        GenError::Unexpected(e.to_string())
    }
}

impl ResponseError for GenError {
    fn status_code(&self) -> StatusCode {
        match self {
            GenError::Validation(_) => StatusCode::BAD_REQUEST,
            GenError::Credential(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // Forward the provider's own status when it is an error status.
            GenError::Provider { status, .. } => status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            GenError::JobFailed(_) => StatusCode::BAD_GATEWAY,
            GenError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GenError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            GenError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string()
        }))
    }
}
