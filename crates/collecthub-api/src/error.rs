use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use collecthub_core::{CollectHubError, RecordId};
use serde_json::json;
use std::fmt::Display;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("CollectHub error: {0}")]
    CollectHub(#[from] CollectHubError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Log `cause` and answer with a 500 carrying only `message`.
    pub fn internal(message: impl Into<String>, cause: impl Display) -> Self {
        let message = message.into();
        error!("{}: {}", message, cause);
        ApiError::Internal(message)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::CollectHub(CollectHubError::InvalidId(_)) => StatusCode::BAD_REQUEST,
            ApiError::CollectHub(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            ApiError::CollectHub(ref err) if status.is_server_error() => {
                error!("Request failed: {}", err);
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Unwrap a JSON body, answering 400 with `message` when it does not parse.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>, message: &str) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| {
            tracing::debug!("Rejected request body: {}", rejection);
            ApiError::BadRequest(message.to_string())
        })
}

/// Parse a path identifier, answering 400 `invalid <noun> ID` when malformed.
pub fn parse_id(raw: &str, noun: &str) -> ApiResult<RecordId> {
    RecordId::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("invalid {} ID", noun)))
}
