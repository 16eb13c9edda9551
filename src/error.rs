use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("bad request: {0}")]
    MalformedBody(#[from] serde_json::Error),
    #[error("missing {0}")]
    MissingFields(&'static str),
    #[error("room not found")]
    RoomNotFound,
    #[error("target not found")]
    TargetNotFound,
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MalformedBody(_) | RelayError::MissingFields(_) => {
                StatusCode::BAD_REQUEST
            }
            RelayError::RoomNotFound | RelayError::TargetNotFound => StatusCode::NOT_FOUND,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    error: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(status = status.as_u16(), "relay request rejected: {}", self);
        (
            status,
            Json(ErrorBody {
                status: "error",
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
