use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::EngineError;

pub type StandardResponse<T> = Result<T, FailureResponse>;

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug)]
pub enum FailureResponse {
    BadRequest(ErrorBody),
    NotFound(ErrorBody),
    Unauthorized(ErrorBody),
    Forbidden(ErrorBody),
    ServerError(ErrorBody),
}

impl FailureResponse {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        FailureResponse::Unauthorized(ErrorBody {
            kind: "unauthorized",
            message: message.into(),
            details: None,
        })
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        FailureResponse::NotFound(ErrorBody {
            kind: "not_found",
            message: message.into(),
            details: None,
        })
    }
}

impl IntoResponse for FailureResponse {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            FailureResponse::BadRequest(body) => (StatusCode::BAD_REQUEST, body),
            FailureResponse::NotFound(body) => (StatusCode::NOT_FOUND, body),
            FailureResponse::Unauthorized(body) => {
                (StatusCode::UNAUTHORIZED, body)
            }
            FailureResponse::Forbidden(body) => (StatusCode::FORBIDDEN, body),
            FailureResponse::ServerError(body) => {
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for FailureResponse {
    fn from(error: EngineError) -> Self {
        let message = error.to_string();
        match error {
            EngineError::Validation(e) => FailureResponse::BadRequest(ErrorBody {
                kind: "validation",
                message,
                details: serde_json::to_value(e).ok(),
            }),
            EngineError::NotFound(e) => FailureResponse::NotFound(ErrorBody {
                kind: "not_found",
                message,
                details: serde_json::to_value(e).ok(),
            }),
            EngineError::Permission(e) => FailureResponse::Forbidden(ErrorBody {
                kind: "permission",
                message,
                details: serde_json::to_value(e).ok(),
            }),
            EngineError::Storage(_)
            | EngineError::Pool(_)
            | EngineError::Corrupt { .. }
            | EngineError::Blocking(_) => {
                tracing::error!("internal error: {message}");
                FailureResponse::ServerError(ErrorBody {
                    kind: "internal",
                    message: "internal error".to_string(),
                    details: None,
                })
            }
        }
    }
}
