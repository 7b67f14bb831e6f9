//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::recovery::RecoveryError;
use crate::topology::TopologyError;

/// Error returned by API handlers.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    /// The reset needs confirmation because these drives are ripping.
    ConfirmationRequired {
        bus_id: String,
        active_devices: Vec<String>,
        message: String,
    },
    Conflict(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ConfirmationRequired { .. } | ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RecoveryError> for ApiError {
    fn from(err: RecoveryError) -> Self {
        let message = err.to_string();
        match err {
            RecoveryError::ConfirmationRequired {
                bus_id,
                active_devices,
            } => ApiError::ConfirmationRequired {
                bus_id,
                active_devices,
                message,
            },
            RecoveryError::Topology(e) => e.into(),
        }
    }
}

impl From<TopologyError> for ApiError {
    fn from(err: TopologyError) -> Self {
        let message = err.to_string();
        match err {
            TopologyError::NotFound(_) => ApiError::NotFound(message),
            TopologyError::Unsupported(_) => ApiError::BadRequest(message),
            TopologyError::ResetInProgress(_) => ApiError::Conflict(message),
            TopologyError::ResetFailed { .. } => ApiError::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::ConfirmationRequired {
                bus_id,
                active_devices,
                message,
            } => json!({
                "error": message,
                "bus_id": bus_id,
                "active_devices": active_devices,
                "confirmation_required": true,
            }),
            ApiError::BadRequest(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message)
            | ApiError::Internal(message) => json!({ "error": message }),
        };
        (status, Json(body)).into_response()
    }
}
