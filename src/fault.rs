//! Translation of connector faults into HTTP responses.
//!
//! Handlers return `Result<_, Fault>`; this is the only place an
//! [`ArmError`] turns into a status code.

use armc_azure::ArmError;
use armc_triggers::TriggerError;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct Fault(pub ArmError);

impl From<ArmError> for Fault {
    fn from(err: ArmError) -> Self {
        Self(err)
    }
}

impl From<TriggerError> for Fault {
    fn from(err: TriggerError) -> Self {
        Self(err.into())
    }
}

/// Status a fault is answered with.
pub fn status_for(err: &ArmError) -> StatusCode {
    match err {
        ArmError::Upstream { status, .. } | ArmError::Auth { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        ArmError::Validation(_) => StatusCode::BAD_REQUEST,
        ArmError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        ArmError::Network(_) | ArmError::Parse(_) => StatusCode::BAD_GATEWAY,
        ArmError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for Fault {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self.0, "request failed");
        } else {
            debug!(status = status.as_u16(), error = %self.0, "request rejected");
        }

        match self.0 {
            ArmError::Upstream { body, .. } => {
                (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
            }
            ArmError::Auth { message, .. } | ArmError::Validation(message) => {
                (status, message).into_response()
            }
            other => (status, other.to_string()).into_response(),
        }
    }
}
