//! Error taxonomy shared by the orchestrator, the HTTP control plane and
//! the operator console.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Domain-level failures, independent of how they are surfaced.
///
/// Mirrors the error taxonomy: each arm maps to exactly one HTTP status
/// code and one OCPP-facing behavior (`IntoResponse` does the HTTP half;
/// the orchestrator's CALLERROR mapping does the OCPP half).
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("charge point not connected")]
    NotConnected,

    #[error("not found")]
    NotFound,

    #[error("station rejected the request: {0}")]
    Rejected(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("request timed out")]
    Timeout,

    #[error("malformed OCPP frame: {0}")]
    ProtocolFramingError(String),

    #[error("disconnected while waiting for response")]
    Disconnected,
}

impl From<crate::domain::wallet::WalletError> for DomainError {
    fn from(_: crate::domain::wallet::WalletError) -> Self {
        DomainError::InsufficientFunds
    }
}

impl DomainError {
    /// The HTTP status this error maps to, per §7's propagation table.
    pub fn status_code(&self) -> StatusCode {
        match self {
            DomainError::NotConnected => StatusCode::NOT_FOUND,
            DomainError::NotFound => StatusCode::NOT_FOUND,
            DomainError::Rejected(_) => StatusCode::CONFLICT,
            DomainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DomainError::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
            DomainError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            DomainError::ProtocolFramingError(_) => StatusCode::BAD_REQUEST,
            DomainError::Disconnected => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Every error body is the flat `{detail: ...}` shape §7 specifies —
/// no nested `error`/`success` envelope.
impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
