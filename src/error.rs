//! Bridge error surface.
//!
//! # Design Decisions
//! - Closed enum: every non-fatal failure mode a caller can observe is a
//!   named variant, returned as a `Result`, never control-flow by panic.
//! - Each variant maps to exactly one response class (400/404/500), so the
//!   bridge's status mapping stays a single `match`.

use axum::http::StatusCode;

/// Errors produced by the bridge pipeline.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The transport bag could not be adapted into a typed request.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The request was authorized but no registered route matched its path.
    #[error("no route matched path {0}")]
    RouteNotFound(String),

    /// A handler produced output the encoder cannot turn into a wire
    /// response. Always logged with full context before surfacing.
    #[error("unencodable response: {0}")]
    UnencodableResponse(String),

    /// Startup configuration (routes, role prefixes) is invalid.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
}

impl BridgeError {
    /// The HTTP status class this error surfaces as.
    pub fn status(&self) -> StatusCode {
        match self {
            BridgeError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            BridgeError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            BridgeError::UnencodableResponse(_) | BridgeError::ConfigInvalid(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
