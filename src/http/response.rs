//! Response encoding.
//!
//! # Responsibilities
//! - Turn a handler result into the wire response
//! - Turn an authorization denial into a 403 carrying the denial reason
//! - Stream streamed bodies; never buffer them to learn their length
//!
//! # Design Decisions
//! - The version header is always present, on every response shape.
//! - Extra headers pass through with their case preserved.
//! - A status or header the wire format cannot represent is a fatal
//!   `UnencodableResponse`, not a silent coercion.

use axum::body;
use axum::http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use axum::http::{Response, StatusCode};

use crate::authz::engine::Decision;
use crate::error::BridgeError;
use crate::http::request::ByteStream;

/// Header stamped on every response the bridge produces.
pub const VERSION_HEADER: &str = "x-authz-bridge-version";

/// A response body as produced by a handler.
pub enum ResponseBody {
    Buffered(bytes::Bytes),
    /// Lazily-read source; encoded with chunked transfer, total length
    /// unknown up front. The encoder takes ownership and the connection
    /// drives (and closes) the stream.
    Stream(ByteStream),
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseBody::Buffered(bytes) => f.debug_tuple("Buffered").field(bytes).finish(),
            ResponseBody::Stream(_) => f.debug_tuple("Stream").finish(),
        }
    }
}

impl ResponseBody {
    pub fn from_string(s: impl Into<String>) -> Self {
        ResponseBody::Buffered(bytes::Bytes::from(s.into()))
    }

    pub fn empty() -> Self {
        ResponseBody::Buffered(bytes::Bytes::new())
    }
}

/// What a handler hands back to the bridge.
#[derive(Debug)]
pub struct HandlerResponse {
    pub status: u16,
    pub body: ResponseBody,
    pub content_type: String,
    /// Passed through verbatim, case preserved.
    pub headers: Vec<(String, String)>,
}

impl HandlerResponse {
    pub fn new(status: u16, body: ResponseBody, content_type: impl Into<String>) -> Self {
        Self {
            status,
            body,
            content_type: content_type.into(),
            headers: Vec::new(),
        }
    }
}

/// Encode a handler result into the wire response.
pub fn encode(response: HandlerResponse) -> Result<Response<body::Body>, BridgeError> {
    let status = StatusCode::from_u16(response.status).map_err(|_| {
        BridgeError::UnencodableResponse(format!("invalid status code {}", response.status))
    })?;

    let wire_body = match response.body {
        ResponseBody::Buffered(bytes) => body::Body::from(bytes),
        ResponseBody::Stream(stream) => body::Body::from_stream(stream),
    };

    let mut builder = Response::builder().status(status);
    builder = builder.header(CONTENT_TYPE, encode_value(&response.content_type)?);
    builder = builder.header(VERSION_HEADER, env!("CARGO_PKG_VERSION"));
    for (name, value) in &response.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            BridgeError::UnencodableResponse(format!("invalid header name {name:?}"))
        })?;
        builder = builder.header(name, encode_value(value)?);
    }

    builder
        .body(wire_body)
        .map_err(|e| BridgeError::UnencodableResponse(e.to_string()))
}

/// Encode an authorization denial. Always a 403 whose body carries the
/// stable, greppable denial reason.
pub fn encode_denial(decision: &Decision) -> Response<body::Body> {
    let text = format!("Forbidden request: {}", decision.reason);
    // Static header material; the builder cannot fail here.
    Response::builder()
        .status(StatusCode::FORBIDDEN)
        .header(CONTENT_TYPE, "text/plain")
        .header(VERSION_HEADER, env!("CARGO_PKG_VERSION"))
        .body(body::Body::from(text))
        .unwrap_or_default()
}

fn encode_value(value: &str) -> Result<HeaderValue, BridgeError> {
    HeaderValue::from_str(value)
        .map_err(|_| BridgeError::UnencodableResponse(format!("invalid header value {value:?}")))
}
