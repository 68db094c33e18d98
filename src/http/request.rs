//! Request adaptation.
//!
//! # Responsibilities
//! - Turn the transport layer's attribute bag into a fully-typed [`Request`]
//! - Validate the HTTP method against the closed verb set
//! - Normalize headers (lower-case keys, comma-join duplicates)
//! - Percent-decode query parameters, rejecting bad escapes outright
//!
//! # Design Decisions
//! - Downstream components only ever see the typed struct; nothing fishes
//!   string keys out of a bag past this point.
//! - A decoding failure on any single parameter fails the whole adapt step.
//!   Partial parameter maps never reach the authorization engine.
//! - Bodies keep their transport shape: a buffer passes through unchanged,
//!   a stream stays a stream until a consumer explicitly buffers it.

use std::collections::HashMap;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;

use crate::error::BridgeError;

/// The closed set of verbs the bridge accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Head,
    Get,
    Put,
    Post,
    Delete,
}

impl HttpMethod {
    /// Parse a verb, case-insensitively. Anything outside the closed set is
    /// a malformed request.
    pub fn parse(s: &str) -> Result<Self, BridgeError> {
        match s.to_ascii_uppercase().as_str() {
            "HEAD" => Ok(HttpMethod::Head),
            "GET" => Ok(HttpMethod::Get),
            "PUT" => Ok(HttpMethod::Put),
            "POST" => Ok(HttpMethod::Post),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(BridgeError::MalformedRequest(format!(
                "unsupported HTTP method {other:?}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Head => "HEAD",
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fallible byte stream, boxed so transports can supply any source.
pub type ByteStream = BoxStream<'static, Result<Bytes, Box<dyn std::error::Error + Send + Sync>>>;

/// A request body: either fully in memory or a lazily-read stream.
///
/// Whichever component ultimately reads a `Stream` body owns closing it on
/// every exit path; dropping the stream releases the underlying resource.
pub enum Body {
    Buffered(Bytes),
    Stream(ByteStream),
}

impl Body {
    pub fn empty() -> Self {
        Body::Buffered(Bytes::new())
    }

    /// Drain the body into memory. Buffered bodies are returned as-is;
    /// streams are read to completion and consumed.
    pub async fn into_bytes(self) -> Result<Bytes, BridgeError> {
        match self {
            Body::Buffered(bytes) => Ok(bytes),
            Body::Stream(mut stream) => {
                let mut buf = Vec::new();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk.map_err(|e| {
                        BridgeError::MalformedRequest(format!("body read failed: {e}"))
                    })?;
                    buf.extend_from_slice(&chunk);
                }
                Ok(Bytes::from(buf))
            }
        }
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Buffered(b) => write!(f, "Body::Buffered({} bytes)", b.len()),
            Body::Stream(_) => write!(f, "Body::Stream(..)"),
        }
    }
}

/// The attribute bag handed over by the transport layer.
///
/// TLS termination and certificate verification happen before this point:
/// `client_cert_cn` is the verified common name (when a client certificate
/// was presented) and `authenticated` is the transport's assertion that
/// mutual TLS succeeded.
#[derive(Debug)]
pub struct TransportRequest {
    pub method: String,
    /// Path plus optional `?query`.
    pub uri: String,
    /// Raw header pairs as received; duplicates allowed.
    pub headers: Vec<(String, String)>,
    pub body: Body,
    pub remote_addr: String,
    pub client_cert_cn: Option<String>,
    pub authenticated: bool,
}

/// A normalized inbound request, owned by one pipeline invocation.
#[derive(Debug)]
pub struct Request {
    pub method: HttpMethod,
    pub path: String,
    /// Percent-decoded query parameters; keys unique after decoding.
    pub params: HashMap<String, String>,
    /// Lower-cased header keys; duplicate headers comma-joined.
    pub headers: HashMap<String, String>,
    pub body: Body,
    pub remote_addr: String,
    pub client_cert_cn: Option<String>,
    pub authenticated: bool,
}

impl Request {
    /// Adapt a transport bag into a typed request. Pure transform: the only
    /// resource carried across is the body stream, which the eventual
    /// consumer owns.
    pub fn adapt(bag: TransportRequest) -> Result<Self, BridgeError> {
        let method = HttpMethod::parse(&bag.method)?;

        let (path, query) = match bag.uri.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q)),
            None => (bag.uri.clone(), None),
        };
        if path.is_empty() {
            return Err(BridgeError::MalformedRequest("empty request path".into()));
        }

        let params = match query {
            Some(q) => decode_query(q)?,
            None => HashMap::new(),
        };

        let mut headers: HashMap<String, String> = HashMap::new();
        for (key, value) in &bag.headers {
            let key = key.to_ascii_lowercase();
            match headers.get_mut(&key) {
                // Duplicate header fields combine per RFC 9110 §5.3.
                Some(existing) => {
                    existing.push_str(", ");
                    existing.push_str(value);
                }
                None => {
                    headers.insert(key, value.clone());
                }
            }
        }

        Ok(Request {
            method,
            path,
            params,
            headers,
            body: bag.body,
            remote_addr: bag.remote_addr,
            client_cert_cn: bag.client_cert_cn,
            authenticated: bag.authenticated,
        })
    }
}

/// Decode a raw query string into unique parameter keys.
fn decode_query(query: &str) -> Result<HashMap<String, String>, BridgeError> {
    let mut params = HashMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = percent_decode(key)?;
        let value = percent_decode(value)?;
        params.insert(key, value);
    }
    Ok(params)
}

/// Strict percent-decoding: a `%` must be followed by two hex digits, and
/// the decoded bytes must be valid UTF-8. `+` decodes to a space.
fn percent_decode(input: &str) -> Result<String, BridgeError> {
    let raw = input.as_bytes();
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        match raw[i] {
            b'%' => {
                let byte = raw
                    .get(i + 1..i + 3)
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(|| {
                        BridgeError::MalformedRequest(format!(
                            "invalid percent-escape in query component {input:?}"
                        ))
                    })?;
                out.push(byte);
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8(out).map_err(|_| {
        BridgeError::MalformedRequest(format!("query component {input:?} is not valid UTF-8"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag(method: &str, uri: &str) -> TransportRequest {
        TransportRequest {
            method: method.into(),
            uri: uri.into(),
            headers: vec![],
            body: Body::empty(),
            remote_addr: "192.0.2.10".into(),
            client_cert_cn: None,
            authenticated: false,
        }
    }

    #[test]
    fn test_adapt_splits_path_and_params() {
        let req =
            Request::adapt(bag("GET", "/puppet/v3/node/agent1?environment=production")).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "/puppet/v3/node/agent1");
        assert_eq!(req.params["environment"], "production");
    }

    #[test]
    fn test_unknown_method_is_malformed() {
        let err = Request::adapt(bag("TRACE", "/puppet/v3/status")).unwrap_err();
        assert!(matches!(err, BridgeError::MalformedRequest(_)));
    }

    #[test]
    fn test_percent_decoding() {
        let req = Request::adapt(bag("GET", "/p?name=web%20server&x=a%2Bb")).unwrap();
        assert_eq!(req.params["name"], "web server");
        assert_eq!(req.params["x"], "a+b");
    }

    #[test]
    fn test_bad_escape_fails_whole_adapt() {
        let err = Request::adapt(bag("GET", "/p?good=1&bad=%zz")).unwrap_err();
        assert!(matches!(err, BridgeError::MalformedRequest(_)));
    }

    #[test]
    fn test_headers_lowercased_and_joined() {
        let mut b = bag("GET", "/p");
        b.headers = vec![
            ("Accept".into(), "pson".into()),
            ("ACCEPT".into(), "yaml".into()),
            ("X-Custom".into(), "v".into()),
        ];
        let req = Request::adapt(b).unwrap();
        assert_eq!(req.headers["accept"], "pson, yaml");
        assert_eq!(req.headers["x-custom"], "v");
        assert!(req.headers.get("Accept").is_none());
    }

    #[tokio::test]
    async fn test_stream_body_preserved_until_buffered() {
        let chunks: Vec<Result<Bytes, Box<dyn std::error::Error + Send + Sync>>> = vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ];
        let mut b = bag("PUT", "/p");
        b.body = Body::Stream(Box::pin(futures_util::stream::iter(chunks)));
        let req = Request::adapt(b).unwrap();
        assert!(matches!(req.body, Body::Stream(_)));
        assert_eq!(req.body.into_bytes().await.unwrap(), "hello world");
    }
}
