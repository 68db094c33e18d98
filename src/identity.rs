//! Caller identity resolution.
//!
//! The resolver never hard-fails: a request without a certificate degrades
//! to an anonymous, unauthenticated identity, and it is the authorization
//! engine's job to decide whether that identity gets in.

use std::sync::Arc;

use crate::http::request::Request;

/// The resolved caller of one request. Derived per request, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Certificate CN when authenticated, otherwise a best-effort name for
    /// the remote address, otherwise the literal address.
    pub node: String,
    /// True only if the transport asserted a successful mutual-TLS
    /// handshake with a presented certificate.
    pub authenticated: bool,
}

/// Pluggable reverse lookup used when no certificate is presented.
///
/// Called on the request path, so implementations must not block; back them
/// with a cache or an out-of-band refresher.
pub trait NodeResolver: Send + Sync {
    /// Best-effort node name for a remote address; `None` if unknown.
    fn resolve(&self, remote_addr: &str) -> Option<String>;
}

/// Default resolver: resolves nothing, so the raw address becomes the node.
pub struct NoReverseLookup;

impl NodeResolver for NoReverseLookup {
    fn resolve(&self, _remote_addr: &str) -> Option<String> {
        None
    }
}

/// Attaches an [`Identity`] to each request.
pub struct IdentityResolver {
    lookup: Arc<dyn NodeResolver>,
}

impl IdentityResolver {
    pub fn new(lookup: Arc<dyn NodeResolver>) -> Self {
        Self { lookup }
    }

    /// Resolve the caller. A CN takes precedence over any address-derived
    /// name; without a CN the caller is never authenticated, regardless of
    /// what the transport flag says.
    pub fn resolve(&self, request: &Request) -> Identity {
        if let Some(cn) = &request.client_cert_cn {
            return Identity {
                node: cn.clone(),
                authenticated: request.authenticated,
            };
        }
        let node = self
            .lookup
            .resolve(&request.remote_addr)
            .unwrap_or_else(|| request.remote_addr.clone());
        Identity {
            node,
            authenticated: false,
        }
    }
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new(Arc::new(NoReverseLookup))
    }
}
