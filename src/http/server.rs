//! Axum integration.
//!
//! # Responsibilities
//! - Expose the bridge behind a catch-all axum route
//! - Carry the transport layer's mTLS facts into the pipeline
//! - Wire middleware (tracing, timeout) and graceful shutdown
//!
//! # Design Decisions
//! - The bridge owns all routing; axum sees a single fallback handler.
//! - TLS termination happens in front of this server. Whatever terminates
//!   it inserts a [`TlsClientInfo`] request extension; absence of the
//!   extension means an unauthenticated caller.
//! - Request bodies flow into the pipeline as streams, never pre-buffered.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body as AxumBody;
use axum::extract::{ConnectInfo, State};
use axum::http::Request as AxumRequest;
use axum::response::Response;
use axum::Router;
use futures_util::TryStreamExt;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use crate::bridge::Bridge;
use crate::http::request::{Body, TransportRequest};

/// Verified client certificate facts, asserted by the TLS-terminating
/// transport in front of this server.
#[derive(Debug, Clone)]
pub struct TlsClientInfo {
    pub common_name: String,
    /// True only if mutual TLS succeeded with a presented certificate.
    pub authenticated: bool,
}

/// Build the axum router serving a bridge. Every path falls through to the
/// pipeline; axum itself routes nothing.
pub fn bridge_router(bridge: Arc<Bridge>) -> Router {
    Router::new().fallback(bridge_handler).with_state(bridge)
}

async fn bridge_handler(
    State(bridge): State<Arc<Bridge>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: AxumRequest<AxumBody>,
) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("request", %request_id);

    let tls = request.extensions().get::<TlsClientInfo>().cloned();
    let (parts, body) = request.into_parts();

    let uri = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let headers = parts
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    let stream = body
        .into_data_stream()
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>);

    let bag = TransportRequest {
        method: parts.method.as_str().to_string(),
        uri,
        headers,
        body: Body::Stream(Box::pin(stream)),
        remote_addr: addr.ip().to_string(),
        client_cert_cn: tls.as_ref().map(|t| t.common_name.clone()),
        authenticated: tls.map(|t| t.authenticated).unwrap_or(false),
    };

    bridge.handle(bag).instrument(span).await
}

/// HTTP server hosting one bridge instance.
pub struct BridgeServer {
    bridge: Arc<Bridge>,
    request_timeout: Duration,
}

impl BridgeServer {
    pub fn new(bridge: Arc<Bridge>) -> Self {
        Self {
            bridge,
            request_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Bridge server starting");

        let app = bridge_router(self.bridge)
            .layer(TimeoutLayer::new(self.request_timeout))
            .layer(TraceLayer::new_for_http());

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("Bridge server stopped");
        Ok(())
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
