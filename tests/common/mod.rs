//! Shared utilities for the integration suites.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use authz_bridge::http::server::bridge_router;
use authz_bridge::{
    Body, Bridge, Dispatcher, HandlerResponse, Identity, IdentityResolver, Request,
    RequestHandler, ResponseBody, ServerRole, TlsClientInfo, TransportRequest,
};
use axum::Extension;
use bytes::Bytes;
use tokio::net::TcpListener;

/// Install the tracing subscriber once per test binary. Honors RUST_LOG.
pub fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "authz_bridge=debug".into()),
            )
            .with_test_writer()
            .init();
    });
}

/// Transport bag for a request coming from `cn` (authenticated when
/// present) to `uri`.
pub fn bag(method: &str, uri: &str, cn: Option<&str>) -> TransportRequest {
    TransportRequest {
        method: method.into(),
        uri: uri.into(),
        headers: vec![],
        body: Body::empty(),
        remote_addr: "192.0.2.10".into(),
        client_cert_cn: cn.map(String::from),
        authenticated: cn.is_some(),
    }
}

/// Handler answering with a fixed body.
pub struct FixedHandler(pub &'static str);

#[async_trait]
impl RequestHandler for FixedHandler {
    async fn handle(&self, _request: Request, _identity: &Identity) -> HandlerResponse {
        HandlerResponse::new(200, ResponseBody::from_string(self.0), "text/plain")
    }
}

/// Handler streaming chunks forever; the client decides when to hang up.
pub struct EndlessStreamHandler;

#[async_trait]
impl RequestHandler for EndlessStreamHandler {
    async fn handle(&self, _request: Request, _identity: &Identity) -> HandlerResponse {
        let stream = futures_util::stream::repeat_with(|| {
            Ok::<Bytes, Box<dyn std::error::Error + Send + Sync>>(Bytes::from_static(
                b"streamed-chunk\n",
            ))
        });
        HandlerResponse::new(
            200,
            ResponseBody::Stream(Box::pin(stream)),
            "application/octet-stream",
        )
    }
}

/// Build a master-role bridge from rule TOML and `(prefix, handler)` routes.
pub fn master_bridge(
    rules_toml: &str,
    routes: Vec<(&str, Arc<dyn RequestHandler>)>,
) -> Arc<Bridge> {
    let rules = authz_bridge::parse_rules(rules_toml).unwrap();
    let mut dispatcher = Dispatcher::new(ServerRole::Master);
    for (prefix, handler) in routes {
        dispatcher.register(prefix, handler).unwrap();
    }
    Arc::new(Bridge::new(dispatcher, IdentityResolver::default(), rules))
}

/// Serve a bridge on an ephemeral port. When `tls` is given, every request
/// carries that client-certificate assertion, simulating the terminating
/// transport.
pub async fn spawn_server(bridge: Arc<Bridge>, tls: Option<TlsClientInfo>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let mut app = bridge_router(bridge);
    if let Some(tls) = tls {
        app = app.layer(Extension(tls));
    }
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}
