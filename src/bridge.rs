//! The request pipeline.
//!
//! # Responsibilities
//! - Run adapt → identify → authorize → dispatch → encode for each request
//! - Hold the current rule set snapshot and apply watcher updates
//! - Map pipeline errors to their response classes (400/403/404/500)
//!
//! # Design Decisions
//! - The rule set is read through an `ArcSwap` snapshot: one lock-free load
//!   per request. An evaluation that started before a reload finishes runs
//!   entirely against the snapshot it loaded; concurrent generations simply
//!   coexist until their requests drain.
//! - Denials never reach the dispatcher; the encoder produces the 403
//!   directly from the decision.

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::body;
use axum::http::header::CONTENT_TYPE;
use axum::http::Response;
use tokio::sync::mpsc;

use crate::authz::rule::RuleSet;
use crate::authz::{self, Decision};
use crate::dispatch::Dispatcher;
use crate::error::BridgeError;
use crate::http::request::{Request, TransportRequest};
use crate::http::response::{self, VERSION_HEADER};
use crate::identity::IdentityResolver;

/// Authorization and dispatch bridge for one server instance.
pub struct Bridge {
    rules: ArcSwap<RuleSet>,
    resolver: IdentityResolver,
    dispatcher: Dispatcher,
}

impl Bridge {
    pub fn new(dispatcher: Dispatcher, resolver: IdentityResolver, rules: RuleSet) -> Self {
        Self {
            rules: ArcSwap::from_pointee(rules),
            resolver,
            dispatcher,
        }
    }

    /// The rule set snapshot new evaluations will use.
    pub fn current_rules(&self) -> Arc<RuleSet> {
        self.rules.load_full()
    }

    /// Atomically replace the rule set. In-flight evaluations keep the
    /// snapshot they already loaded.
    pub fn store_rules(&self, rules: RuleSet) {
        self.rules.store(Arc::new(rules));
    }

    /// Consume watcher updates until the sender side goes away.
    pub async fn apply_updates(&self, mut updates: mpsc::UnboundedReceiver<RuleSet>) {
        while let Some(rules) = updates.recv().await {
            tracing::info!(rules = rules.len(), "Swapping in reloaded rule set");
            self.store_rules(rules);
        }
    }

    /// Process one inbound request end to end.
    pub async fn handle(&self, bag: TransportRequest) -> Response<body::Body> {
        let request = match Request::adapt(bag) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Rejecting request at adapt step");
                return error_response(&e);
            }
        };

        let identity = self.resolver.resolve(&request);

        let rules = self.rules.load_full();
        let decision = authz::evaluate(&request, &identity, &rules);
        if !decision.allowed {
            return response::encode_denial(&decision);
        }

        let result = match self.dispatcher.dispatch(request, &identity).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, node = %identity.node, "Dispatch failed");
                return error_response(&e);
            }
        };

        match response::encode(result) {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    node = %identity.node,
                    rule = decision.matched_rule.as_deref().unwrap_or("-"),
                    "Handler produced an unencodable response"
                );
                error_response(&e)
            }
        }
    }

    /// The decision the current snapshot would produce for a request,
    /// without dispatching. Useful to embedders and tests.
    pub fn check(&self, request: &Request) -> Decision {
        let identity = self.resolver.resolve(request);
        authz::evaluate(request, &identity, &self.rules.load_full())
    }
}

/// Plain-text error response for a pipeline failure.
fn error_response(error: &BridgeError) -> Response<body::Body> {
    Response::builder()
        .status(error.status())
        .header(CONTENT_TYPE, "text/plain")
        .header(VERSION_HEADER, env!("CARGO_PKG_VERSION"))
        .body(body::Body::from(error.to_string()))
        .unwrap_or_default()
}
