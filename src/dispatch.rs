//! Handler dispatch.
//!
//! # Responsibilities
//! - Hold the route table for the one role this server instance serves
//! - Find the first route whose prefix matches an allowed request
//! - Invoke the handler and hand its result to the encoder
//!
//! # Design Decisions
//! - Routes are startup configuration, registered once and immutable after;
//!   they are unrelated to authorization rules, so an authorized request can
//!   still miss every route (`RouteNotFound`, a 404, never fatal).
//! - Registration outside the active role's URL prefix is a configuration
//!   error. The master/CA partition stays disjoint by construction.
//! - Handlers are infallible at the type level: failure is a response with
//!   an error status, the way the wrapped endpoints already report errors.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BridgeError;
use crate::http::request::Request;
use crate::http::response::HandlerResponse;
use crate::identity::Identity;

/// The capability a registered endpoint implements.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, request: Request, identity: &Identity) -> HandlerResponse;
}

/// Which of the two disjoint route groups this server instance serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerRole {
    Master,
    CertificateAuthority,
}

impl ServerRole {
    /// URL prefix every route of this role must live under.
    pub fn url_prefix(&self) -> &'static str {
        match self {
            ServerRole::Master => "/puppet",
            ServerRole::CertificateAuthority => "/puppet-ca",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServerRole::Master => "master",
            ServerRole::CertificateAuthority => "certificate-authority",
        }
    }
}

struct Route {
    prefix: String,
    handler: Arc<dyn RequestHandler>,
}

/// Routes requests for one server role to their handlers.
pub struct Dispatcher {
    role: ServerRole,
    routes: Vec<Route>,
}

impl Dispatcher {
    pub fn new(role: ServerRole) -> Self {
        Self { role, routes: Vec::new() }
    }

    pub fn role(&self) -> ServerRole {
        self.role
    }

    /// Register a handler under a path prefix. The prefix must fall inside
    /// the active role's URL space.
    pub fn register(
        &mut self,
        prefix: impl Into<String>,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<(), BridgeError> {
        let prefix = prefix.into();
        if !prefix.starts_with(self.role.url_prefix()) {
            return Err(BridgeError::ConfigInvalid(format!(
                "route {:?} is outside the {} role prefix {:?}",
                prefix,
                self.role.as_str(),
                self.role.url_prefix()
            )));
        }
        self.routes.push(Route { prefix, handler });
        Ok(())
    }

    /// Route an allowed request to its handler and await the result. First
    /// matching route wins.
    pub async fn dispatch(
        &self,
        request: Request,
        identity: &Identity,
    ) -> Result<HandlerResponse, BridgeError> {
        let route = self
            .routes
            .iter()
            .find(|r| path_matches(&r.prefix, &request.path))
            .ok_or_else(|| BridgeError::RouteNotFound(request.path.clone()))?;

        tracing::debug!(
            role = self.role.as_str(),
            route = %route.prefix,
            path = %request.path,
            node = %identity.node,
            "dispatching request"
        );
        Ok(route.handler.handle(request, identity).await)
    }
}

fn path_matches(prefix: &str, path: &str) -> bool {
    path.trim_end_matches('/')
        .starts_with(prefix.trim_end_matches('/'))
}
