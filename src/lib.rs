//! Request-authorization and dispatch bridge.
//!
//! Sits between a TLS-terminating transport and a set of registered
//! endpoint handlers:
//!
//! ```text
//! transport bag ─▶ adapt ─▶ identify ─▶ authorize ─▶ dispatch ─▶ encode
//!                                          │
//!                               deny ──────┴──▶ 403 + reason
//! ```
//!
//! The rule set is hot-reloadable: a file watcher compiles new snapshots
//! and the bridge swaps them in atomically while in-flight requests keep
//! the snapshot they started with.

pub mod authz;
pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod identity;

pub use authz::{Decision, RuleSet};
pub use bridge::Bridge;
pub use config::{load_rules, parse_rules, ConfigError, RuleWatcher};
pub use dispatch::{Dispatcher, RequestHandler, ServerRole};
pub use error::BridgeError;
pub use http::{
    Body, BridgeServer, HandlerResponse, HttpMethod, Request, ResponseBody, TlsClientInfo,
    TransportRequest,
};
pub use identity::{Identity, IdentityResolver, NodeResolver};
