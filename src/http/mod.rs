//! HTTP-facing pieces: request adaptation, response encoding, and the axum
//! server surface.

pub mod request;
pub mod response;
pub mod server;

pub use request::{Body, HttpMethod, Request, TransportRequest};
pub use response::{HandlerResponse, ResponseBody};
pub use server::{bridge_router, BridgeServer, TlsClientInfo};
