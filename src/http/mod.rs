//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound:  TCP → server.rs (axum + tower-http layers) → handlers.rs → platform
//! Outbound: guest fetcher / platform → transport.rs (reqwest, direct or accelerator) → upstream
//! ```

pub mod handlers;
pub mod server;
pub mod transport;

pub use server::HttpServer;
pub use transport::{OutboundRequest, ReqwestTransport, Transport, UpstreamResponse};
