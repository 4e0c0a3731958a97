//! FAF Server
//!
//! HTTP transport for the project DNA broker. One route tree on `/`
//! ([`routes::routes`]) plus the tracing setup shared by every binary
//! entry point ([`telemetry::init_tracing`]).

pub mod routes;
pub mod telemetry;

pub use routes::{routes, AGENT_HEADER, DETECTED_HEADER};
pub use telemetry::init_tracing;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
