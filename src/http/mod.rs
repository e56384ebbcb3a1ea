//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → net::listener (accept loop, connection limits)
//!     → server.rs (axum::serve, graceful shutdown, middleware)
//!     → adapter.rs (native request → fetch::Request)
//!     → user handler (Fetch)
//!     → adapter.rs (fetch::Response → native response)
//!     → Send to client
//! ```

pub(crate) mod adapter;
pub mod server;

pub use server::{log_listening, serve, ListenAddr, ServeError, ServeOptions, Server};
