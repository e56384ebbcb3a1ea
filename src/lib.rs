//! Serve a `Request → Response` handler over HTTP.
//!
//! ```no_run
//! use fetch_serve::{serve, Request, Response, ServeOptions};
//!
//! # async fn run() -> Result<(), fetch_serve::ServeError> {
//! let server = serve(
//!     ServeOptions::new(|_req: Request| async { Response::new("Hello!") }).port(8080),
//! )
//! .await?;
//! server.stopped().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod fetch;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::ServerConfig;
pub use fetch::{
    AbortController, AbortSignal, Body, BodyError, BoxError, Fetch, Headers, Request, Response,
    ResponseInit,
};
pub use http::{serve, ListenAddr, ServeError, ServeOptions, Server};
