//! Portable request/response model.
//!
//! # Data Flow
//! ```text
//! native request (axum/hyper)
//!     → http::adapter builds Request { method, url, headers, body, signal }
//!     → handler.rs (Fetch) maps it to a Response
//!     → http::adapter writes Response { status, status_text, headers, body }
//!     → native response
//! ```
//!
//! # Design Decisions
//! - Types are owned values; a body is consumed by reading it, so it can only
//!   be read once
//! - Headers are a multimap; repeated names are never comma-joined on output
//! - Cancellation is cooperative: handlers watch `Request::signal`

pub mod body;
pub mod handler;
pub mod headers;
pub mod request;
pub mod response;
pub mod signal;

pub use body::{Body, BodyError, BoxError};
pub use handler::{Fetch, IntoFetchResult};
pub use headers::{HeaderError, Headers};
pub use request::Request;
pub use response::{Response, ResponseInit};
pub use signal::{AbortController, AbortSignal};
