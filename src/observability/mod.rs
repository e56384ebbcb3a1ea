//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce structured `tracing` events
//!     → logging.rs (subscriber: env filter + fmt layer)
//!     → stdout
//! ```
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured filter
//! - Per-request spans come from tower-http's TraceLayer

pub mod logging;

pub use logging::init_logging;
