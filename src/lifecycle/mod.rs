//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGINT (Ctrl+C) → abort the server signal
//!     → listener stops accepting → in-flight connections drain → exit
//! ```

pub mod signals;

pub use signals::abort_on_ctrl_c;
