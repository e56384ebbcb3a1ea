//! Cooperative cancellation.
//!
//! An [`AbortSignal`] is a read-only view of a cancellation token. The
//! owning [`AbortController`] fires it; every clone of the signal observes
//! the same state. Signals are used at two levels: the server-level signal
//! passed to `serve` stops the listener, and each request carries its own
//! signal that fires when the connection goes away before a response is
//! produced.

use std::fmt;

use tokio_util::sync::{CancellationToken, DropGuard};

/// Owner side of an [`AbortSignal`].
#[derive(Debug, Clone, Default)]
pub struct AbortController {
    token: CancellationToken,
}

impl AbortController {
    /// Create a controller with a fresh, un-fired signal.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Get the signal observed by consumers.
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            token: self.token.clone(),
        }
    }

    /// Fire the signal. Idempotent.
    pub fn abort(&self) {
        self.token.cancel();
    }

    /// Fire the signal when the returned guard is dropped, unless it is
    /// disarmed first.
    pub(crate) fn abort_on_drop(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }
}

/// Read-only cancellation signal.
#[derive(Clone, Default)]
pub struct AbortSignal {
    token: CancellationToken,
}

impl AbortSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        Self::default()
    }

    /// Whether the signal has fired.
    pub fn aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until the signal fires.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Derive a controller whose signal fires with this one, but can also be
    /// fired on its own without affecting this signal.
    pub fn child(&self) -> AbortController {
        AbortController {
            token: self.token.child_token(),
        }
    }
}

impl fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortSignal")
            .field("aborted", &self.aborted())
            .finish()
    }
}
