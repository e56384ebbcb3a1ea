//! OS signal handling.

use crate::fetch::AbortController;

/// Fire `controller` on the first Ctrl+C.
pub fn abort_on_ctrl_c(controller: AbortController) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Ctrl+C received, shutting down");
                controller.abort();
            }
            Err(e) => tracing::error!(error = %e, "Failed to install Ctrl+C handler"),
        }
    });
}
