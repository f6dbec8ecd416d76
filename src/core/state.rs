//! Shutdown state.
//!
//! The Ctrl+C handler is installed once at program start. Until a command
//! registers its cancellation token, Ctrl+C exits the process directly.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Token cancelled on Ctrl+C once a command is running
static SHUTDOWN_TOKEN: OnceLock<CancellationToken> = OnceLock::new();

/// Setup the global Ctrl+C handler. Call once at program start
///
/// - Before `register_shutdown()`: exits immediately
/// - After `register_shutdown()`: cancels the token; a second Ctrl+C exits
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        let again = SHUTDOWN.swap(true, Ordering::SeqCst);

        match SHUTDOWN_TOKEN.get() {
            Some(token) if !again => {
                crate::log!("serve"; "shutting down...");
                token.cancel();
            }
            _ => std::process::exit(130),
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Register the token Ctrl+C should cancel.
///
/// Only the first registration takes effect.
pub fn register_shutdown(token: CancellationToken) {
    let _ = SHUTDOWN_TOKEN.set(token);
}

/// Check if shutdown has been requested
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
