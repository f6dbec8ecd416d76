//! `livewatch serve`: watch roots and publish notifications.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::actor::Coordinator;
use crate::config::LiveConfig;
use crate::core::register_shutdown;
use crate::log;

pub fn serve(config: &LiveConfig) -> Result<()> {
    for root in &config.watch.roots {
        if !root.exists() {
            log!("watch"; "{} does not exist yet, waiting for it", root.display());
        }
    }

    let cancel = CancellationToken::new();
    register_shutdown(cancel.clone());

    let rt = build_runtime()?;
    rt.block_on(Coordinator::new(config).run(cancel))
}

pub(super) fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")
}
