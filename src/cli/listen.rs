//! `livewatch listen`: follow a notification stream and reload on demand.

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use super::serve::build_runtime;
use crate::client::{CommandAction, LogAction, ReloadAction, ReloadClient, SseTransport};
use crate::config::LiveConfig;
use crate::core::{is_shutdown, register_shutdown};
use crate::{debug, log};

pub fn listen(config: &LiveConfig) -> Result<()> {
    let cancel = CancellationToken::new();
    register_shutdown(cancel.clone());

    let client = &config.client;
    log!("client"; "listening on {}", client.url);

    let rt = build_runtime()?;
    let reloads = match &client.command {
        Some(command) => rt.block_on(run(config, CommandAction::new(command), cancel)),
        None => rt.block_on(run(config, LogAction::default(), cancel)),
    };

    if is_shutdown() {
        debug!("client"; "interrupted after {} reload(s)", reloads);
    } else {
        log!("client"; "stream closed after {} reload(s)", reloads);
    }
    Ok(())
}

async fn run<A: ReloadAction>(config: &LiveConfig, action: A, cancel: CancellationToken) -> u64 {
    let transport = SseTransport::new(config.client.url.clone());
    ReloadClient::new(transport, action, config.client.reconnect())
        .run(cancel)
        .await
}
