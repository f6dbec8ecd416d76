//! Actor Coordinator - Wires up the Notification Actor System
//!
//! The Coordinator is a thin orchestrator that:
//! - Binds the notification server
//! - Wires the watch pipeline into the debouncer and hub
//! - Runs every actor until shutdown

mod runtime;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use super::debounce::DebounceActor;
use super::fs::{self, notify_source};
use super::heartbeat::HeartbeatActor;
use super::hub::HubActor;
use crate::config::LiveConfig;
use crate::reload::server::{NotifyServer, StreamOptions};
use crate::{debug, log, logger};

pub(crate) type NotifyPipeline =
    fs::WatchPipeline<notify_source::NotifyWatches, notify_source::NotifyEvents>;

/// Coordinator - wires up and runs the actor system.
pub struct Coordinator<'a> {
    config: &'a LiveConfig,
}

impl<'a> Coordinator<'a> {
    pub fn new(config: &'a LiveConfig) -> Self {
        Self { config }
    }

    /// Run until `cancel` fires.
    ///
    /// Failing to bind is fatal. Failing to start the watcher is not:
    /// subscribers still get heartbeats, only reloads stop.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let config = self.config;
        let server = NotifyServer::bind(
            config.notify.interface,
            config.notify.port,
            StreamOptions {
                mount: config.notify.mount.clone(),
                retry_ms: config.notify.retry_ms,
            },
        )?;
        let url = server.url();

        let (hub, hub_handle) = HubActor::new();
        let (debounce, debounce_handle) =
            DebounceActor::new(config.watch.debounce(), hub_handle.clone());
        let heartbeat = HeartbeatActor::new(config.notify.heartbeat(), hub_handle.clone());

        let pipeline = match fs::open_pipeline(
            &config.watch.roots,
            config.watch.mask(),
            debounce_handle,
            cancel.clone(),
        ) {
            Ok(pipeline) => Some(pipeline),
            Err(e) => {
                logger::status_error("watcher unavailable", &e.to_string());
                None
            }
        };

        let running = server.spawn(hub_handle)?;
        log!("serve"; "notifications at {}", url);
        for root in &config.watch.roots {
            log!("watch"; "{}", root.display());
        }

        debug!("actor"; "start");
        runtime::run_actors(hub, debounce, heartbeat, pipeline, cancel).await;

        tokio::task::spawn_blocking(move || running.shutdown()).await?;
        debug!("actor"; "stopped");
        Ok(())
    }
}
