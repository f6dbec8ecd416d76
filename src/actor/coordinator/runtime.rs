use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::NotifyPipeline;
use crate::actor::debounce::DebounceActor;
use crate::actor::heartbeat::HeartbeatActor;
use crate::actor::hub::HubActor;

const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Run all actors concurrently until `cancel` fires.
///
/// Actors that stop early (a failed watch pipeline) do not stop the rest.
pub(super) async fn run_actors(
    hub: HubActor,
    debounce: DebounceActor,
    heartbeat: HeartbeatActor,
    pipeline: Option<NotifyPipeline>,
    cancel: CancellationToken,
) {
    let hub_handle = tokio::spawn(hub.run(cancel.clone()));
    let debounce_handle = tokio::spawn(debounce.run(cancel.clone()));
    let heartbeat_handle = tokio::spawn(heartbeat.run(cancel.clone()));

    let watch_handles = pipeline.map(|pipeline| {
        let queue = tokio::spawn(pipeline.queue.run(cancel.clone()));
        let fs = tokio::spawn(pipeline.actor.run());
        (queue, fs)
    });

    cancel.cancelled().await;
    crate::debug!("actor"; "shutdown signal received");

    let joined = tokio::time::timeout(SHUTDOWN_GRACE, async move {
        if let Some((queue, fs)) = watch_handles {
            let _ = fs.await;
            let _ = queue.await;
        }
        let _ = heartbeat_handle.await;
        if let Ok(fired) = debounce_handle.await {
            crate::debug!("debounce"; "{} reload(s) sent this run", fired);
        }
        let _ = hub_handle.await;
    })
    .await;

    if joined.is_err() {
        crate::debug!("actor"; "some actors did not stop within {:?}", SHUTDOWN_GRACE);
    }
}
