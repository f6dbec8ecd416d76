//! Heartbeat Actor - periodic keep-alive notifications.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::hub::HubHandle;
use crate::debug;
use crate::reload::message::NotificationMessage;

pub const DEFAULT_PERIOD_MS: u64 = 2000;

pub struct HeartbeatActor {
    period: Duration,
    hub: HubHandle,
}

impl HeartbeatActor {
    pub fn new(period: Duration, hub: HubHandle) -> Self {
        Self { period, hub }
    }

    /// Publish `Heartbeat(0)`, `Heartbeat(1)`, ... one period apart, the first
    /// one period after start. Returns the number published.
    pub async fn run(self, cancel: CancellationToken) -> u64 {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut count = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if !self.hub.publish(NotificationMessage::Heartbeat(count)) {
                        break;
                    }
                    count += 1;
                }
            }
        }
        debug!("notify"; "heartbeat stopped after {}", count);
        count
    }
}
