//! Debounce Actor - collapses bursts of change signals into one reload
//!
//! Every signal (re)starts a quiet-period timer. When the timer expires
//! without another signal, exactly one reload is published.
//!
//! ```text
//! signal ─┬─ signal ─┬─ signal ──────[quiet]──> Reload
//!         └ restart  └ restart
//! ```

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::hub::HubHandle;
use crate::debug;
use crate::reload::message::NotificationMessage;

/// Default quiet period before a reload fires.
pub const DEFAULT_QUIET_MS: u64 = 1000;

/// Pure timer state: no channels, no clock reads.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Record a signal at `now`, replacing any pending deadline.
    pub fn signal(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Disarm and return `true` if the deadline has passed.
    pub fn take_if_ready(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Cloneable signal sender.
#[derive(Debug, Clone)]
pub struct DebounceHandle {
    tx: mpsc::UnboundedSender<()>,
}

impl DebounceHandle {
    /// Report one change. Returns `false` once the actor has stopped.
    pub fn signal(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

/// Debounce Actor - owns the timer and publishes reloads to the hub
pub struct DebounceActor {
    rx: mpsc::UnboundedReceiver<()>,
    debouncer: Debouncer,
    hub: HubHandle,
    fired: u64,
}

impl DebounceActor {
    pub fn new(window: Duration, hub: HubHandle) -> (Self, DebounceHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = Self {
            rx,
            debouncer: Debouncer::new(window),
            hub,
            fired: 0,
        };
        (actor, DebounceHandle { tx })
    }

    /// Run until cancelled or every handle is dropped.
    ///
    /// A timer still armed when the last handle goes away fires before the
    /// actor exits. Cancellation discards it.
    pub async fn run(mut self, cancel: CancellationToken) -> u64 {
        loop {
            let deadline = self.debouncer.deadline();
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    if self.debouncer.is_pending() {
                        debug!("debounce"; "discarding pending reload");
                    }
                    break;
                }

                msg = self.rx.recv() => match msg {
                    Some(()) => self.debouncer.signal(Instant::now()),
                    None => {
                        if let Some(deadline) = self.debouncer.deadline() {
                            tokio::time::sleep_until(deadline).await;
                            if self.debouncer.take_if_ready(Instant::now()) {
                                self.fire();
                            }
                        }
                        break;
                    }
                },

                _ = sleep_until_some(deadline), if deadline.is_some() => {
                    if self.debouncer.take_if_ready(Instant::now()) {
                        self.fire();
                    }
                }
            }
        }
        debug!("debounce"; "stopped after {} reloads", self.fired);
        self.fired
    }

    fn fire(&mut self) {
        self.fired += 1;
        debug!("debounce"; "quiet period elapsed, publishing reload");
        self.hub.publish(NotificationMessage::Reload);
    }
}

async fn sleep_until_some(deadline: Option<Instant>) {
    if let Some(deadline) = deadline {
        tokio::time::sleep_until(deadline).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::hub::HubActor;

    #[test]
    fn test_debouncer_restarts_on_signal() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(100));
        assert!(!d.is_pending());

        d.signal(start);
        d.signal(start + Duration::from_millis(60));
        assert!(!d.take_if_ready(start + Duration::from_millis(120)));
        assert!(d.take_if_ready(start + Duration::from_millis(160)));
        assert!(!d.is_pending());
        assert!(!d.take_if_ready(start + Duration::from_millis(500)));
    }

    fn setup(window_ms: u64) -> (DebounceActor, DebounceHandle, HubActor, HubHandle) {
        let (hub, hub_handle) = HubActor::new();
        let (actor, handle) =
            DebounceActor::new(Duration::from_millis(window_ms), hub_handle.clone());
        (actor, handle, hub, hub_handle)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_yields_one_reload() {
        let (actor, handle, mut hub, hub_handle) = setup(100);
        let sub = hub_handle.subscribe().unwrap();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(actor.run(cancel.clone()));

        for _ in 0..5 {
            handle.signal();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        tokio::time::sleep(Duration::from_millis(300)).await;

        cancel.cancel();
        assert_eq!(task.await.unwrap(), 1);

        hub.handle_pending();
        let got = sub.drain();
        assert_eq!(got.len(), 1);
        assert!(got[0].message.is_reload());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_signals_each_reload() {
        let (actor, handle, _hub, _) = setup(100);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(actor.run(cancel.clone()));

        for _ in 0..3 {
            handle.signal();
            tokio::time::sleep(Duration::from_millis(250)).await;
        }

        cancel.cancel();
        assert_eq!(task.await.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_signal_no_reload() {
        let (actor, _handle, _hub, _) = setup(100);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(actor.run(cancel.clone()));

        tokio::time::sleep(Duration::from_secs(5)).await;
        cancel.cancel();
        assert_eq!(task.await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_timer_fires_when_handles_drop() {
        let (actor, handle, _hub, _) = setup(100);
        let task = tokio::spawn(actor.run(CancellationToken::new()));

        handle.signal();
        drop(handle);
        assert_eq!(task.await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_pending_timer() {
        let (actor, handle, _hub, _) = setup(100);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(actor.run(cancel.clone()));

        handle.signal();
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        assert_eq!(task.await.unwrap(), 0);
        assert!(!handle.signal());
    }
}
