//! Hub Actor - ordered broadcast to subscriber sessions
//!
//! Every publish goes through one channel, so the order in which the hub
//! receives messages is the global publish order. Each session gets its own
//! unbounded queue and sees that order; sessions that subscribe later do
//! not see earlier messages.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::messages::{HubMsg, SessionId};
use crate::reload::message::{Envelope, NotificationMessage};
use crate::{debug, logger};

/// Cloneable handle for publishing and subscribing. Usable from any thread.
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::UnboundedSender<HubMsg>,
    next_id: Arc<AtomicU64>,
}

impl HubHandle {
    pub fn new(tx: mpsc::UnboundedSender<HubMsg>) -> Self {
        Self {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Publish to every active session. Returns `false` once the hub is gone.
    pub fn publish(&self, message: NotificationMessage) -> bool {
        self.tx.send(HubMsg::Publish(message)).is_ok()
    }

    /// Open a delivery queue. `None` once the hub is gone.
    pub fn subscribe(&self) -> Option<Subscription> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (queue, rx) = channel::unbounded();
        self.tx.send(HubMsg::Subscribe { id, queue }).ok()?;
        Some(Subscription {
            id,
            rx,
            hub: self.tx.clone(),
        })
    }
}

/// Read side of one session's queue. Unsubscribes on drop.
#[derive(Debug)]
pub struct Subscription {
    id: SessionId,
    rx: Receiver<Envelope>,
    hub: mpsc::UnboundedSender<HubMsg>,
}

impl Subscription {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Block until the next message. `None` once the hub dropped the queue.
    pub fn recv(&self) -> Option<Envelope> {
        self.rx.recv().ok()
    }

    /// Like [`recv`](Self::recv), giving up after `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Envelope, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Messages already queued, without blocking.
    pub fn drain(&self) -> Vec<Envelope> {
        self.rx.try_iter().collect()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self.hub.send(HubMsg::Unsubscribe(self.id));
    }
}

/// Hub Actor - owns the per-session queues
pub struct HubActor {
    rx: mpsc::UnboundedReceiver<HubMsg>,
    sessions: FxHashMap<SessionId, channel::Sender<Envelope>>,
    /// Sequence number of the last published message
    seq: u64,
}

impl HubActor {
    pub fn new() -> (Self, HubHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = Self {
            rx,
            sessions: FxHashMap::default(),
            seq: 0,
        };
        (actor, HubHandle::new(tx))
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Run until cancelled. Dropping the queues lets every session close.
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            let msg = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                msg = self.rx.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
            };
            self.handle(msg);
        }

        debug!("notify"; "closing {} sessions", self.sessions.len());
        self.sessions.clear();
    }

    /// Apply every message already waiting in the inbox.
    pub fn handle_pending(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            self.handle(msg);
        }
    }

    pub fn handle(&mut self, msg: HubMsg) {
        match msg {
            HubMsg::Subscribe { id, queue } => {
                self.sessions.insert(id, queue);
                debug!("notify"; "session {} subscribed (total: {})", id, self.sessions.len());
            }
            HubMsg::Unsubscribe(id) => {
                if self.sessions.remove(&id).is_some() {
                    debug!("notify"; "session {} left (total: {})", id, self.sessions.len());
                }
            }
            HubMsg::Publish(message) => self.publish(message),
        }
    }

    fn publish(&mut self, message: NotificationMessage) {
        self.seq += 1;
        let envelope = Envelope {
            id: self.seq,
            message,
        };

        // A failed send means the session is gone; drop its queue.
        self.sessions
            .retain(|id, queue| match queue.send(envelope) {
                Ok(()) => true,
                Err(_) => {
                    debug!("notify"; "session {} disconnected", id);
                    false
                }
            });

        if message.is_reload() {
            let count = self.sessions.len();
            logger::status_success(&format!(
                "reload sent to {} {}",
                count,
                if count == 1 { "subscriber" } else { "subscribers" }
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hub() -> (HubActor, HubHandle) {
        HubActor::new()
    }

    #[test]
    fn test_publish_reaches_every_session() {
        let (mut actor, handle) = hub();
        let a = handle.subscribe().unwrap();
        let b = handle.subscribe().unwrap();
        handle.publish(NotificationMessage::Reload);
        actor.handle_pending();

        assert_eq!(actor.session_count(), 2);
        assert_eq!(a.drain().len(), 1);
        assert_eq!(b.drain().len(), 1);
    }

    #[test]
    fn test_late_subscriber_misses_earlier_messages() {
        let (mut actor, handle) = hub();
        let early = handle.subscribe().unwrap();
        handle.publish(NotificationMessage::Reload);
        actor.handle_pending();

        let late = handle.subscribe().unwrap();
        actor.handle_pending();

        assert_eq!(early.drain().len(), 1);
        assert!(late.drain().is_empty());

        handle.publish(NotificationMessage::Heartbeat(0));
        actor.handle_pending();
        let got = late.drain();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].message, NotificationMessage::Heartbeat(0));
    }

    #[test]
    fn test_publish_order_is_preserved() {
        let (mut actor, handle) = hub();
        let sub = handle.subscribe().unwrap();

        handle.publish(NotificationMessage::Heartbeat(0));
        handle.publish(NotificationMessage::Reload);
        handle.publish(NotificationMessage::Heartbeat(1));
        handle.publish(NotificationMessage::Reload);
        actor.handle_pending();

        let got = sub.drain();
        let messages: Vec<_> = got.iter().map(|e| e.message).collect();
        assert_eq!(
            messages,
            vec![
                NotificationMessage::Heartbeat(0),
                NotificationMessage::Reload,
                NotificationMessage::Heartbeat(1),
                NotificationMessage::Reload,
            ]
        );
        let ids: Vec<_> = got.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_dropped_subscription_is_removed() {
        let (mut actor, handle) = hub();
        let sub = handle.subscribe().unwrap();
        actor.handle_pending();
        assert_eq!(actor.session_count(), 1);

        drop(sub);
        actor.handle_pending();
        assert_eq!(actor.session_count(), 0);
    }

    #[test]
    fn test_messages_are_never_deduplicated() {
        let (mut actor, handle) = hub();
        let sub = handle.subscribe().unwrap();
        for _ in 0..3 {
            handle.publish(NotificationMessage::Reload);
        }
        actor.handle_pending();
        assert_eq!(sub.drain().len(), 3);
    }

    #[tokio::test]
    async fn test_cancel_closes_session_queues() {
        let (actor, handle) = hub();
        let sub = handle.subscribe().unwrap();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(actor.run(cancel.clone()));

        cancel.cancel();
        task.await.unwrap();

        assert_eq!(
            sub.recv_timeout(Duration::from_millis(100)),
            Err(RecvTimeoutError::Disconnected)
        );
        assert!(!handle.publish(NotificationMessage::Reload));
    }
}
