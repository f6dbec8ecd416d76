//! One subscriber's event stream.

use std::io::{self, Write};

use super::message::retry_frame;
use crate::actor::hub::Subscription;
use crate::debug;

/// Why a session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The subscriber went away (write failed)
    Disconnected,
    /// The hub dropped the queue (shutdown)
    HubClosed,
}

/// Drains one subscription into one open stream.
pub struct SubscriberSession {
    subscription: Subscription,
    retry_ms: u64,
}

impl SubscriberSession {
    pub fn new(subscription: Subscription, retry_ms: u64) -> Self {
        Self {
            subscription,
            retry_ms,
        }
    }

    /// Push every queued message, in order, until either side goes away.
    ///
    /// Dropping the session unsubscribes it.
    pub fn run<W: Write>(self, out: &mut W) -> SessionEnd {
        let id = self.subscription.id();
        if let Err(e) = send(out, &retry_frame(self.retry_ms)) {
            debug!("session"; "{} gone before first frame: {}", id, e);
            return SessionEnd::Disconnected;
        }

        while let Some(envelope) = self.subscription.recv() {
            if let Err(e) = send(out, &envelope.to_frame()) {
                debug!("session"; "{} disconnected: {}", id, e);
                return SessionEnd::Disconnected;
            }
        }

        debug!("session"; "{} closed by hub", id);
        SessionEnd::HubClosed
    }
}

fn send<W: Write>(out: &mut W, frame: &str) -> io::Result<()> {
    out.write_all(frame.as_bytes())?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::hub::HubActor;
    use crate::reload::message::NotificationMessage;

    /// Writer that fails after `limit` writes.
    struct Flaky {
        buf: Vec<u8>,
        limit: usize,
    }

    impl Write for Flaky {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            if self.limit == 0 {
                return Err(io::ErrorKind::BrokenPipe.into());
            }
            self.limit -= 1;
            self.buf.extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_session_writes_frames_in_order() {
        let (mut hub, handle) = HubActor::new();
        let sub = handle.subscribe().unwrap();
        handle.publish(NotificationMessage::Heartbeat(0));
        handle.publish(NotificationMessage::Reload);
        hub.handle_pending();
        drop(hub);

        let mut out = Vec::new();
        let end = SubscriberSession::new(sub, 250).run(&mut out);

        assert_eq!(end, SessionEnd::HubClosed);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "retry: 250\n\nid: 1\ndata: 0\n\nid: 2\ndata: \"reload\"\n\n"
        );
    }

    #[test]
    fn test_session_ends_on_write_failure() {
        let (mut hub, handle) = HubActor::new();
        let sub = handle.subscribe().unwrap();
        for n in 0..3 {
            handle.publish(NotificationMessage::Heartbeat(n));
        }
        hub.handle_pending();

        let mut out = Flaky {
            buf: Vec::new(),
            limit: 2,
        };
        let end = SubscriberSession::new(sub, 250).run(&mut out);
        assert_eq!(end, SessionEnd::Disconnected);

        // The dropped session leaves the hub.
        hub.handle_pending();
        assert_eq!(hub.session_count(), 0);
    }
}
