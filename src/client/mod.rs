//! Reconnecting Listener
//!
//! Native counterpart of the browser reload script: subscribes to the
//! notification stream, keeps the connection alive across server restarts
//! and runs a reload action when asked to.
//!
//! ```text
//! Transport ──TransportEvent──> ReconnectMachine ──Command──> driver
//!                                                            ├─ connect / teardown
//!                                                            ├─ reconnect timer
//!                                                            └─ ReloadAction
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::reload::message::{CLOSE_EVENT, NotificationMessage};
use crate::{debug, log};

pub mod action;
pub mod machine;
pub mod transport;

pub use action::{CommandAction, LogAction, ReloadAction};
pub use machine::{Command, ReconnectMachine, ReconnectState};
pub use transport::{SseTransport, Transport, TransportEvent};

/// Drives one transport through the reconnect machine.
pub struct ReloadClient<T, A> {
    transport: T,
    action: A,
    machine: ReconnectMachine,
    deadline: Option<Instant>,
    reloads: u64,
}

enum Input {
    Timer,
    Transport(TransportEvent),
}

impl<T: Transport, A: ReloadAction> ReloadClient<T, A> {
    pub fn new(transport: T, action: A, reconnect: Duration) -> Self {
        Self {
            transport,
            action,
            machine: ReconnectMachine::new(reconnect),
            deadline: None,
            reloads: 0,
        }
    }

    /// Run until cancelled or the server closes the stream explicitly.
    ///
    /// Returns the number of reloads triggered.
    pub async fn run(mut self, cancel: CancellationToken) -> u64 {
        let commands = self.machine.start();
        self.apply(commands);

        while !self.machine.is_idle() {
            let deadline = self.deadline;
            let input = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = sleep_until_some(deadline), if deadline.is_some() => Input::Timer,
                event = self.transport.next_event(), if self.transport.is_active() => {
                    Input::Transport(event)
                }
            };

            let commands = match input {
                Input::Timer => {
                    self.deadline = None;
                    self.machine.on_timer()
                }
                Input::Transport(event) => self.on_event(event),
            };
            self.apply(commands);
        }

        self.transport.teardown();
        debug!("client"; "stopped after {} reloads", self.reloads);
        self.reloads
    }

    fn on_event(&mut self, event: TransportEvent) -> Vec<Command> {
        match event {
            TransportEvent::Opened => {
                let reopened = self.machine.has_opened_once();
                let commands = self.machine.on_open();
                if reopened {
                    log!("client"; "server is back");
                } else if self.machine.state() == ReconnectState::Open {
                    log!("client"; "connected");
                }
                commands
            }
            TransportEvent::Message { event, .. } if event == CLOSE_EVENT => {
                log!("client"; "server closed the stream");
                self.machine.on_close()
            }
            TransportEvent::Message { data, .. } => match NotificationMessage::from_data(&data) {
                Some(NotificationMessage::Reload) => self.machine.on_reload(),
                Some(NotificationMessage::Heartbeat(n)) => {
                    debug!("client"; "heartbeat {}", n);
                    Vec::new()
                }
                None => {
                    debug!("client"; "ignoring message: {}", data);
                    Vec::new()
                }
            },
            TransportEvent::Error(e) => {
                if self.machine.state() == ReconnectState::Open {
                    log!("client"; "connection lost, reconnecting");
                }
                debug!("client"; "transport error: {}", e);
                self.machine.on_error()
            }
        }
    }

    fn apply(&mut self, commands: Vec<Command>) {
        let mut queue = VecDeque::from(commands);
        while let Some(command) = queue.pop_front() {
            match command {
                Command::Connect => {
                    if let Err(e) = self.transport.connect() {
                        debug!("client"; "connect failed: {}", e);
                        queue.extend(self.machine.on_error());
                    }
                }
                Command::Teardown => self.transport.teardown(),
                Command::ArmTimer(delay) => self.deadline = Some(Instant::now() + delay),
                Command::CancelTimer => self.deadline = None,
                Command::Reload => {
                    self.reloads += 1;
                    if let Err(e) = self.action.reload() {
                        log!("error"; "reload action failed: {:#}", e);
                    }
                }
            }
        }
    }
}

async fn sleep_until_some(deadline: Option<Instant>) {
    if let Some(deadline) = deadline {
        tokio::time::sleep_until(deadline).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    use super::*;

    /// Each connect replays the next scripted connection, then idles.
    struct FakeTransport {
        script: VecDeque<Vec<TransportEvent>>,
        current: Option<VecDeque<TransportEvent>>,
        connects: Arc<AtomicUsize>,
    }

    impl FakeTransport {
        fn new(script: Vec<Vec<TransportEvent>>) -> (Self, Arc<AtomicUsize>) {
            let connects = Arc::new(AtomicUsize::new(0));
            let transport = Self {
                script: script.into(),
                current: None,
                connects: Arc::clone(&connects),
            };
            (transport, connects)
        }
    }

    impl Transport for FakeTransport {
        fn connect(&mut self) -> anyhow::Result<()> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let events = self
                .script
                .pop_front()
                .unwrap_or_else(|| vec![TransportEvent::Error("refused".into())]);
            self.current = Some(events.into());
            Ok(())
        }

        fn teardown(&mut self) {
            self.current = None;
        }

        fn is_active(&self) -> bool {
            self.current.is_some()
        }

        async fn next_event(&mut self) -> TransportEvent {
            match self.current.as_mut().and_then(|c| c.pop_front()) {
                Some(event) => event,
                None => std::future::pending().await,
            }
        }
    }

    #[derive(Clone, Default)]
    struct CountingAction(Arc<AtomicU64>);

    impl ReloadAction for CountingAction {
        fn reload(&mut self) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn message(data: &str) -> TransportEvent {
        TransportEvent::Message {
            event: "message".into(),
            data: data.into(),
        }
    }

    fn close() -> TransportEvent {
        TransportEvent::Message {
            event: CLOSE_EVENT.into(),
            data: String::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_message_and_server_restart() {
        let (transport, connects) = FakeTransport::new(vec![
            vec![
                TransportEvent::Opened,
                message("0"),
                message("\"reload\""),
                TransportEvent::Error("server went away".into()),
            ],
            vec![TransportEvent::Opened],
            vec![TransportEvent::Opened, message("1"), close()],
        ]);
        let action = CountingAction::default();
        let client = ReloadClient::new(transport, action.clone(), Duration::from_millis(250));

        let reloads = client.run(CancellationToken::new()).await;

        assert_eq!(reloads, 2);
        assert_eq!(action.0.load(Ordering::SeqCst), 2);
        assert_eq!(connects.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_connections_retry_at_fixed_interval() {
        let (transport, connects) = FakeTransport::new(Vec::new());
        let client = ReloadClient::new(
            transport,
            CountingAction::default(),
            Duration::from_millis(250),
        );
        let cancel = CancellationToken::new();
        let task = tokio::spawn(client.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(1100)).await;
        cancel.cancel();

        assert_eq!(task.await.unwrap(), 0);
        assert_eq!(connects.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_connection_does_not_reload() {
        let (transport, connects) = FakeTransport::new(vec![vec![TransportEvent::Opened]]);
        let client = ReloadClient::new(
            transport,
            CountingAction::default(),
            Duration::from_millis(250),
        );
        let cancel = CancellationToken::new();
        let task = tokio::spawn(client.run(cancel.clone()));

        tokio::time::sleep(Duration::from_secs(5)).await;
        cancel.cancel();

        assert_eq!(task.await.unwrap(), 0);
        assert_eq!(connects.load(Ordering::SeqCst), 1);
    }
}
