//! Reconnect state machine.
//!
//! Pure: it never touches the network or a clock. Each input returns the
//! commands the driver must carry out, in order.
//!
//! ```text
//!               start / error
//!   Disconnected ───[timer]───> Connecting ──open──> Open
//!        ^                          │                 │
//!        │                        error             error
//!      close                        v                 │
//!        └─────────────────────  Erroring <───────────┘
//!                                   │
//!                                [timer]──> Connecting
//! ```
//!
//! An open after an earlier open in the same lifetime means the server came
//! back: the machine asks for a reload and starts a fresh lifetime.

use std::time::Duration;

/// Default delay before every (re)connect attempt.
pub const DEFAULT_RECONNECT_MS: u64 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectState {
    Disconnected,
    Connecting,
    Open,
    Erroring,
}

/// Side effect requested by the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Open a new transport connection
    Connect,
    /// Close the current transport, if any
    Teardown,
    /// (Re)arm the reconnect timer
    ArmTimer(Duration),
    /// Disarm the reconnect timer
    CancelTimer,
    /// Run the reload action
    Reload,
}

#[derive(Debug)]
pub struct ReconnectMachine {
    state: ReconnectState,
    has_opened_once: bool,
    timer_armed: bool,
    delay: Duration,
}

impl ReconnectMachine {
    pub fn new(delay: Duration) -> Self {
        Self {
            state: ReconnectState::Disconnected,
            has_opened_once: false,
            timer_armed: false,
            delay,
        }
    }

    pub fn state(&self) -> ReconnectState {
        self.state
    }

    pub fn timer_armed(&self) -> bool {
        self.timer_armed
    }

    pub fn has_opened_once(&self) -> bool {
        self.has_opened_once
    }

    /// Nothing left to do: disconnected and no reconnect pending.
    pub fn is_idle(&self) -> bool {
        self.state == ReconnectState::Disconnected && !self.timer_armed
    }

    /// Begin a client lifetime: the first connect happens after one delay.
    pub fn start(&mut self) -> Vec<Command> {
        vec![self.arm()]
    }

    pub fn on_timer(&mut self) -> Vec<Command> {
        if !self.timer_armed {
            return Vec::new();
        }
        self.timer_armed = false;
        self.state = ReconnectState::Connecting;
        vec![Command::Connect]
    }

    pub fn on_open(&mut self) -> Vec<Command> {
        if self.state != ReconnectState::Connecting {
            return Vec::new();
        }
        self.state = ReconnectState::Open;

        let mut commands = Vec::new();
        if self.timer_armed {
            self.timer_armed = false;
            commands.push(Command::CancelTimer);
        }

        if self.has_opened_once {
            // Server restarted; reload and begin a new lifetime.
            self.has_opened_once = false;
            self.state = ReconnectState::Disconnected;
            commands.push(Command::Reload);
            commands.push(Command::Teardown);
            commands.push(self.arm());
        } else {
            self.has_opened_once = true;
        }
        commands
    }

    /// A transport error schedules exactly one reconnect. Errors arriving
    /// while that reconnect is pending are ignored.
    pub fn on_error(&mut self) -> Vec<Command> {
        match self.state {
            ReconnectState::Open | ReconnectState::Connecting => {
                self.state = ReconnectState::Erroring;
                vec![Command::Teardown, self.arm()]
            }
            ReconnectState::Erroring | ReconnectState::Disconnected => Vec::new(),
        }
    }

    /// Explicit close: stop for good.
    pub fn on_close(&mut self) -> Vec<Command> {
        self.state = ReconnectState::Disconnected;
        let mut commands = vec![Command::Teardown];
        if self.timer_armed {
            self.timer_armed = false;
            commands.push(Command::CancelTimer);
        }
        commands
    }

    /// A reload message arrived.
    pub fn on_reload(&mut self) -> Vec<Command> {
        if self.state == ReconnectState::Open {
            vec![Command::Reload]
        } else {
            Vec::new()
        }
    }

    fn arm(&mut self) -> Command {
        self.timer_armed = true;
        Command::ArmTimer(self.delay)
    }
}
