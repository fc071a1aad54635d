//! User-visible progress notices.
//!
//! The client reports its blocking waits, the actions it sends and dirty-state
//! resets through a [`NoticeSink`]. [`StdoutNotices`] renders them the way an
//! interactive user expects ("Waiting ... Connected!"); [`RecordedNotices`]
//! keeps them for inspection.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crate::episode::action::ActionArgs;

/// A progress notice emitted by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    AwaitingSupervisor,
    SupervisorConnected,
    AwaitingSimulator,
    SimulatorRunning,
    SendingAction { action: String, args: ActionArgs },
    ResetStarted,
    ResetComplete,
}

impl Notice {
    /// Opening notices are followed by their completion on the same line.
    pub fn opens_line(&self) -> bool {
        matches!(
            self,
            Self::AwaitingSupervisor | Self::AwaitingSimulator | Self::ResetStarted
        )
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingSupervisor => {
                f.write_str("Waiting to establish connection to a running supervisor ... ")
            }
            Self::AwaitingSimulator => {
                f.write_str("Waiting to establish connection to a running simulator ... ")
            }
            Self::SupervisorConnected | Self::SimulatorRunning => f.write_str("Connected!"),
            Self::SendingAction { action, args } => {
                let args = serde_json::to_string(args).map_err(|_| fmt::Error)?;
                write!(f, "Sending action '{action}' with args: {args}")
            }
            Self::ResetStarted => f.write_str("Dirty simulator state detected. Performing reset ... "),
            Self::ResetComplete => f.write_str("Complete."),
        }
    }
}

/// Destination for [`Notice`]s.
pub trait NoticeSink: Send {
    fn notify(&mut self, notice: Notice);
}

/// Prints notices to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutNotices;

impl NoticeSink for StdoutNotices {
    fn notify(&mut self, notice: Notice) {
        let mut out = io::stdout().lock();
        // A closed stdout must not abort the episode.
        let _ = if notice.opens_line() {
            write!(out, "{notice}").and_then(|_| out.flush())
        } else {
            writeln!(out, "{notice}")
        };
    }
}

/// Discards all notices.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotices;

impl NoticeSink for NoopNotices {
    fn notify(&mut self, _notice: Notice) {}
}

/// Keeps every notice in order. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct RecordedNotices {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordedNotices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|n| n.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl NoticeSink for RecordedNotices {
    fn notify(&mut self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notice);
    }
}
