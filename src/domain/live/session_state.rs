//! Live session state machine

use std::fmt;

use crate::domain::error::InvalidStateTransition;

/// Live session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LiveSessionState {
    #[default]
    Closed,
    Connecting,
    Listening,
    Muted,
    Closing,
}

impl LiveSessionState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Connecting => "connecting",
            Self::Listening => "listening",
            Self::Muted => "muted",
            Self::Closing => "closing",
        }
    }

    /// Open means the channel is up, muted or not
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Listening | Self::Muted)
    }
}

impl fmt::Display for LiveSessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle of a live session.
///
/// State machine:
///   CLOSED -> CONNECTING (begin_connect)
///   CONNECTING -> LISTENING (connected)
///   CONNECTING -> CLOSED (connect_failed)
///   LISTENING <-> MUTED (set_muted)
///   CONNECTING/LISTENING/MUTED -> CLOSING (begin_close)
///   CLOSING -> CLOSED (finish_close)
#[derive(Debug, Default)]
pub struct LiveLifecycle {
    state: LiveSessionState,
}

impl LiveLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LiveSessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn is_closed(&self) -> bool {
        self.state == LiveSessionState::Closed
    }

    pub fn begin_connect(&mut self) -> Result<(), InvalidStateTransition> {
        self.expect(LiveSessionState::Closed, "connect")?;
        self.state = LiveSessionState::Connecting;
        Ok(())
    }

    pub fn connected(&mut self) -> Result<(), InvalidStateTransition> {
        self.expect(LiveSessionState::Connecting, "open the session")?;
        self.state = LiveSessionState::Listening;
        Ok(())
    }

    pub fn connect_failed(&mut self) -> Result<(), InvalidStateTransition> {
        self.expect(LiveSessionState::Connecting, "abort connecting")?;
        self.state = LiveSessionState::Closed;
        Ok(())
    }

    /// Toggle mute. Only valid while open.
    pub fn set_muted(&mut self, muted: bool) -> Result<(), InvalidStateTransition> {
        if !self.state.is_open() {
            return Err(InvalidStateTransition::new(self.state, "change mute"));
        }
        self.state = if muted {
            LiveSessionState::Muted
        } else {
            LiveSessionState::Listening
        };
        Ok(())
    }

    pub fn begin_close(&mut self) -> Result<(), InvalidStateTransition> {
        match self.state {
            LiveSessionState::Connecting
            | LiveSessionState::Listening
            | LiveSessionState::Muted => {
                self.state = LiveSessionState::Closing;
                Ok(())
            }
            other => Err(InvalidStateTransition::new(other, "close")),
        }
    }

    pub fn finish_close(&mut self) -> Result<(), InvalidStateTransition> {
        self.expect(LiveSessionState::Closing, "finish closing")?;
        self.state = LiveSessionState::Closed;
        Ok(())
    }

    fn expect(&self, state: LiveSessionState, action: &str) -> Result<(), InvalidStateTransition> {
        if self.state != state {
            return Err(InvalidStateTransition::new(self.state, action));
        }
        Ok(())
    }
}
