//! Chat turn state machine

use std::fmt;

use crate::domain::error::InvalidStateTransition;

/// Chat turn states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChatTurnState {
    #[default]
    Idle,
    Sending,
    AwaitingToolResolution,
    Complete,
    Failed,
}

impl ChatTurnState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Sending => "sending",
            Self::AwaitingToolResolution => "awaiting tool resolution",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    /// Whether the turn has resolved one way or the other
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for ChatTurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Progress of one chat turn.
///
/// State machine:
///   IDLE/COMPLETE/FAILED -> SENDING (begin)
///   SENDING -> AWAITING_TOOL_RESOLUTION (tools_requested)
///   AWAITING_TOOL_RESOLUTION -> SENDING (tools_resolved)
///   SENDING -> COMPLETE (complete)
///   any non-terminal -> FAILED (fail)
#[derive(Debug, Default)]
pub struct ChatTurn {
    state: ChatTurnState,
    tool_rounds: usize,
}

impl ChatTurn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ChatTurnState {
        self.state
    }

    /// Number of tool round-trips in the current turn
    pub fn tool_rounds(&self) -> usize {
        self.tool_rounds
    }

    /// Start a new turn
    pub fn begin(&mut self) -> Result<(), InvalidStateTransition> {
        match self.state {
            ChatTurnState::Idle | ChatTurnState::Complete | ChatTurnState::Failed => {
                self.state = ChatTurnState::Sending;
                self.tool_rounds = 0;
                Ok(())
            }
            other => Err(InvalidStateTransition::new(other, "begin a turn")),
        }
    }

    /// The model answered with function calls
    pub fn tools_requested(&mut self) -> Result<(), InvalidStateTransition> {
        self.expect(ChatTurnState::Sending, "resolve tools")?;
        self.state = ChatTurnState::AwaitingToolResolution;
        self.tool_rounds += 1;
        Ok(())
    }

    /// Results are ready to be sent back
    pub fn tools_resolved(&mut self) -> Result<(), InvalidStateTransition> {
        self.expect(ChatTurnState::AwaitingToolResolution, "send tool results")?;
        self.state = ChatTurnState::Sending;
        Ok(())
    }

    /// The model produced its final reply
    pub fn complete(&mut self) -> Result<(), InvalidStateTransition> {
        self.expect(ChatTurnState::Sending, "complete the turn")?;
        self.state = ChatTurnState::Complete;
        Ok(())
    }

    /// The turn failed
    pub fn fail(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state.is_terminal() || self.state == ChatTurnState::Idle {
            return Err(InvalidStateTransition::new(self.state, "fail the turn"));
        }
        self.state = ChatTurnState::Failed;
        Ok(())
    }

    fn expect(&self, state: ChatTurnState, action: &str) -> Result<(), InvalidStateTransition> {
        if self.state != state {
            return Err(InvalidStateTransition::new(self.state, action));
        }
        Ok(())
    }
}
