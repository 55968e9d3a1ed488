//! Conversation history entries shown to the user

use std::fmt;

use crate::domain::audio::AudioData;
use crate::domain::ledger::{Appointment, Expense};

/// Who produced a turn or message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of a record created or changed during a turn
#[derive(Debug, Clone, PartialEq)]
pub enum RecordCard {
    Expense(Expense),
    Appointment(Appointment),
}

/// Extra content rendered with a turn
#[derive(Debug, Clone, PartialEq)]
pub enum TurnAttachment {
    Card(RecordCard),
    ManualEntryForm { hint: Option<String> },
}

/// One entry of the visible conversation
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: Option<String>,
    pub audio: Option<AudioData>,
    pub attachment: Option<TurnAttachment>,
    pub is_error: bool,
}

impl ConversationTurn {
    /// A user turn carrying text, a voice note, or both
    pub fn user(text: Option<String>, audio: Option<AudioData>) -> Self {
        Self {
            role: Role::User,
            text,
            audio,
            attachment: None,
            is_error: false,
        }
    }

    /// A resolved model reply
    pub fn model(text: Option<String>, card: Option<RecordCard>) -> Self {
        Self {
            role: Role::Model,
            text,
            audio: None,
            attachment: card.map(TurnAttachment::Card),
            is_error: false,
        }
    }

    /// The model asked for the manual entry form
    pub fn form_request(hint: Option<String>) -> Self {
        Self {
            role: Role::Model,
            text: None,
            audio: None,
            attachment: Some(TurnAttachment::ManualEntryForm { hint }),
            is_error: false,
        }
    }

    /// A failed turn, shown in place of the model reply
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: Some(message.into()),
            audio: None,
            attachment: None,
            is_error: true,
        }
    }

    pub fn card(&self) -> Option<&RecordCard> {
        match &self.attachment {
            Some(TurnAttachment::Card(card)) => Some(card),
            _ => None,
        }
    }
}
