//! System prompt value object

use chrono::{DateTime, Local, Utc};

use crate::domain::ledger::User;

/// Shared instruction for both chat and live sessions
const BASE_INSTRUCTION: &str = r#"You are a personal finance and scheduling assistant.

Instructions:
- Record expenses with addExpense and correct them with updateExpense
- Dates for expenses are YYYY-MM-DD; appointment dates are full ISO 8601 date-times
- Resolve relative dates ("yesterday", "next Friday at 3") against the current time below
- Use getExpenses or getAppointments before answering questions about existing records
- If the amount, category or date of an expense is unclear, call requestManualEntry
- Keep answers short and state what you changed"#;

const CHAT_STYLE: &str = "Reply in plain text. Voice notes may be in any language; answer in the language the user spoke.";

const LIVE_STYLE: &str = r#"You are speaking with the user in real time.
- Before calling any tool that adds, changes or deletes a record, read the details back and wait for a spoken yes
- Speak naturally and briefly; never read out ids"#;

/// Complete system instruction for a session.
/// Seeded with the wall-clock time at session start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPrompt {
    content: String,
}

impl SystemPrompt {
    /// Instruction for turn-based chat
    pub fn chat(user: &User, now: DateTime<Utc>) -> Self {
        Self::build(user, now, CHAT_STYLE)
    }

    /// Instruction for realtime voice sessions
    pub fn live(user: &User, now: DateTime<Utc>) -> Self {
        Self::build(user, now, LIVE_STYLE)
    }

    fn build(user: &User, now: DateTime<Utc>, style: &str) -> Self {
        let local = now.with_timezone(&Local);
        let content = format!(
            "{}\n\n{}\n\nUser: {}\nMonthly budget: {:.2}\nCurrent time: {} ({})",
            BASE_INSTRUCTION,
            style,
            user.display_name,
            user.budget(),
            local.format("%A %Y-%m-%d %H:%M"),
            local.format("%:z"),
        );
        Self { content }
    }

    /// Get the prompt content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Consume and return the content
    pub fn into_content(self) -> String {
        self.content
    }
}
