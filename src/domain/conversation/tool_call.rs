//! Function calls requested by the model and the results sent back

use serde_json::{json, Value};
use thiserror::Error;

use crate::domain::error::ValidationError;
use crate::domain::ledger::{Appointment, AppointmentSummary, Expense, User};

use super::turn::RecordCard;

/// A function call from the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub args: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }
}

/// The answer to exactly one [`ToolCall`], correlated by `call_id`
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub call_id: String,
    pub name: String,
    pub payload: Value,
}

impl ToolResult {
    /// Convert an execution outcome into the payload sent to the model.
    /// Failures become `{"error": message}`.
    pub fn from_outcome(call: &ToolCall, outcome: &Result<ToolOutput, ToolError>) -> Self {
        let payload = match outcome {
            Ok(output) => output.to_payload(),
            Err(err) => json!({ "error": err.message }),
        };
        Self {
            call_id: call.id.clone(),
            name: call.name.clone(),
            payload,
        }
    }

    pub fn is_error(&self) -> bool {
        self.payload.get("error").is_some()
    }
}

/// Category of a failed tool execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    UnknownTool,
    Validation,
    NotFound,
    Storage,
}

/// A tool execution failure. Always reported back to the model as data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn unknown_tool(name: &str) -> Self {
        Self {
            kind: ToolErrorKind::UnknownTool,
            message: format!("Unknown tool: {}", name),
        }
    }

    pub fn not_found(what: &str, id: &str) -> Self {
        Self {
            kind: ToolErrorKind::NotFound,
            message: format!("{} not found: {}", what, id),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::Storage,
            message: message.into(),
        }
    }
}

impl From<ValidationError> for ToolError {
    fn from(err: ValidationError) -> Self {
        Self {
            kind: ToolErrorKind::Validation,
            message: err.to_string(),
        }
    }
}

/// Successful tool execution
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    ExpenseAdded(Expense),
    ExpenseUpdated(Expense),
    BudgetSet(User),
    Expenses(Vec<Expense>),
    ManualEntryRequested { hint: Option<String> },
    AppointmentAdded(Appointment),
    Appointments(Vec<AppointmentSummary>),
    AppointmentUpdated(Appointment),
    AppointmentDeleted { id: String },
}

impl ToolOutput {
    /// JSON handed back to the model
    pub fn to_payload(&self) -> Value {
        match self {
            Self::ExpenseAdded(expense) | Self::ExpenseUpdated(expense) => {
                json!({ "success": true, "expense": expense })
            }
            Self::BudgetSet(user) => json!({
                "success": true,
                "user": user,
                "monthlyBudget": user.budget()
            }),
            Self::Expenses(expenses) => json!({ "expenses": expenses }),
            Self::ManualEntryRequested { .. } => json!({
                "success": true,
                "message": "Manual entry form shown to the user"
            }),
            Self::AppointmentAdded(appointment) | Self::AppointmentUpdated(appointment) => {
                json!({ "success": true, "appointment": appointment })
            }
            Self::Appointments(summaries) => json!({ "appointments": summaries }),
            Self::AppointmentDeleted { id } => json!({ "success": true, "deletedId": id }),
        }
    }

    /// Record snapshot worth showing next to the reply
    pub fn card(&self) -> Option<RecordCard> {
        match self {
            Self::ExpenseAdded(expense) | Self::ExpenseUpdated(expense) => {
                Some(RecordCard::Expense(expense.clone()))
            }
            Self::AppointmentAdded(appointment) | Self::AppointmentUpdated(appointment) => {
                Some(RecordCard::Appointment(appointment.clone()))
            }
            _ => None,
        }
    }

    /// Short confirmation used when the model replies without text
    pub fn confirmation(&self) -> Option<String> {
        match self {
            Self::ExpenseAdded(e) => Some(format!("Saved {:.2} for {}.", e.amount, e.description)),
            Self::ExpenseUpdated(_) => Some("Expense updated.".to_string()),
            Self::BudgetSet(user) => Some(format!("Monthly budget set to {:.2}.", user.budget())),
            Self::AppointmentAdded(a) => Some(format!("Scheduled \"{}\".", a.title)),
            Self::AppointmentUpdated(a) => Some(format!("\"{}\" marked {}.", a.title, a.status)),
            Self::AppointmentDeleted { .. } => Some("Appointment deleted.".to_string()),
            Self::Expenses(_) | Self::ManualEntryRequested { .. } | Self::Appointments(_) => None,
        }
    }
}
