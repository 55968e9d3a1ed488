//! The tool contract exposed to the model
//!
//! Every tool the model may call is listed here once. Chat and live sessions
//! declare the same set, and the tool bridge dispatches on [`ToolName`], so a
//! new tool has to be added in both places to be reachable.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{json, Value};

/// All tools, in declaration order
pub const ALL_TOOLS: &[ToolName] = &[
    ToolName::AddExpense,
    ToolName::UpdateExpense,
    ToolName::SetBudget,
    ToolName::GetExpenses,
    ToolName::RequestManualEntry,
    ToolName::AddAppointment,
    ToolName::GetAppointments,
    ToolName::UpdateAppointmentStatus,
    ToolName::DeleteAppointment,
];

/// Tool identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    AddExpense,
    UpdateExpense,
    SetBudget,
    GetExpenses,
    RequestManualEntry,
    AddAppointment,
    GetAppointments,
    UpdateAppointmentStatus,
    DeleteAppointment,
}

impl ToolName {
    /// Wire name used by the model
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AddExpense => "addExpense",
            Self::UpdateExpense => "updateExpense",
            Self::SetBudget => "setBudget",
            Self::GetExpenses => "getExpenses",
            Self::RequestManualEntry => "requestManualEntry",
            Self::AddAppointment => "addAppointment",
            Self::GetAppointments => "getAppointments",
            Self::UpdateAppointmentStatus => "updateAppointmentStatus",
            Self::DeleteAppointment => "deleteAppointment",
        }
    }

    /// Whether a successful call changes stored state
    pub const fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::AddExpense
                | Self::UpdateExpense
                | Self::SetBudget
                | Self::AddAppointment
                | Self::UpdateAppointmentStatus
                | Self::DeleteAppointment
        )
    }

    /// Description shown to the model
    pub const fn description(&self) -> &'static str {
        match self {
            Self::AddExpense => "Record a new expense for the user.",
            Self::UpdateExpense => "Change fields of an existing expense identified by id. Only the provided fields change.",
            Self::SetBudget => "Set the user's monthly budget.",
            Self::GetExpenses => "List the user's 10 most recent expenses, newest first.",
            Self::RequestManualEntry => "Show the user a manual expense entry form when details are unclear or the user asks to type it in.",
            Self::AddAppointment => "Schedule a new appointment for the user.",
            Self::GetAppointments => "List the user's appointments with id, title, time and status.",
            Self::UpdateAppointmentStatus => "Mark an appointment as completed or cancelled.",
            Self::DeleteAppointment => "Permanently delete an appointment.",
        }
    }

    /// JSON schema of the arguments (OpenAPI subset understood by Gemini)
    pub fn parameters(&self) -> Value {
        match self {
            Self::AddExpense => json!({
                "type": "object",
                "properties": {
                    "amount": { "type": "number", "description": "Amount spent, non-negative" },
                    "category": { "type": "string", "description": "Category such as Food, Transport, Bills" },
                    "description": { "type": "string", "description": "Short description of the purchase" },
                    "date": { "type": "string", "description": "Date of the expense as YYYY-MM-DD" }
                },
                "required": ["amount", "category", "description", "date"]
            }),
            Self::UpdateExpense => json!({
                "type": "object",
                "properties": {
                    "id": { "type": "string", "description": "Id of the expense to change" },
                    "amount": { "type": "number" },
                    "category": { "type": "string" },
                    "description": { "type": "string" },
                    "date": { "type": "string", "description": "YYYY-MM-DD" }
                },
                "required": ["id"]
            }),
            Self::SetBudget => json!({
                "type": "object",
                "properties": {
                    "amount": { "type": "number", "description": "New monthly budget" }
                },
                "required": ["amount"]
            }),
            Self::GetExpenses | Self::GetAppointments => json!({
                "type": "object",
                "properties": {}
            }),
            Self::RequestManualEntry => json!({
                "type": "object",
                "properties": {
                    "description": { "type": "string", "description": "Optional hint to pre-fill the form" }
                }
            }),
            Self::AddAppointment => json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "date": { "type": "string", "description": "Full ISO 8601 date-time, e.g. 2026-10-18T15:30:00" },
                    "type": { "type": "string", "enum": ["meeting", "call", "reminder", "other"] }
                },
                "required": ["title", "date", "type"]
            }),
            Self::UpdateAppointmentStatus => json!({
                "type": "object",
                "properties": {
                    "id": { "type": "string" },
                    "status": { "type": "string", "enum": ["completed", "cancelled"] }
                },
                "required": ["id", "status"]
            }),
            Self::DeleteAppointment => json!({
                "type": "object",
                "properties": {
                    "id": { "type": "string" }
                },
                "required": ["id"]
            }),
        }
    }

    /// Build the declaration for this tool
    pub fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: self.as_str().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

impl FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_TOOLS
            .iter()
            .copied()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tool as declared to the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Declarations for every tool
pub fn tool_declarations() -> Vec<ToolDeclaration> {
    ALL_TOOLS.iter().map(ToolName::declaration).collect()
}
