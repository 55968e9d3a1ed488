//! Typed view of a model function call

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::domain::error::ValidationError;
use crate::domain::ledger::{
    validate_amount, AppointmentStatus, AppointmentType, Expense,
};
use crate::domain::time::{parse_date, parse_datetime};

use super::tool_call::ToolError;
use super::tools::ToolName;

/// Fields for a new expense
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub amount: f64,
    pub category: String,
    pub description: String,
    pub date: NaiveDate,
}

/// Partial update of an expense. Absent fields keep their value.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpensePatch {
    pub id: String,
    pub amount: Option<f64>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
}

impl ExpensePatch {
    /// Merge onto an existing expense. Id, owner and creation time never change.
    pub fn apply(&self, expense: &Expense) -> Expense {
        Expense {
            amount: self.amount.unwrap_or(expense.amount),
            category: self.category.clone().unwrap_or_else(|| expense.category.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| expense.description.clone()),
            date: self.date.unwrap_or(expense.date),
            ..expense.clone()
        }
    }
}

/// Fields for a new appointment
#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub title: String,
    pub date: DateTime<Utc>,
    pub kind: AppointmentType,
}

/// A function call with validated, typed arguments
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    AddExpense(NewExpense),
    UpdateExpense(ExpensePatch),
    SetBudget { amount: f64 },
    GetExpenses,
    /// UI signal only; never reaches the store
    RequestManualEntry { hint: Option<String> },
    AddAppointment(NewAppointment),
    GetAppointments,
    UpdateAppointmentStatus { id: String, status: AppointmentStatus },
    DeleteAppointment { id: String },
}

impl ToolInvocation {
    /// Validate a raw call. `null` arguments are treated as an empty object.
    pub fn parse(name: &str, args: &Value) -> Result<Self, ToolError> {
        let tool: ToolName = name.parse().map_err(|_| ToolError::unknown_tool(name))?;

        let invocation = match tool {
            ToolName::AddExpense => {
                let raw: RawAddExpense = parse_args(tool, args)?;
                validate_amount("amount", raw.amount)?;
                Self::AddExpense(NewExpense {
                    amount: raw.amount,
                    category: raw.category,
                    description: raw.description,
                    date: parse_date("date", &raw.date)?,
                })
            }
            ToolName::UpdateExpense => {
                let raw: RawUpdateExpense = parse_args(tool, args)?;
                if let Some(amount) = raw.amount {
                    validate_amount("amount", amount)?;
                }
                let date = raw.date.as_deref().map(|d| parse_date("date", d)).transpose()?;
                Self::UpdateExpense(ExpensePatch {
                    id: raw.id,
                    amount: raw.amount,
                    category: raw.category,
                    description: raw.description,
                    date,
                })
            }
            ToolName::SetBudget => {
                let raw: RawAmount = parse_args(tool, args)?;
                validate_amount("amount", raw.amount)?;
                Self::SetBudget { amount: raw.amount }
            }
            ToolName::GetExpenses => Self::GetExpenses,
            ToolName::RequestManualEntry => {
                let raw: RawManualEntry = parse_args(tool, args)?;
                Self::RequestManualEntry {
                    hint: raw.description.filter(|d| !d.trim().is_empty()),
                }
            }
            ToolName::AddAppointment => {
                let raw: RawAddAppointment = parse_args(tool, args)?;
                Self::AddAppointment(NewAppointment {
                    title: raw.title,
                    date: parse_datetime("date", &raw.date)?,
                    kind: raw.kind.parse()?,
                })
            }
            ToolName::GetAppointments => Self::GetAppointments,
            ToolName::UpdateAppointmentStatus => {
                let raw: RawStatusUpdate = parse_args(tool, args)?;
                let status: AppointmentStatus = raw.status.parse()?;
                if status == AppointmentStatus::Scheduled {
                    return Err(ValidationError::invalid(
                        "status",
                        "must be completed or cancelled",
                    )
                    .into());
                }
                Self::UpdateAppointmentStatus { id: raw.id, status }
            }
            ToolName::DeleteAppointment => {
                let raw: RawId = parse_args(tool, args)?;
                Self::DeleteAppointment { id: raw.id }
            }
        };

        Ok(invocation)
    }

    /// The tool this invocation targets
    pub fn tool(&self) -> ToolName {
        match self {
            Self::AddExpense(_) => ToolName::AddExpense,
            Self::UpdateExpense(_) => ToolName::UpdateExpense,
            Self::SetBudget { .. } => ToolName::SetBudget,
            Self::GetExpenses => ToolName::GetExpenses,
            Self::RequestManualEntry { .. } => ToolName::RequestManualEntry,
            Self::AddAppointment(_) => ToolName::AddAppointment,
            Self::GetAppointments => ToolName::GetAppointments,
            Self::UpdateAppointmentStatus { .. } => ToolName::UpdateAppointmentStatus,
            Self::DeleteAppointment { .. } => ToolName::DeleteAppointment,
        }
    }
}

fn parse_args<T: DeserializeOwned>(tool: ToolName, args: &Value) -> Result<T, ToolError> {
    let args = match args {
        Value::Null => Value::Object(Default::default()),
        other => other.clone(),
    };
    serde_json::from_value(args).map_err(|err| {
        let message = err.to_string();
        let error = match missing_field(&message) {
            Some(field) => ValidationError::MissingField(field),
            None => ValidationError::invalid(tool.as_str(), message),
        };
        ToolError::from(error)
    })
}

// serde reports missing fields as "missing field `name`"
fn missing_field(message: &str) -> Option<String> {
    let rest = message.strip_prefix("missing field `")?;
    rest.split('`').next().map(str::to_string)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn into_f64<E: serde::de::Error>(self) -> Result<f64, E> {
        match self {
            Self::Number(n) => Ok(n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("\"{}\" is not a number", s))),
        }
    }
}

// Models occasionally send amounts as strings ("12.50")
fn de_amount<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Numeric::deserialize(d)?.into_f64()
}

fn de_opt_amount<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    match Option::<Numeric>::deserialize(d)? {
        Some(n) => n.into_f64().map(Some),
        None => Ok(None),
    }
}

#[derive(Deserialize)]
struct RawAddExpense {
    #[serde(deserialize_with = "de_amount")]
    amount: f64,
    category: String,
    description: String,
    date: String,
}

#[derive(Deserialize)]
struct RawUpdateExpense {
    id: String,
    #[serde(default, deserialize_with = "de_opt_amount")]
    amount: Option<f64>,
    category: Option<String>,
    description: Option<String>,
    date: Option<String>,
}

#[derive(Deserialize)]
struct RawAmount {
    #[serde(deserialize_with = "de_amount")]
    amount: f64,
}

#[derive(Deserialize)]
struct RawManualEntry {
    description: Option<String>,
}

#[derive(Deserialize)]
struct RawAddAppointment {
    title: String,
    date: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct RawStatusUpdate {
    id: String,
    status: String,
}

#[derive(Deserialize)]
struct RawId {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::ToolErrorKind;
    use serde_json::json;

    #[test]
    fn parses_add_expense() {
        let inv = ToolInvocation::parse(
            "addExpense",
            &json!({ "amount": 12.5, "category": "Food", "description": "Lunch", "date": "2026-10-18" }),
        )
        .unwrap();
        match inv {
            ToolInvocation::AddExpense(e) => {
                assert_eq!(e.amount, 12.5);
                assert_eq!(e.date, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn amount_may_be_a_numeric_string() {
        let inv = ToolInvocation::parse("setBudget", &json!({ "amount": "1200" })).unwrap();
        assert_eq!(inv, ToolInvocation::SetBudget { amount: 1200.0 });
    }

    #[test]
    fn missing_field_is_reported_by_name() {
        let err = ToolInvocation::parse("addExpense", &json!({ "amount": 3 })).unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::Validation);
        assert!(err.message.contains("category"), "{}", err.message);
    }

    #[test]
    fn negative_amount_rejected() {
        let err = ToolInvocation::parse("setBudget", &json!({ "amount": -5 })).unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::Validation);
    }

    #[test]
    fn unknown_tool_rejected() {
        let err = ToolInvocation::parse("launchRocket", &json!({})).unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::UnknownTool);
        assert_eq!(err.message, "Unknown tool: launchRocket");
    }

    #[test]
    fn null_args_allowed_for_read_tools() {
        assert_eq!(
            ToolInvocation::parse("getExpenses", &Value::Null).unwrap(),
            ToolInvocation::GetExpenses
        );
    }

    #[test]
    fn status_update_only_closes_appointments() {
        let err = ToolInvocation::parse(
            "updateAppointmentStatus",
            &json!({ "id": "a1", "status": "scheduled" }),
        )
        .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::Validation);

        let ok = ToolInvocation::parse(
            "updateAppointmentStatus",
            &json!({ "id": "a1", "status": "completed" }),
        )
        .unwrap();
        assert_eq!(ok.tool(), ToolName::UpdateAppointmentStatus);
    }

    #[test]
    fn add_appointment_parses_type_and_date() {
        let inv = ToolInvocation::parse(
            "addAppointment",
            &json!({ "title": "Dentist", "date": "2026-10-20T09:00:00Z", "type": "meeting" }),
        )
        .unwrap();
        match inv {
            ToolInvocation::AddAppointment(a) => {
                assert_eq!(a.kind, AppointmentType::Meeting);
                assert_eq!(a.date.to_rfc3339(), "2026-10-20T09:00:00+00:00");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn manual_entry_blank_hint_is_none() {
        let inv = ToolInvocation::parse("requestManualEntry", &json!({ "description": "  " })).unwrap();
        assert_eq!(inv, ToolInvocation::RequestManualEntry { hint: None });
    }

    #[test]
    fn patch_keeps_unspecified_fields() {
        let original = Expense {
            id: "e1".into(),
            user_id: "u".into(),
            amount: 10.0,
            category: "Food".into(),
            description: "Lunch".into(),
            date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            created_at: Utc::now(),
        };
        let patch = ExpensePatch {
            id: "e1".into(),
            amount: Some(15.0),
            category: None,
            description: None,
            date: None,
        };
        let updated = patch.apply(&original);
        assert_eq!(updated.amount, 15.0);
        assert_eq!(updated.category, "Food");
        assert_eq!(updated.created_at, original.created_at);
    }
}
