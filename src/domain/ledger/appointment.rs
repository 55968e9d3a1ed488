//! Appointment entity, status and type

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::ValidationError;
use crate::domain::time::human_time;

/// Lifecycle of an appointment. Only explicit updates move it off `Scheduled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Get the string identifier for this status
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scheduled" => Ok(Self::Scheduled),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(ValidationError::invalid(
                "status",
                format!("\"{}\" is not one of scheduled, completed, cancelled", s),
            )),
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of appointment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentType {
    Meeting,
    Call,
    Reminder,
    #[default]
    Other,
}

impl AppointmentType {
    /// Get the string identifier for this type
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Meeting => "meeting",
            Self::Call => "call",
            Self::Reminder => "reminder",
            Self::Other => "other",
        }
    }
}

impl FromStr for AppointmentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "meeting" => Ok(Self::Meeting),
            "call" => Ok(Self::Call),
            "reminder" => Ok(Self::Reminder),
            "other" => Ok(Self::Other),
            _ => Err(ValidationError::invalid(
                "type",
                format!("\"{}\" is not one of meeting, call, reminder, other", s),
            )),
        }
    }
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A dated appointment owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub status: AppointmentStatus,
    #[serde(rename = "type")]
    pub kind: AppointmentType,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub notified: bool,
}

impl Appointment {
    /// Whether the reminder scheduler still owes this appointment an alert
    pub fn awaits_alert(&self) -> bool {
        self.status == AppointmentStatus::Scheduled && !self.notified
    }

    /// Redacted view handed to the model
    pub fn summary(&self) -> AppointmentSummary {
        AppointmentSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            time: human_time(&self.date),
            status: self.status,
        }
    }
}

/// Appointment as listed to the model: no owner, no bookkeeping flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentSummary {
    pub id: String,
    pub title: String,
    pub time: String,
    pub status: AppointmentStatus,
}

/// Appointment fields supplied by the caller.
/// New appointments always start `Scheduled` and not yet notified.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentDraft {
    pub user_id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub kind: AppointmentType,
}

impl AppointmentDraft {
    /// Materialize the draft with system-assigned fields
    pub fn into_appointment(self, id: String, created_at: DateTime<Utc>) -> Appointment {
        Appointment {
            id,
            user_id: self.user_id,
            title: self.title,
            date: self.date,
            status: AppointmentStatus::Scheduled,
            kind: self.kind,
            created_at,
            notified: false,
        }
    }
}
