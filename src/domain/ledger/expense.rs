//! Expense entity and creation draft

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::ValidationError;

/// A recorded expense owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub user_id: String,
    pub amount: f64,
    pub category: String,
    pub description: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Expense fields supplied by the caller; the store assigns id and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseDraft {
    pub user_id: String,
    pub amount: f64,
    pub category: String,
    pub description: String,
    pub date: NaiveDate,
}

impl ExpenseDraft {
    /// Build a validated draft
    pub fn new(
        user_id: impl Into<String>,
        amount: f64,
        category: impl Into<String>,
        description: impl Into<String>,
        date: NaiveDate,
    ) -> Result<Self, ValidationError> {
        validate_amount("amount", amount)?;
        Ok(Self {
            user_id: user_id.into(),
            amount,
            category: category.into(),
            description: description.into(),
            date,
        })
    }

    /// Materialize the draft with system-assigned fields
    pub fn into_expense(self, id: String, created_at: DateTime<Utc>) -> Expense {
        Expense {
            id,
            user_id: self.user_id,
            amount: self.amount,
            category: self.category,
            description: self.description,
            date: self.date,
            created_at,
        }
    }
}

/// Amounts must be finite and non-negative
pub fn validate_amount(field: &str, amount: f64) -> Result<(), ValidationError> {
    if !amount.is_finite() {
        return Err(ValidationError::invalid(field, "must be a number"));
    }
    if amount < 0.0 {
        return Err(ValidationError::invalid(field, "must not be negative"));
    }
    Ok(())
}
