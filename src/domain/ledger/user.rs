//! User entity

use serde::{Deserialize, Serialize};

/// Monthly budget applied when a user has never set one
pub const DEFAULT_MONTHLY_BUDGET: f64 = 5000.0;

/// Account owner. `id` is the unique email-like key that scopes every record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_budget: Option<f64>,
}

impl User {
    /// Create a user with no explicit budget
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            monthly_budget: None,
        }
    }

    /// Budget in effect, falling back to the default
    pub fn budget(&self) -> f64 {
        self.monthly_budget.unwrap_or(DEFAULT_MONTHLY_BUDGET)
    }

    /// Copy of this user with a new budget
    pub fn with_budget(&self, amount: f64) -> Self {
        Self {
            monthly_budget: Some(amount),
            ..self.clone()
        }
    }
}
