//! Ledger persistence port

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::ledger::{Appointment, AppointmentDraft, Expense, ExpenseDraft, User};

/// Persistence errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Failed to read ledger: {0}")]
    ReadFailed(String),

    #[error("Failed to write ledger: {0}")]
    WriteFailed(String),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Port for user, expense and appointment storage.
/// Implementations assign ids and creation timestamps on insert.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Look up a user by id
    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Insert or replace a user
    async fn update_user(&self, user: &User) -> Result<(), StoreError>;

    /// Expenses of a user, newest date first (ties: newest created first)
    async fn get_expenses(&self, user_id: &str) -> Result<Vec<Expense>, StoreError>;

    async fn add_expense(&self, draft: ExpenseDraft) -> Result<Expense, StoreError>;

    /// Replace an existing expense. `NotFound` if the id is unknown.
    async fn update_expense(&self, expense: &Expense) -> Result<(), StoreError>;

    /// Appointments of a user, earliest first
    async fn get_appointments(&self, user_id: &str) -> Result<Vec<Appointment>, StoreError>;

    async fn add_appointment(&self, draft: AppointmentDraft) -> Result<Appointment, StoreError>;

    /// Replace an existing appointment. `NotFound` if the id is unknown.
    async fn update_appointment(&self, appointment: &Appointment) -> Result<(), StoreError>;

    /// Remove an appointment. Unknown ids are not an error.
    async fn delete_appointment(&self, id: &str) -> Result<(), StoreError>;
}

/// Shared stores are used by the dispatcher and the reminder task at once
#[async_trait]
impl<T: LedgerStore + ?Sized> LedgerStore for Arc<T> {
    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.as_ref().get_user(id).await
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        self.as_ref().update_user(user).await
    }

    async fn get_expenses(&self, user_id: &str) -> Result<Vec<Expense>, StoreError> {
        self.as_ref().get_expenses(user_id).await
    }

    async fn add_expense(&self, draft: ExpenseDraft) -> Result<Expense, StoreError> {
        self.as_ref().add_expense(draft).await
    }

    async fn update_expense(&self, expense: &Expense) -> Result<(), StoreError> {
        self.as_ref().update_expense(expense).await
    }

    async fn get_appointments(&self, user_id: &str) -> Result<Vec<Appointment>, StoreError> {
        self.as_ref().get_appointments(user_id).await
    }

    async fn add_appointment(&self, draft: AppointmentDraft) -> Result<Appointment, StoreError> {
        self.as_ref().add_appointment(draft).await
    }

    async fn update_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        self.as_ref().update_appointment(appointment).await
    }

    async fn delete_appointment(&self, id: &str) -> Result<(), StoreError> {
        self.as_ref().delete_appointment(id).await
    }
}
