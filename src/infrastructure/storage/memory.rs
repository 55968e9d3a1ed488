//! Volatile ledger store

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::snapshot::LedgerSnapshot;
use crate::application::ports::{LedgerStore, StoreError};
use crate::domain::ledger::{Appointment, AppointmentDraft, Expense, ExpenseDraft, User};

/// Ledger kept in memory for the life of the process
#[derive(Default)]
pub struct InMemoryLedgerStore {
    state: Mutex<LedgerSnapshot>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing contents
    pub fn with_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
        }
    }

    /// Copy of the current contents
    pub async fn snapshot(&self) -> LedgerSnapshot {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.state.lock().await.user(id))
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        self.state.lock().await.upsert_user(user);
        Ok(())
    }

    async fn get_expenses(&self, user_id: &str) -> Result<Vec<Expense>, StoreError> {
        Ok(self.state.lock().await.expenses_for(user_id))
    }

    async fn add_expense(&self, draft: ExpenseDraft) -> Result<Expense, StoreError> {
        Ok(self.state.lock().await.insert_expense(draft, Utc::now()))
    }

    async fn update_expense(&self, expense: &Expense) -> Result<(), StoreError> {
        self.state.lock().await.replace_expense(expense)
    }

    async fn get_appointments(&self, user_id: &str) -> Result<Vec<Appointment>, StoreError> {
        Ok(self.state.lock().await.appointments_for(user_id))
    }

    async fn add_appointment(&self, draft: AppointmentDraft) -> Result<Appointment, StoreError> {
        Ok(self.state.lock().await.insert_appointment(draft, Utc::now()))
    }

    async fn update_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        self.state.lock().await.replace_appointment(appointment)
    }

    async fn delete_appointment(&self, id: &str) -> Result<(), StoreError> {
        self.state.lock().await.remove_appointment(id);
        Ok(())
    }
}
