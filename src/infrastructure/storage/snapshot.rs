//! In-memory ledger contents shared by the store adapters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::ports::StoreError;
use crate::domain::ledger::{Appointment, AppointmentDraft, Expense, ExpenseDraft, User};

/// Every record of every user. Serialized as the JSON ledger file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub appointments: Vec<Appointment>,
}

impl LedgerSnapshot {
    pub fn user(&self, id: &str) -> Option<User> {
        self.users.iter().find(|u| u.id == id).cloned()
    }

    pub fn upsert_user(&mut self, user: &User) {
        match self.users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user.clone(),
            None => self.users.push(user.clone()),
        }
    }

    /// Newest date first, then newest created first
    pub fn expenses_for(&self, user_id: &str) -> Vec<Expense> {
        let mut expenses: Vec<Expense> = self
            .expenses
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        expenses.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        expenses
    }

    pub fn insert_expense(&mut self, draft: ExpenseDraft, now: DateTime<Utc>) -> Expense {
        let expense = draft.into_expense(new_id(), now);
        self.expenses.push(expense.clone());
        expense
    }

    pub fn replace_expense(&mut self, expense: &Expense) -> Result<(), StoreError> {
        let slot = self
            .expenses
            .iter_mut()
            .find(|e| e.id == expense.id)
            .ok_or_else(|| StoreError::not_found("Expense", &expense.id))?;
        *slot = expense.clone();
        Ok(())
    }

    /// Earliest first
    pub fn appointments_for(&self, user_id: &str) -> Vec<Appointment> {
        let mut appointments: Vec<Appointment> = self
            .appointments
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        appointments.sort_by(|a, b| a.date.cmp(&b.date));
        appointments
    }

    pub fn insert_appointment(&mut self, draft: AppointmentDraft, now: DateTime<Utc>) -> Appointment {
        let appointment = draft.into_appointment(new_id(), now);
        self.appointments.push(appointment.clone());
        appointment
    }

    pub fn replace_appointment(&mut self, appointment: &Appointment) -> Result<(), StoreError> {
        let slot = self
            .appointments
            .iter_mut()
            .find(|a| a.id == appointment.id)
            .ok_or_else(|| StoreError::not_found("Appointment", &appointment.id))?;
        *slot = appointment.clone();
        Ok(())
    }

    /// Returns whether anything was removed
    pub fn remove_appointment(&mut self, id: &str) -> bool {
        let before = self.appointments.len();
        self.appointments.retain(|a| a.id != id);
        self.appointments.len() != before
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}
