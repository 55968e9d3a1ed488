//! Tool execution use case
//!
//! Maps a model function call onto a ledger operation. Failures are values:
//! nothing here retries, panics or aborts the enclosing turn.

use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::conversation::{
    ToolCall, ToolError, ToolErrorKind, ToolInvocation, ToolOutput, ToolResult,
};
use crate::domain::ledger::{AppointmentDraft, ExpenseDraft, User};

use super::ports::{LedgerStore, StoreError};

/// Number of expenses returned by `getExpenses`
pub const RECENT_EXPENSE_LIMIT: usize = 10;

impl From<StoreError> for ToolError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self {
                kind: ToolErrorKind::NotFound,
                message: err.to_string(),
            },
            other => Self::storage(other.to_string()),
        }
    }
}

/// Executes tool calls against a ledger store on behalf of one user
pub struct ToolExecutionBridge<S: LedgerStore> {
    store: S,
}

impl<S: LedgerStore> ToolExecutionBridge<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate and run a call by name
    pub async fn execute(
        &self,
        name: &str,
        args: &Value,
        user: &User,
    ) -> Result<ToolOutput, ToolError> {
        let invocation = ToolInvocation::parse(name, args)?;
        self.run(invocation, user).await
    }

    /// Run a call and package the correlated result
    pub async fn resolve(
        &self,
        call: &ToolCall,
        user: &User,
    ) -> (Result<ToolOutput, ToolError>, ToolResult) {
        let outcome = self.execute(&call.name, &call.args, user).await;
        match &outcome {
            Ok(_) => debug!(tool = %call.name, call_id = %call.id, "tool succeeded"),
            Err(e) if e.kind == ToolErrorKind::Storage => {
                warn!(tool = %call.name, error = %e, "tool hit a storage failure")
            }
            Err(e) => debug!(tool = %call.name, error = %e, "tool rejected"),
        }
        let result = ToolResult::from_outcome(call, &outcome);
        (outcome, result)
    }

    /// Run an already validated invocation
    pub async fn run(
        &self,
        invocation: ToolInvocation,
        user: &User,
    ) -> Result<ToolOutput, ToolError> {
        match invocation {
            ToolInvocation::AddExpense(new) => {
                let draft = ExpenseDraft::new(
                    user.id.clone(),
                    new.amount,
                    new.category,
                    new.description,
                    new.date,
                )?;
                let expense = self.store.add_expense(draft).await?;
                Ok(ToolOutput::ExpenseAdded(expense))
            }

            ToolInvocation::UpdateExpense(patch) => {
                let existing = self
                    .store
                    .get_expenses(&user.id)
                    .await?
                    .into_iter()
                    .find(|e| e.id == patch.id)
                    .ok_or_else(|| ToolError::not_found("Expense", &patch.id))?;
                let updated = patch.apply(&existing);
                self.store.update_expense(&updated).await?;
                Ok(ToolOutput::ExpenseUpdated(updated))
            }

            ToolInvocation::SetBudget { amount } => {
                let updated = user.with_budget(amount);
                self.store.update_user(&updated).await?;
                Ok(ToolOutput::BudgetSet(updated))
            }

            ToolInvocation::GetExpenses => {
                let mut expenses = self.store.get_expenses(&user.id).await?;
                expenses.truncate(RECENT_EXPENSE_LIMIT);
                Ok(ToolOutput::Expenses(expenses))
            }

            ToolInvocation::RequestManualEntry { hint } => {
                Ok(ToolOutput::ManualEntryRequested { hint })
            }

            ToolInvocation::AddAppointment(new) => {
                let draft = AppointmentDraft {
                    user_id: user.id.clone(),
                    title: new.title,
                    date: new.date,
                    kind: new.kind,
                };
                let appointment = self.store.add_appointment(draft).await?;
                Ok(ToolOutput::AppointmentAdded(appointment))
            }

            ToolInvocation::GetAppointments => {
                let summaries = self
                    .store
                    .get_appointments(&user.id)
                    .await?
                    .iter()
                    .map(|a| a.summary())
                    .collect();
                Ok(ToolOutput::Appointments(summaries))
            }

            ToolInvocation::UpdateAppointmentStatus { id, status } => {
                let mut appointment = self
                    .store
                    .get_appointments(&user.id)
                    .await?
                    .into_iter()
                    .find(|a| a.id == id)
                    .ok_or_else(|| ToolError::not_found("Appointment", &id))?;
                appointment.status = status;
                self.store.update_appointment(&appointment).await?;
                Ok(ToolOutput::AppointmentUpdated(appointment))
            }

            ToolInvocation::DeleteAppointment { id } => {
                let owned = self
                    .store
                    .get_appointments(&user.id)
                    .await?
                    .iter()
                    .any(|a| a.id == id);
                if owned {
                    self.store.delete_appointment(&id).await?;
                } else {
                    debug!(id = %id, "delete of unknown appointment treated as done");
                }
                Ok(ToolOutput::AppointmentDeleted { id })
            }
        }
    }
}
