//! Ledger records: users, expenses and appointments

mod appointment;
mod expense;
mod user;

pub use appointment::{
    Appointment, AppointmentDraft, AppointmentStatus, AppointmentSummary, AppointmentType,
};
pub use expense::{validate_amount, Expense, ExpenseDraft};
pub use user::{User, DEFAULT_MONTHLY_BUDGET};
