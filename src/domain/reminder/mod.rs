//! Appointment alert timing

mod alert_window;

pub use alert_window::AlertWindow;
