//! Time range in which an appointment alert fires

use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::ledger::Appointment;
use crate::domain::time::Duration;

/// An appointment is due once it is within `lead` of its start and no more
/// than `lookback` past it. Anything older is considered stale and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertWindow {
    lead: Duration,
    lookback: Duration,
}

impl AlertWindow {
    pub fn new(lead: Duration, lookback: Duration) -> Self {
        Self { lead, lookback }
    }

    pub fn lead(&self) -> Duration {
        self.lead
    }

    pub fn lookback(&self) -> Duration {
        self.lookback
    }

    /// `diff` is appointment time minus now
    pub fn contains(&self, diff: TimeDelta) -> bool {
        diff <= self.lead.as_chrono() && diff >= -self.lookback.as_chrono()
    }

    /// Whether the scheduler should alert for this appointment now
    pub fn is_due(&self, appointment: &Appointment, now: DateTime<Utc>) -> bool {
        appointment.awaits_alert() && self.contains(appointment.date - now)
    }
}

impl Default for AlertWindow {
    fn default() -> Self {
        Self::new(Duration::default_alert_lead(), Duration::default_alert_lookback())
    }
}
