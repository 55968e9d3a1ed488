//! Duration value object

use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use crate::domain::error::DurationParseError;

/// Default voice note length (10 seconds)
pub const DEFAULT_NOTE_SECS: u64 = 10;

/// Default interval between reminder checks (30 seconds)
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 30;

/// Default alert lead time before an appointment (60 seconds)
pub const DEFAULT_ALERT_LEAD_SECS: u64 = 60;

/// Default lookback for overdue appointments (1 hour)
pub const DEFAULT_ALERT_LOOKBACK_SECS: u64 = 60 * 60;

/// Value object representing a time duration.
/// Immutable and validated on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration {
    milliseconds: u64,
}

impl Duration {
    /// Create a Duration from milliseconds
    pub const fn from_millis(ms: u64) -> Self {
        Self { milliseconds: ms }
    }

    /// Create a Duration from seconds
    pub const fn from_secs(secs: u64) -> Self {
        Self {
            milliseconds: secs * 1000,
        }
    }

    /// Default voice note length
    pub const fn default_note() -> Self {
        Self::from_secs(DEFAULT_NOTE_SECS)
    }

    /// Default reminder check interval
    pub const fn default_check_interval() -> Self {
        Self::from_secs(DEFAULT_CHECK_INTERVAL_SECS)
    }

    /// Default alert lead time
    pub const fn default_alert_lead() -> Self {
        Self::from_secs(DEFAULT_ALERT_LEAD_SECS)
    }

    /// Default overdue lookback
    pub const fn default_alert_lookback() -> Self {
        Self::from_secs(DEFAULT_ALERT_LOOKBACK_SECS)
    }

    /// Get duration in seconds
    pub const fn as_secs(&self) -> u64 {
        self.milliseconds / 1000
    }

    /// Get duration in milliseconds
    pub const fn as_millis(&self) -> u64 {
        self.milliseconds
    }

    /// Convert to std::time::Duration
    pub const fn as_std(&self) -> StdDuration {
        StdDuration::from_millis(self.milliseconds)
    }

    /// Convert to a signed chrono delta for date arithmetic
    pub fn as_chrono(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::milliseconds(self.milliseconds as i64)
    }
}

impl FromStr for Duration {
    type Err = DurationParseError;

    /// Parse a duration string into a Duration value object.
    /// Supported formats: "30s", "1m", "2m30s", "1h", "1h15m"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim().to_lowercase();
        let invalid = || DurationParseError {
            input: s.to_string(),
        };

        let mut total_secs: u64 = 0;
        let mut current_num = String::new();
        let mut found_any = false;

        for ch in input.chars() {
            if ch.is_ascii_digit() {
                current_num.push(ch);
                continue;
            }

            let unit_secs = match ch {
                'h' => 3600,
                'm' => 60,
                's' => 1,
                _ => return Err(invalid()),
            };
            if current_num.is_empty() {
                return Err(invalid());
            }

            let value: u64 = current_num.parse().map_err(|_| invalid())?;
            total_secs = value
                .checked_mul(unit_secs)
                .and_then(|v| v.checked_add(total_secs))
                .ok_or_else(invalid)?;
            current_num.clear();
            found_any = true;
        }

        // Leftover digits without a unit
        if !current_num.is_empty() || !found_any || total_secs == 0 {
            return Err(invalid());
        }

        Ok(Self::from_secs(total_secs))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_secs = self.as_secs();
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        let seconds = total_secs % 60;

        let mut out = String::new();
        if hours > 0 {
            out.push_str(&format!("{}h", hours));
        }
        if minutes > 0 {
            out.push_str(&format!("{}m", minutes));
        }
        if seconds > 0 || out.is_empty() {
            out.push_str(&format!("{}s", seconds));
        }
        write!(f, "{}", out)
    }
}

impl Default for Duration {
    fn default() -> Self {
        Self::default_note()
    }
}
