//! Time value objects and parsing helpers

mod datetime;
mod duration;

pub use datetime::{human_time, parse_date, parse_datetime};
pub use duration::{
    Duration, DEFAULT_ALERT_LEAD_SECS, DEFAULT_ALERT_LOOKBACK_SECS, DEFAULT_CHECK_INTERVAL_SECS,
    DEFAULT_NOTE_SECS,
};
