//! Desktop notification adapters

mod notify_rust;

pub use notify_rust::NotifyRustNotifier;

use crate::application::ports::{Notifier, SilentNotifier};

/// Create the notifier, or a silent one when notifications are disabled
pub fn create_notifier(enabled: bool) -> Box<dyn Notifier> {
    if enabled {
        Box::new(NotifyRustNotifier::new())
    } else {
        Box::new(SilentNotifier)
    }
}
