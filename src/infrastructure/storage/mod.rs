//! Ledger storage adapters

mod json_file;
mod memory;
mod snapshot;

pub use json_file::{JsonFileLedgerStore, LEDGER_FILE_NAME};
pub use memory::InMemoryLedgerStore;
pub use snapshot::LedgerSnapshot;
