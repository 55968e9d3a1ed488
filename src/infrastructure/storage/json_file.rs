//! Ledger persisted as a single JSON document

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::snapshot::LedgerSnapshot;
use crate::application::ports::{LedgerStore, StoreError};
use crate::domain::ledger::{Appointment, AppointmentDraft, Expense, ExpenseDraft, User};

/// File name inside the data directory
pub const LEDGER_FILE_NAME: &str = "ledger.json";

/// Identity of the file contents we last saw on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

/// Cached document plus the stamp of the file it came from
#[derive(Debug)]
struct Cached {
    snapshot: LedgerSnapshot,
    stamp: Option<FileStamp>,
}

/// JSON ledger file. The whole document is rewritten after every mutation.
///
/// Other processes may write the same file (a `reminders` watcher next to
/// a chat session), so the document is reloaded whenever the file changed
/// since we last read or wrote it.
pub struct JsonFileLedgerStore {
    path: PathBuf,
    state: Mutex<Cached>,
}

impl JsonFileLedgerStore {
    /// Open `ledger.json` in the given data directory
    pub async fn open_in(data_dir: impl AsRef<Path>) -> Self {
        Self::open(data_dir.as_ref().join(LEDGER_FILE_NAME)).await
    }

    /// Open a ledger file. A missing or unreadable file starts an empty ledger.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stamp = stamp_of(&path).await;
        let snapshot = match read_document(&path).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                debug!(path = %path.display(), "no ledger file yet");
                LedgerSnapshot::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot load ledger, starting empty");
                LedgerSnapshot::default()
            }
        };
        Self {
            path,
            state: Mutex::new(Cached { snapshot, stamp }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pick up writes made by other processes
    async fn refresh(&self, cached: &mut Cached) {
        let current = stamp_of(&self.path).await;
        if current == cached.stamp {
            return;
        }
        match read_document(&self.path).await {
            Ok(Some(snapshot)) => {
                debug!(path = %self.path.display(), "ledger changed on disk, reloaded");
                cached.snapshot = snapshot;
            }
            Ok(None) => debug!(path = %self.path.display(), "ledger file vanished, keeping cache"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "cannot reload ledger, keeping cache"),
        }
        cached.stamp = current;
    }

    /// Current document, reloaded if the file changed
    async fn read<T>(&self, view: impl FnOnce(&LedgerSnapshot) -> T) -> T {
        let mut cached = self.state.lock().await;
        self.refresh(&mut cached).await;
        view(&cached.snapshot)
    }

    /// Apply `change` to a copy of the current document and keep it only
    /// once it is on disk. `Ok(None)` from `change` means nothing to write.
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut LedgerSnapshot) -> Result<Option<T>, StoreError>,
    ) -> Result<Option<T>, StoreError> {
        let mut cached = self.state.lock().await;
        self.refresh(&mut cached).await;

        let mut next = cached.snapshot.clone();
        let Some(value) = change(&mut next)? else {
            return Ok(None);
        };
        self.persist(&next).await?;

        cached.snapshot = next;
        cached.stamp = stamp_of(&self.path).await;
        Ok(Some(value))
    }

    /// Write to a sibling temp file, then rename over the ledger
    async fn persist(&self, snapshot: &LedgerSnapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(snapshot)
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .await
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        debug!(path = %self.path.display(), "ledger saved");
        Ok(())
    }
}

async fn stamp_of(path: &Path) -> Option<FileStamp> {
    let metadata = fs::metadata(path).await.ok()?;
    Some(FileStamp {
        modified: metadata.modified().ok(),
        len: metadata.len(),
    })
}

/// `Ok(None)` when the file does not exist
async fn read_document(path: &Path) -> Result<Option<LedgerSnapshot>, String> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.to_string()),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| format!("corrupt ledger: {}", e))
}

#[async_trait]
impl LedgerStore for JsonFileLedgerStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.read(|s| s.user(id)).await)
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        self.mutate(|s| {
            s.upsert_user(user);
            Ok(Some(()))
        })
        .await
        .map(|_| ())
    }

    async fn get_expenses(&self, user_id: &str) -> Result<Vec<Expense>, StoreError> {
        Ok(self.read(|s| s.expenses_for(user_id)).await)
    }

    async fn add_expense(&self, draft: ExpenseDraft) -> Result<Expense, StoreError> {
        let expense = self
            .mutate(|s| Ok(Some(s.insert_expense(draft, Utc::now()))))
            .await?;
        expense.ok_or_else(|| StoreError::WriteFailed("expense was not recorded".into()))
    }

    async fn update_expense(&self, expense: &Expense) -> Result<(), StoreError> {
        self.mutate(|s| s.replace_expense(expense).map(Some))
            .await
            .map(|_| ())
    }

    async fn get_appointments(&self, user_id: &str) -> Result<Vec<Appointment>, StoreError> {
        Ok(self.read(|s| s.appointments_for(user_id)).await)
    }

    async fn add_appointment(&self, draft: AppointmentDraft) -> Result<Appointment, StoreError> {
        let appointment = self
            .mutate(|s| Ok(Some(s.insert_appointment(draft, Utc::now()))))
            .await?;
        appointment.ok_or_else(|| StoreError::WriteFailed("appointment was not recorded".into()))
    }

    async fn update_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        self.mutate(|s| s.replace_appointment(appointment).map(Some))
            .await
            .map(|_| ())
    }

    async fn delete_appointment(&self, id: &str) -> Result<(), StoreError> {
        // Unknown ids leave the file untouched
        self.mutate(|s| Ok(s.remove_appointment(id).then_some(())))
            .await
            .map(|_| ())
    }
}
