//! JSON ledger persistence tests

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, TimeZone, Utc};
use tempfile::TempDir;

use voice_ledger::application::ports::{LedgerStore, SilentNotifier, StoreError};
use voice_ledger::application::{NotificationScheduler, SchedulerConfig};
use voice_ledger::domain::ledger::{AppointmentDraft, AppointmentStatus, AppointmentType, ExpenseDraft, User};
use voice_ledger::infrastructure::{JsonFileLedgerStore, NoOpAudioCue};

fn lunch(user: &str, day: u32) -> ExpenseDraft {
    let date = NaiveDate::from_ymd_opt(2026, 10, day).unwrap();
    ExpenseDraft::new(user, 12.5, "Food", "Lunch", date).unwrap()
}

fn meeting(title: &str, date: DateTime<Utc>) -> AppointmentDraft {
    AppointmentDraft {
        user_id: "ana@example.com".into(),
        title: title.into(),
        date,
        kind: AppointmentType::Meeting,
    }
}

#[tokio::test]
async fn records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = JsonFileLedgerStore::open_in(dir.path()).await;
        store
            .update_user(&User::new("ana@example.com", "Ana").with_budget(900.0))
            .await
            .unwrap();
        store.add_expense(lunch("ana@example.com", 17)).await.unwrap();
        store
            .add_appointment(AppointmentDraft {
                user_id: "ana@example.com".into(),
                title: "Dentist".into(),
                date: Utc.with_ymd_and_hms(2026, 10, 20, 9, 30, 0).unwrap(),
                kind: AppointmentType::Meeting,
            })
            .await
            .unwrap();
    }

    let store = JsonFileLedgerStore::open_in(dir.path()).await;
    let user = store.get_user("ana@example.com").await.unwrap().unwrap();
    assert_eq!(user.budget(), 900.0);

    let expenses = store.get_expenses("ana@example.com").await.unwrap();
    assert_eq!(expenses.len(), 1);
    assert!(!expenses[0].id.is_empty());

    let appointments = store.get_appointments("ana@example.com").await.unwrap();
    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].status, AppointmentStatus::Scheduled);
    assert!(!appointments[0].notified);
}

#[tokio::test]
async fn records_are_scoped_to_their_owner() {
    let dir = TempDir::new().unwrap();
    let store = JsonFileLedgerStore::open_in(dir.path()).await;
    store.add_expense(lunch("ana@example.com", 17)).await.unwrap();
    store.add_expense(lunch("ben@example.com", 18)).await.unwrap();

    let ana = store.get_expenses("ana@example.com").await.unwrap();
    assert_eq!(ana.len(), 1);
    assert_eq!(ana[0].user_id, "ana@example.com");
}

#[tokio::test]
async fn expenses_newest_date_first() {
    let dir = TempDir::new().unwrap();
    let store = JsonFileLedgerStore::open_in(dir.path()).await;
    store.add_expense(lunch("ana@example.com", 10)).await.unwrap();
    store.add_expense(lunch("ana@example.com", 15)).await.unwrap();
    store.add_expense(lunch("ana@example.com", 12)).await.unwrap();

    let days: Vec<u32> = store
        .get_expenses("ana@example.com")
        .await
        .unwrap()
        .iter()
        .map(|e| e.date.day())
        .collect();
    assert_eq!(days, vec![15, 12, 10]);
}

#[tokio::test]
async fn updating_unknown_expense_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = JsonFileLedgerStore::open_in(dir.path()).await;
    let mut expense = store.add_expense(lunch("ana@example.com", 17)).await.unwrap();
    expense.id = "missing".into();

    assert!(matches!(
        store.update_expense(&expense).await,
        Err(StoreError::NotFound { .. })
    ));
}

#[tokio::test]
async fn corrupt_file_starts_empty_and_is_rewritten() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger.json");
    std::fs::write(&path, "{ not json").unwrap();

    let store = JsonFileLedgerStore::open(&path).await;
    assert!(store.get_user("ana@example.com").await.unwrap().is_none());

    store
        .update_user(&User::new("ana@example.com", "Ana"))
        .await
        .unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(serde_json::from_str::<serde_json::Value>(&content).is_ok());
}

#[tokio::test]
async fn reminder_process_keeps_records_written_by_chat_process() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now();

    let chat = JsonFileLedgerStore::open_in(dir.path()).await;
    chat.add_appointment(meeting("Old", now + TimeDelta::seconds(10)))
        .await
        .unwrap();

    let watcher = Arc::new(JsonFileLedgerStore::open_in(dir.path()).await);
    chat.add_expense(lunch("ana@example.com", 17)).await.unwrap();
    chat.add_appointment(meeting("New", now + TimeDelta::seconds(20)))
        .await
        .unwrap();

    let scheduler = NotificationScheduler::new(
        Arc::clone(&watcher),
        Box::new(SilentNotifier),
        Box::new(NoOpAudioCue::new()),
        SchedulerConfig::default(),
    );
    let fired = scheduler.check_at("ana@example.com", now).await.unwrap();
    let mut titles: Vec<_> = fired.iter().map(|a| a.title.clone()).collect();
    titles.sort();
    assert_eq!(titles, vec!["New", "Old"]);

    let reopened = JsonFileLedgerStore::open_in(dir.path()).await;
    assert_eq!(reopened.get_expenses("ana@example.com").await.unwrap().len(), 1);
    let appointments = reopened.get_appointments("ana@example.com").await.unwrap();
    assert_eq!(appointments.len(), 2);
    assert!(appointments.iter().all(|a| a.notified));
}

#[tokio::test]
async fn unwritable_ledger_rejects_writes_without_phantom_records() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "plain file").unwrap();

    let store = JsonFileLedgerStore::open(blocker.join("ledger.json")).await;
    assert!(matches!(
        store.add_expense(lunch("ana@example.com", 17)).await,
        Err(StoreError::WriteFailed(_))
    ));
    assert!(store
        .add_appointment(meeting("Dentist", Utc::now()))
        .await
        .is_err());

    assert!(store.get_expenses("ana@example.com").await.unwrap().is_empty());
    assert!(store.get_appointments("ana@example.com").await.unwrap().is_empty());
}
