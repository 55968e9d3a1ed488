//! Appointment reminder use case
//!
//! Polls a user's appointments and alerts exactly once per appointment.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::domain::ledger::Appointment;
use crate::domain::reminder::AlertWindow;
use crate::domain::time::{human_time, Duration};

use super::ports::{AudioCue, AudioCueType, LedgerStore, NotificationIcon, Notifier, StoreError};

/// Configuration for the reminder scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between checks
    pub check_interval: Duration,
    /// When an appointment counts as due
    pub window: AlertWindow,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::default_check_interval(),
            window: AlertWindow::default(),
        }
    }
}

/// Fires appointment alerts for one user
pub struct NotificationScheduler<S: LedgerStore> {
    store: S,
    notifier: Box<dyn Notifier>,
    cue: Box<dyn AudioCue>,
    config: SchedulerConfig,
    alerts: Option<mpsc::UnboundedSender<Appointment>>,
}

impl<S: LedgerStore> NotificationScheduler<S> {
    pub fn new(
        store: S,
        notifier: Box<dyn Notifier>,
        cue: Box<dyn AudioCue>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            cue,
            config,
            alerts: None,
        }
    }

    /// Also publish fired appointments to the UI
    pub fn with_alerts(mut self, alerts: mpsc::UnboundedSender<Appointment>) -> Self {
        self.alerts = Some(alerts);
        self
    }

    /// Run one check against `now`. Returns the appointments that fired.
    pub async fn check_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let appointments = self.store.get_appointments(user_id).await?;
        let mut fired = Vec::new();
        for appointment in appointments {
            if !self.config.window.is_due(&appointment, now) {
                continue;
            }
            match self.fire(appointment).await {
                Ok(appointment) => fired.push(appointment),
                Err(e) => warn!(error = %e, "failed to record reminder"),
            }
        }
        Ok(fired)
    }

    /// Persist, surface, then chime. Nothing is surfaced unless the
    /// `notified` flag is stored, so an alert never repeats.
    async fn fire(&self, appointment: Appointment) -> Result<Appointment, StoreError> {
        info!(id = %appointment.id, title = %appointment.title, "appointment due");

        let mut notified = appointment;
        notified.notified = true;
        self.store.update_appointment(&notified).await?;

        let message = format!("{} at {}", notified.title, human_time(&notified.date));
        if let Err(e) = self
            .notifier
            .notify("Appointment reminder", &message, NotificationIcon::Reminder)
            .await
        {
            warn!(error = %e, "desktop notification failed");
        }
        if let Some(alerts) = &self.alerts {
            let _ = alerts.send(notified.clone());
        }

        if let Err(e) = self.cue.play(AudioCueType::AppointmentAlert).await {
            debug!(error = %e, "alert chime failed");
        }
        Ok(notified)
    }
}

impl<S: LedgerStore + 'static> NotificationScheduler<S> {
    /// Check now, then every interval, on one background task
    pub fn spawn(self, user_id: impl Into<String>) -> SchedulerHandle {
        let user_id = user_id.into();
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let scheduler = Arc::new(self);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scheduler.config.check_interval.as_std());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(user = %user_id, "reminder scheduler started");
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        if let Err(e) = scheduler.check_at(&user_id, Utc::now()).await {
                            warn!(error = %e, "reminder check skipped");
                        }
                    }
                }
            }
            debug!("reminder scheduler stopped");
        });

        SchedulerHandle {
            stop: Some(stop_tx),
            task: Some(task),
        }
    }
}

/// Running scheduler. Dropping it stops the schedule.
pub struct SchedulerHandle {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stop and wait for an in-flight check to finish
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}
