//! Runner for the realtime voice session

use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::application::{LiveInput, LiveSessionManager, LiveUpdate};
use crate::domain::config::AppConfig;
use crate::domain::ledger::Appointment;
use crate::infrastructure::{CpalMicrophone, GeminiLiveModel, RodioOutputDevice};

use super::app::{load_user, open_store, session_options, spawn_reminders, AppError, EXIT_ERROR, EXIT_SUCCESS};
use super::presenter::Presenter;
use super::signals::ShutdownSignal;

/// Keyboard commands read from stdin while the session runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyCommand {
    ToggleMute,
    Quit,
}

fn parse_key_command(line: &str) -> Option<KeyCommand> {
    match line.trim().to_lowercase().as_str() {
        "m" | "mute" => Some(KeyCommand::ToggleMute),
        "q" | "quit" | "exit" => Some(KeyCommand::Quit),
        _ => None,
    }
}

enum Wake {
    Input(Option<LiveInput>),
    Update(LiveUpdate),
    Key(Option<String>),
    Alert(Appointment),
    Shutdown,
}

/// Run a live session until the user quits or the connection ends
pub async fn run_live(config: AppConfig, voice: Option<String>) -> ExitCode {
    let presenter = Presenter::new();
    match live(&config, voice).await {
        Ok(code) => code,
        Err(e) => {
            presenter.error(&e.to_string());
            ExitCode::from(e.exit_status())
        }
    }
}

async fn live(config: &AppConfig, voice: Option<String>) -> Result<ExitCode, AppError> {
    let options = session_options(config, true)?;
    let store = open_store(config).await;
    let mut user = load_user(&store, &options).await?;

    let shutdown = ShutdownSignal::new();
    shutdown.setup().await?;

    let model = GeminiLiveModel::new(options.api_key.clone()).with_model(config.live_model_or_default());
    let voice = voice.unwrap_or_else(|| config.voice_or_default().to_string());
    let (manager, mut updates) = LiveSessionManager::new(
        model,
        Arc::clone(&store),
        Box::new(CpalMicrophone::new()),
        Box::new(RodioOutputDevice::new()),
    );
    let mut manager = manager.with_voice(voice);

    let (alert_tx, mut alerts) = mpsc::unbounded_channel();
    let scheduler = spawn_reminders(Arc::clone(&store), config, &user.id, alert_tx);

    let presenter = Presenter::new();
    if let Err(e) = manager.open(&user).await {
        presenter.error(&e.to_string());
        scheduler.stop().await;
        return Ok(ExitCode::from(EXIT_ERROR));
    }
    presenter.info("Speak freely. Type m + Enter to mute, q + Enter to quit.");

    let show_activity = std::io::stderr().is_terminal();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut exit = EXIT_SUCCESS;

    loop {
        let wake = tokio::select! {
            input = manager.next_input() => Wake::Input(input),
            Some(update) = updates.recv() => Wake::Update(update),
            line = lines.next_line(), if stdin_open => Wake::Key(line.ok().flatten()),
            Some(appointment) = alerts.recv() => Wake::Alert(appointment),
            _ = shutdown.wait() => Wake::Shutdown,
        };

        match wake {
            Wake::Input(None) | Wake::Shutdown => break,
            Wake::Input(Some(input)) => match manager.handle(input).await {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    presenter.error(&e.to_string());
                    exit = EXIT_ERROR;
                    break;
                }
            },
            Wake::Update(update) => {
                if let LiveUpdate::BudgetChanged(changed) = &update {
                    user = changed.clone();
                }
                render_update(&presenter, &update, show_activity);
            }
            Wake::Key(None) => stdin_open = false,
            Wake::Key(Some(line)) => match parse_key_command(&line) {
                Some(KeyCommand::ToggleMute) => {
                    if let Err(e) = manager.toggle_mute() {
                        presenter.warn(&e.to_string());
                    }
                }
                Some(KeyCommand::Quit) => break,
                None => {}
            },
            Wake::Alert(appointment) => presenter.alert(&appointment),
        }
    }

    let report = manager.close().await;
    for step in report.failed_steps() {
        presenter.warn(&format!("Teardown step failed: {}", step));
    }
    while let Ok(update) = updates.try_recv() {
        render_update(&presenter, &update, false);
    }
    scheduler.stop().await;
    debug!(user = %user.id, budget = user.budget(), "live session finished");
    Ok(ExitCode::from(exit))
}

fn render_update(presenter: &Presenter, update: &LiveUpdate, show_activity: bool) {
    match update {
        LiveUpdate::State(state) => presenter.live_state(*state),
        LiveUpdate::Record(card) => presenter.record_card(card),
        LiveUpdate::ManualEntryRequested { hint } => presenter.manual_entry(hint.as_deref()),
        LiveUpdate::BudgetChanged(user) => presenter.budget_changed(user),
        LiveUpdate::Transcript(text) => presenter.transcript(text),
        LiveUpdate::TurnComplete => presenter.output(""),
        LiveUpdate::Activity(levels) => {
            if show_activity {
                presenter.activity(levels);
            }
        }
        LiveUpdate::Error(message) => {
            warn!(%message, "live session error");
            presenter.error(message);
        }
    }
}
