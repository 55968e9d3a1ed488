//! Runners for the chat, voice and reminders commands

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::application::ports::{
    AudioCueType, AudioRecorder, ConfigStore, LedgerStore, ProgressCallback, RecordingError,
    StoreError,
};
use crate::application::{
    ChatDispatcher, ChatError, NotificationScheduler, SchedulerConfig, SchedulerHandle,
    SpeechOutput, TurnInput,
};
use crate::domain::config::AppConfig;
use crate::domain::error::DurationParseError;
use crate::domain::ledger::{Appointment, User};
use crate::domain::time::Duration;
use crate::infrastructure::{
    create_audio_cue, create_notifier, CpalRecorder, GeminiChatModel, GeminiSpeechSynthesizer,
    JsonFileLedgerStore, RodioSpeechPlayback, XdgConfigStore,
};

use super::args::SessionOptions;
use super::presenter::{format_progress, Presenter};
use super::signals::ShutdownSignal;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Errors that end a command before or during its run
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing API key. Set GEMINI_API_KEY or run 'voice-ledger config set api_key <key>'")]
    MissingApiKey,

    #[error("No user selected. Pass --user <email> or run 'voice-ledger config set user <email>'")]
    MissingUser,

    #[error("Invalid user id '{0}': expected an email-like id")]
    InvalidUser(String),

    #[error(transparent)]
    InvalidDuration(#[from] DurationParseError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Recording(#[from] RecordingError),

    #[error("Failed to setup signal handler: {0}")]
    Signal(#[from] std::io::Error),
}

impl AppError {
    pub fn exit_status(&self) -> u8 {
        match self {
            Self::MissingUser | Self::InvalidUser(_) | Self::InvalidDuration(_) => EXIT_USAGE_ERROR,
            _ => EXIT_ERROR,
        }
    }
}

/// Load and merge configuration from file, env, and CLI
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = store.load().await.unwrap_or_else(|e| {
        warn!(error = %e, "ignoring unreadable config file");
        AppConfig::empty()
    });

    let env_config = AppConfig {
        api_key: env::var("GEMINI_API_KEY").ok().filter(|s| !s.is_empty()),
        ..AppConfig::empty()
    };

    // defaults < file < env < cli
    AppConfig::defaults()
        .merge(file_config)
        .merge(env_config)
        .merge(cli_config)
}

/// Resolve who we act for, and the API key when the command needs one
pub fn session_options(config: &AppConfig, need_api_key: bool) -> Result<SessionOptions, AppError> {
    let user_id = config
        .user
        .clone()
        .filter(|u| !u.trim().is_empty())
        .ok_or(AppError::MissingUser)?;
    if !user_id.contains('@') {
        return Err(AppError::InvalidUser(user_id));
    }

    let api_key = match config.api_key.clone().filter(|k| !k.is_empty()) {
        Some(key) => key,
        None if need_api_key => return Err(AppError::MissingApiKey),
        None => String::new(),
    };

    Ok(SessionOptions {
        display_name: config.display_name_for(&user_id),
        user_id,
        api_key,
    })
}

pub async fn open_store(config: &AppConfig) -> Arc<JsonFileLedgerStore> {
    let store = JsonFileLedgerStore::open_in(config.data_dir_or_default()).await;
    debug!(path = %store.path().display(), "ledger opened");
    Arc::new(store)
}

/// Fetch the user, creating the account on first use
pub async fn load_user<S: LedgerStore>(
    store: &S,
    options: &SessionOptions,
) -> Result<User, StoreError> {
    if let Some(user) = store.get_user(&options.user_id).await? {
        return Ok(user);
    }
    let user = User::new(options.user_id.clone(), options.display_name.clone());
    store.update_user(&user).await?;
    debug!(user = %user.id, "created user");
    Ok(user)
}

/// Background reminder checks; alerts are forwarded to `alerts`
pub fn spawn_reminders<S: LedgerStore + 'static>(
    store: S,
    config: &AppConfig,
    user_id: &str,
    alerts: mpsc::UnboundedSender<Appointment>,
) -> SchedulerHandle {
    NotificationScheduler::new(
        store,
        create_notifier(config.notify_or_default()),
        create_audio_cue(config.audio_cues_or_default()),
        SchedulerConfig {
            check_interval: config.check_interval_or_default(),
            window: config.alert_window(),
        },
    )
    .with_alerts(alerts)
    .spawn(user_id)
}

/// Print the error and map it to an exit code
fn fail(presenter: &Presenter, error: AppError) -> ExitCode {
    presenter.error(&error.to_string());
    ExitCode::from(error.exit_status())
}

/// Send one message, or chat interactively when `message` is empty
pub async fn run_chat(config: AppConfig, message: Vec<String>, reminders: bool) -> ExitCode {
    let presenter = Presenter::new();
    match chat(&config, message, reminders).await {
        Ok(code) => code,
        Err(e) => fail(&presenter, e),
    }
}

async fn chat(config: &AppConfig, message: Vec<String>, reminders: bool) -> Result<ExitCode, AppError> {
    let options = session_options(config, true)?;
    let store = open_store(config).await;
    let mut user = load_user(&store, &options).await?;

    let model = GeminiChatModel::with_model(options.api_key.clone(), config.chat_model_or_default());
    let mut dispatcher = ChatDispatcher::new(model, Arc::clone(&store));

    let text = message.join(" ");
    if !text.trim().is_empty() {
        let mut presenter = Presenter::new();
        presenter.start_spinner("Thinking...");
        let result = dispatcher.submit(&mut user, TurnInput::text(text)).await;
        presenter.stop_spinner();
        let turn = result?;
        presenter.turn(&turn);
        return Ok(ExitCode::from(EXIT_SUCCESS));
    }

    let shutdown = ShutdownSignal::new();
    shutdown.setup().await?;

    let (alert_tx, mut alerts) = mpsc::unbounded_channel();
    let scheduler = reminders.then(|| spawn_reminders(Arc::clone(&store), config, &user.id, alert_tx));

    let mut presenter = Presenter::new();
    presenter.info(&format!(
        "Chatting as {}. Type 'exit' to leave.",
        user.display_name
    ));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    enum Wake {
        Line(Option<String>),
        Alert(Appointment),
        Shutdown,
    }

    loop {
        presenter.prompt();
        let wake = tokio::select! {
            line = lines.next_line() => Wake::Line(line.ok().flatten()),
            Some(appointment) = alerts.recv() => Wake::Alert(appointment),
            _ = shutdown.wait() => Wake::Shutdown,
        };

        let line = match wake {
            Wake::Line(Some(line)) => line,
            Wake::Line(None) | Wake::Shutdown => break,
            Wake::Alert(appointment) => {
                presenter.output("");
                presenter.alert(&appointment);
                continue;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        presenter.start_spinner("Thinking...");
        let result = dispatcher.submit(&mut user, TurnInput::text(line)).await;
        presenter.stop_spinner();
        match result {
            Ok(turn) => presenter.turn(&turn),
            // Failed turns stay in the history; the session goes on
            Err(e) => presenter.error(&e.to_string()),
        }
    }

    if let Some(scheduler) = scheduler {
        scheduler.stop().await;
    }
    Ok(ExitCode::from(EXIT_SUCCESS))
}

/// Record a voice note, send it, and speak the reply
pub async fn run_voice(config: AppConfig, duration: Option<String>, silent: bool) -> ExitCode {
    let presenter = Presenter::new();
    match voice(&config, duration, silent).await {
        Ok(code) => code,
        Err(e) => fail(&presenter, e),
    }
}

async fn voice(config: &AppConfig, duration: Option<String>, silent: bool) -> Result<ExitCode, AppError> {
    let max_duration = match duration {
        Some(d) => d.parse::<Duration>()?,
        None => config.note_duration_or_default(),
    };
    let options = session_options(config, true)?;
    let store = open_store(config).await;
    let mut user = load_user(&store, &options).await?;

    let shutdown = Arc::new(ShutdownSignal::new());
    shutdown.setup().await?;

    let recorder = Arc::new(CpalRecorder::new());
    let stopper = {
        let recorder = Arc::clone(&recorder);
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            shutdown.wait().await;
            recorder.stop_early();
        })
    };

    let cue = create_audio_cue(config.audio_cues_or_default());
    let mut presenter = Presenter::new();

    presenter.info("Press Ctrl+C to stop early");
    presenter.start_spinner(&format_progress(0, max_duration.as_millis()));
    let progress: Option<ProgressCallback> = presenter.spinner_handle().map(|spinner| {
        Arc::new(move |elapsed: u64, total: u64| {
            spinner.set_message(format_progress(elapsed, total));
        }) as ProgressCallback
    });

    let _ = cue.play(AudioCueType::RecordingStart).await;
    let recorded = recorder.record(max_duration, progress).await;
    let _ = cue.play(AudioCueType::RecordingStop).await;
    stopper.abort();

    let audio = match recorded {
        Ok(audio) => {
            presenter.spinner_success(&format!("Recorded {}", audio.human_readable_size()));
            audio
        }
        Err(e) => {
            presenter.spinner_fail("Recording failed");
            return Err(e.into());
        }
    };

    let model = GeminiChatModel::with_model(options.api_key.clone(), config.chat_model_or_default());
    let mut dispatcher = ChatDispatcher::new(model, Arc::clone(&store));
    if !silent {
        let synthesizer = GeminiSpeechSynthesizer::new(options.api_key.clone())
            .with_model(config.tts_model_or_default())
            .with_voice(config.voice_or_default());
        dispatcher = dispatcher.with_speech(SpeechOutput::new(
            Box::new(synthesizer),
            Box::new(RodioSpeechPlayback::new()),
        ));
    }

    presenter.start_spinner("Thinking...");
    let result = dispatcher.submit(&mut user, TurnInput::voice(audio)).await;
    presenter.stop_spinner();
    presenter.turn(&result?);
    Ok(ExitCode::from(EXIT_SUCCESS))
}

/// Watch appointments until interrupted
pub async fn run_reminders(config: AppConfig) -> ExitCode {
    let presenter = Presenter::new();
    match reminders(&config).await {
        Ok(code) => code,
        Err(e) => fail(&presenter, e),
    }
}

async fn reminders(config: &AppConfig) -> Result<ExitCode, AppError> {
    let options = session_options(config, false)?;
    let store = open_store(config).await;
    let user = load_user(&store, &options).await?;

    let shutdown = ShutdownSignal::new();
    shutdown.setup().await?;

    let (alert_tx, mut alerts) = mpsc::unbounded_channel();
    let scheduler = spawn_reminders(Arc::clone(&store), config, &user.id, alert_tx);

    let presenter = Presenter::new();
    presenter.info(&format!(
        "Watching appointments for {} every {}. Press Ctrl+C to stop.",
        user.display_name,
        config.check_interval_or_default()
    ));

    loop {
        tokio::select! {
            Some(appointment) = alerts.recv() => presenter.alert(&appointment),
            _ = shutdown.wait() => break,
        }
    }

    scheduler.stop().await;
    presenter.success("Stopped");
    Ok(ExitCode::from(EXIT_SUCCESS))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::infrastructure::InMemoryLedgerStore;

    fn config_with(user: Option<&str>, api_key: Option<&str>) -> AppConfig {
        AppConfig {
            user: user.map(String::from),
            api_key: api_key.map(String::from),
            ..AppConfig::defaults()
        }
    }

    #[test]
    fn session_requires_user() {
        let err = session_options(&config_with(None, Some("key")), true).unwrap_err();
        assert!(matches!(err, AppError::MissingUser));
        assert_eq!(err.exit_status(), EXIT_USAGE_ERROR);
    }

    #[test]
    fn session_rejects_non_email_user() {
        let err = session_options(&config_with(Some("ana"), Some("key")), true).unwrap_err();
        assert!(matches!(err, AppError::InvalidUser(_)));
    }

    #[test]
    fn api_key_only_required_when_asked() {
        let config = config_with(Some("ana@example.com"), None);
        let err = session_options(&config, true).unwrap_err();
        assert!(matches!(err, AppError::MissingApiKey));
        assert_eq!(err.exit_status(), EXIT_ERROR);

        let options = session_options(&config, false).unwrap();
        assert_eq!(options.user_id, "ana@example.com");
        assert!(options.api_key.is_empty());
    }

    #[test]
    fn display_name_falls_back_to_config() {
        let config = AppConfig {
            display_name: Some("Ana".into()),
            ..config_with(Some("ana@example.com"), Some("key"))
        };
        let options = session_options(&config, true).unwrap();
        assert_eq!(options.display_name, "Ana");
    }

    #[tokio::test]
    async fn load_user_creates_account_once() {
        let store = InMemoryLedgerStore::new();
        let options = SessionOptions {
            user_id: "ana@example.com".into(),
            display_name: "Ana".into(),
            api_key: String::new(),
        };

        let created = load_user(&store, &options).await.unwrap();
        assert_eq!(created.display_name, "Ana");

        let budgeted = created.with_budget(300.0);
        store.update_user(&budgeted).await.unwrap();

        let loaded = load_user(&store, &options).await.unwrap();
        assert_eq!(loaded.budget(), 300.0);
    }
}
