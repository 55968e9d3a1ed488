//! Voice Ledger CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use voice_ledger::cli::{
    app::{load_merged_config, run_chat, run_reminders, run_voice, EXIT_ERROR, EXIT_USAGE_ERROR},
    args::{Cli, Commands},
    config_cmd::handle_config_command,
    live_app::run_live,
    presenter::Presenter,
};
use voice_ledger::domain::config::AppConfig;
use voice_ledger::domain::time::Duration;
use voice_ledger::infrastructure::XdgConfigStore;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    // Quiet by default so logs don't interleave with replies; RUST_LOG overrides
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("voice_ledger=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let presenter = Presenter::new();

    if let Commands::Config { action } = cli.command {
        let store = XdgConfigStore::new();
        if let Err(e) = handle_config_command(action, &store, &presenter).await {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
        return ExitCode::SUCCESS;
    }

    let interval = match &cli.command {
        Commands::Reminders { interval: Some(interval) } => match interval.parse::<Duration>() {
            Ok(_) => Some(interval.clone()),
            Err(e) => {
                presenter.error(&format!("Invalid interval: {}", e));
                return ExitCode::from(EXIT_USAGE_ERROR);
            }
        },
        _ => None,
    };

    // Build CLI config from args; flags only ever switch things off
    let cli_config = AppConfig {
        user: cli.user.clone(),
        check_interval: interval,
        notify: cli.no_notify.then_some(false),
        audio_cues: cli.no_cues.then_some(false),
        ..AppConfig::empty()
    };
    let config = load_merged_config(cli_config).await;

    match cli.command {
        Commands::Chat {
            message,
            no_reminders,
        } => run_chat(config, message, !no_reminders).await,
        Commands::Voice { duration, silent } => run_voice(config, duration, silent).await,
        Commands::Live { voice } => run_live(config, voice).await,
        Commands::Reminders { .. } => run_reminders(config).await,
        Commands::Config { .. } => ExitCode::SUCCESS,
    }
}
