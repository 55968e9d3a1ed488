//! CLI presenter for output formatting

use std::io::{self, Write};

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::domain::conversation::{ConversationTurn, RecordCard, TurnAttachment};
use crate::domain::ledger::{Appointment, User};
use crate::domain::live::LiveSessionState;
use crate::domain::time::human_time;

/// Bar glyphs for the activity indicator, quietest first
const LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Presenter for CLI output formatting
pub struct Presenter {
    spinner: Option<ProgressBar>,
}

impl Presenter {
    pub fn new() -> Self {
        Self { spinner: None }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
        {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        self.spinner = Some(spinner);
    }

    pub fn update_spinner(&self, message: &str) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    pub fn spinner_success(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✓".green(), message));
        }
    }

    pub fn spinner_fail(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✗".red(), message));
        }
    }

    /// Stop spinner without status
    pub fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        eprintln!("{} {}", "ℹ".cyan(), message);
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green(), message);
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Output text to stdout (replies, config values)
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Output text to stdout without newline
    pub fn output_inline(&self, text: &str) {
        print!("{}", text);
        let _ = io::stdout().flush();
    }

    /// Input prompt for interactive chat
    pub fn prompt(&self) {
        self.output_inline(&format!("{} ", "›".cyan().bold()));
    }

    /// Render a resolved turn: reply on stdout, extras on stderr
    pub fn turn(&self, turn: &ConversationTurn) {
        if turn.is_error {
            self.error(turn.text.as_deref().unwrap_or("Something went wrong"));
            return;
        }
        if let Some(text) = &turn.text {
            self.output(text);
        }
        match &turn.attachment {
            Some(TurnAttachment::Card(card)) => self.record_card(card),
            Some(TurnAttachment::ManualEntryForm { hint }) => self.manual_entry(hint.as_deref()),
            None => {}
        }
    }

    pub fn record_card(&self, card: &RecordCard) {
        eprintln!("{}", format_card(card));
    }

    pub fn manual_entry(&self, hint: Option<&str>) {
        match hint {
            Some(hint) => self.info(&format!("Manual entry requested: {}", hint)),
            None => self.info("Manual entry requested"),
        }
    }

    pub fn budget_changed(&self, user: &User) {
        self.success(&format!("Monthly budget is now {:.2}", user.budget()));
    }

    /// Appointment alert raised by the reminder scheduler
    pub fn alert(&self, appointment: &Appointment) {
        eprintln!(
            "{} {} at {}",
            "⏰".yellow(),
            appointment.title.bold(),
            human_time(&appointment.date)
        );
    }

    pub fn live_state(&self, state: LiveSessionState) {
        let label = match state {
            LiveSessionState::Listening => "Listening".green(),
            LiveSessionState::Muted => "Muted".yellow(),
            LiveSessionState::Connecting => "Connecting".cyan(),
            LiveSessionState::Closing => "Closing".cyan(),
            LiveSessionState::Closed => "Closed".dimmed(),
        };
        eprintln!("{} Live: {}", "●".cyan(), label);
    }

    /// Model speech transcript, printed as it streams in
    pub fn transcript(&self, text: &str) {
        self.output_inline(text);
    }

    pub fn activity(&self, levels: &[f32]) {
        eprint!("\r{}", format_activity(levels).cyan());
        let _ = io::stderr().flush();
    }

    /// Shared handle to the active spinner, for progress callbacks
    pub fn spinner_handle(&self) -> Option<ProgressBar> {
        self.spinner.clone()
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

/// One-line summary of a saved record
pub fn format_card(card: &RecordCard) -> String {
    match card {
        RecordCard::Expense(expense) => format!(
            "{} {:.2} · {} · {} · {}",
            "Expense".green().bold(),
            expense.amount,
            expense.category,
            expense.description,
            expense.date
        ),
        RecordCard::Appointment(appointment) => format!(
            "{} {} · {} · {} · {}",
            "Appointment".blue().bold(),
            appointment.title,
            human_time(&appointment.date),
            appointment.kind.as_str(),
            appointment.status.as_str()
        ),
    }
}

/// Recording progress bar
pub fn format_progress(elapsed_ms: u64, total_ms: u64) -> String {
    let elapsed_secs = elapsed_ms / 1000;
    let total_secs = total_ms / 1000;
    let percent = if total_ms > 0 {
        (elapsed_ms as f64 / total_ms as f64 * 100.0).min(100.0)
    } else {
        0.0
    };

    let bar_width = 20;
    let filled = ((percent / 100.0) * bar_width as f64) as usize;
    let empty = bar_width - filled;

    format!(
        "[{}{}] {:>3}s / {}s",
        "█".repeat(filled).cyan(),
        "░".repeat(empty),
        elapsed_secs,
        total_secs
    )
}

/// Map magnitudes in 0..1 onto bar glyphs
pub fn format_activity(levels: &[f32]) -> String {
    levels
        .iter()
        .map(|&level| {
            let index = (level.clamp(0.0, 1.0) * (LEVELS.len() - 1) as f32).round() as usize;
            LEVELS[index.min(LEVELS.len() - 1)]
        })
        .collect()
}
