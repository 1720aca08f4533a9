//! CLI presenter for output formatting

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::domain::job::{JobState, ProgressEvent};
use crate::domain::transcription::TranscriptResult;

/// Presenter for CLI output formatting.
///
/// Progress goes to stderr via an indicatif bar fed from the job's
/// event stream; the transcript itself goes to stdout so it can be
/// piped cleanly.
pub struct Presenter {
    bar: Option<ProgressBar>,
}

impl Presenter {
    /// Create a new presenter
    pub fn new() -> Self {
        Self { bar: None }
    }

    /// Start the job progress bar
    pub fn start_progress(&mut self, url: &str) {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_message(format!("submitting {}", url));
        bar.enable_steady_tick(std::time::Duration::from_millis(120));
        self.bar = Some(bar);
    }

    /// Render one progress event onto the bar
    pub fn render_event(&self, event: &ProgressEvent) {
        if let Some(ref bar) = self.bar {
            bar.set_position(u64::from(event.percent));
            let label = match event.state {
                JobState::Running(step) => format!("{}: {}", step, event.message),
                _ => event.message.clone(),
            };
            bar.set_message(label);
        }
    }

    /// Finish the bar with a success mark
    pub fn finish_success(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_with_message(format!("{} transcription complete", "✓".green()));
        }
    }

    /// Finish the bar with a failure mark and reason
    pub fn finish_failure(&mut self, reason: &str) {
        if let Some(bar) = self.bar.take() {
            bar.abandon_with_message(format!("{} {}", "✗".red(), reason));
        }
    }

    /// Print the transcript and any quality metadata
    pub fn transcript(&self, result: &TranscriptResult) {
        println!("{}", result.transcript);
        if result.is_degraded() {
            eprintln!(
                "{} engine returned no confidence or language metadata",
                "⚠".yellow()
            );
            return;
        }
        if let Some(language) = &result.language {
            eprintln!("{} language: {}", "ℹ".cyan(), language);
        }
        if let Some(confidence) = result.confidence {
            eprintln!("{} confidence: {:.0}%", "ℹ".cyan(), confidence * 100.0);
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
    pub fn warning(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Print raw output to stdout
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}
