use crate::import::{ImportMessage, ImportSummary};
use crate::ui::theme;
use crate::ui::Icons;
use indicatif::{HumanDuration, ProgressBar};
use owo_colors::OwoColorize;
use std::time::Duration;

/// Progress output only goes to an interactive, non-quiet stdout
fn visible() -> bool {
    console::Term::stdout().is_term() && !crate::output::is_quiet()
}

/// Byte-based progress bar for an embedding import
pub struct ImportProgress {
    bar: ProgressBar,
}

impl ImportProgress {
    pub fn new(total_bytes: u64) -> Self {
        Self::with_visibility(total_bytes, visible())
    }

    fn with_visibility(total_bytes: u64, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(total_bytes).with_message("Importing embeddings")
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }

    pub fn update(&self, msg: &ImportMessage) {
        if let Some(offset) = msg.offset() {
            self.bar.set_position(offset);
        }
        match msg {
            ImportMessage::Row { image, .. } => self.bar.set_message(image.file_name.clone()),
            ImportMessage::Invalid { line, .. } => self.bar.set_message(format!("skipped line {}", line)),
            ImportMessage::Failed(_) => self.bar.abandon_with_message("Read failed"),
        }
    }

    pub fn finish_with_summary(&self, duration: Duration, summary: &ImportSummary) {
        self.bar.finish_and_clear();
        if crate::output::is_quiet() {
            return;
        }
        println!();
        println!(
            "{} {}",
            Icons::CHECK.style(theme().success.clone()),
            format!("Complete in {}", HumanDuration(duration)).style(theme().success.clone())
        );
        println!(
            "  {} {} imported  {} {} skipped",
            Icons::IMAGE.style(theme().info.clone()),
            summary.inserted,
            Icons::WARN.style(theme().warn.clone()),
            summary.skipped
        );
    }
}

pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        Self::with_visibility(message, visible())
    }

    fn with_visibility(message: &str, visible: bool) -> Self {
        if !visible {
            return Self { pb: ProgressBar::hidden() };
        }
        let pb = ProgressBar::new_spinner();
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }

    pub fn finish_and_clear(&self) {
        self.pb.finish_and_clear();
    }
}
