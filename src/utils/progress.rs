//! Progress indicators for long-running operations

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a spinner for indeterminate operations
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn spinner_or_hidden(message: &str, visible: bool) -> ProgressBar {
    if visible {
        create_spinner(message)
    } else {
        let pb = ProgressBar::hidden();
        pb.set_message(message.to_string());
        pb
    }
}

/// Progress wrapper for readiness waits
pub struct WaitProgress {
    pb: ProgressBar,
    resource: String,
}

impl WaitProgress {
    pub fn new(resource: &str, condition: &str, visible: bool) -> Self {
        let message = format!("Waiting for {} to be {}", resource, condition);
        Self {
            pb: spinner_or_hidden(&message, visible),
            resource: resource.to_string(),
        }
    }

    pub fn update(&self, status: &str) {
        self.pb
            .set_message(format!("{}: {}", self.resource, status));
    }

    pub fn finish_success(&self) {
        self.pb
            .finish_with_message(format!("✓ {} ready", self.resource));
    }

    pub fn finish_error(&self, error: &str) {
        self.pb
            .finish_with_message(format!("✗ {} failed: {}", self.resource, error));
    }
}

/// Progress wrapper for one orchestrator stage
pub struct StageProgress {
    pb: ProgressBar,
}

impl StageProgress {
    pub fn new(stage: &str, visible: bool) -> Self {
        Self {
            pb: spinner_or_hidden(stage, visible),
        }
    }

    pub fn set_step(&self, step: &str) {
        self.pb.set_message(step.to_string());
    }

    pub fn finish_success(&self, message: &str) {
        self.pb.finish_with_message(format!("✓ {}", message));
    }

    pub fn finish_error(&self, message: &str) {
        self.pb.finish_with_message(format!("✗ {}", message));
    }
}
