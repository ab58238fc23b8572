use console::style;
use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while waiting on Azure or another external tool.
pub struct Spinner {
    bar: IndicatifBar,
}

impl Spinner {
    /// Creates a spinner with a label and elapsed time.
    pub fn new(label: &str) -> Self {
        let bar = IndicatifBar::new_spinner();
        let style_result = ProgressStyle::default_spinner().template(&format!(
            "{{spinner:.cyan}} {} {{msg:.dim}} {{elapsed:.dim}}",
            style(label).dim()
        ));
        if let Ok(spinner_style) = style_result {
            bar.set_style(spinner_style);
        }
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Updates the trailing status message (e.g. the current provisioning state).
    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Finishes the spinner with a success message.
    pub fn finish(&self, message: &str) {
        self.bar
            .finish_with_message(format!("{} {}", style("✓").green(), message));
    }

    /// Finishes the spinner with an error message.
    pub fn finish_error(&self, message: &str) {
        self.bar
            .finish_with_message(format!("{} {}", style("✗").red(), message));
    }

    /// Clears the spinner without a final message.
    pub fn abandon(&self) {
        self.bar.finish_and_clear();
    }
}
