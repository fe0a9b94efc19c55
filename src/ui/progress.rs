//! Progress indicators with a plain-output fallback.

use console::style;

/// A counting spinner for long-running batches, with plain output for
/// non-interactive terminals. All output goes to stderr so it never mixes
/// with tool output.
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    message: String,
    total: usize,
    done: usize,
    interactive: bool,
}

impl TaskSpinner {
    /// Create a new spinner counting up to `total` tasks.
    pub fn new(interactive: bool, message: impl Into<String>, total: usize) -> Self {
        Self {
            spinner: None,
            message: message.into(),
            total,
            done: 0,
            interactive,
        }
    }

    fn formatted(&self) -> String {
        if self.total == 0 {
            self.message.clone()
        } else {
            format!("{} ({}/{})", self.message, self.done, self.total)
        }
    }

    /// Show the spinner, or print a plain line when not interactive.
    pub fn start(&mut self) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(self.formatted());
            self.spinner = Some(spinner);
        } else {
            eprintln!("{} {}", style("...").dim(), self.formatted());
        }
    }

    /// Record one completed task and refresh the message.
    pub fn inc(&mut self) {
        self.done += 1;
        if let Some(spinner) = &self.spinner {
            spinner.start(self.formatted());
        }
    }

    /// Stop with a success message.
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else if self.interactive {
            eprintln!("{} {}", style("✓").green(), message);
        } else {
            eprintln!("{} {}", style("[OK]").green(), message);
        }
    }

    /// Stop with an error message.
    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else if self.interactive {
            eprintln!("{} {}", style("✗").red(), message);
        } else {
            eprintln!("{} {}", style("[FAIL]").red(), message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_non_interactive() {
        let mut spinner = TaskSpinner::new(false, "Installing tools", 2);
        spinner.start();
        spinner.inc();
        spinner.inc();
        spinner.stop("Done");
        // Should not panic.
    }

    #[test]
    fn spinner_message_counts() {
        let spinner = TaskSpinner::new(false, "Installing tools", 3);
        assert_eq!(spinner.formatted(), "Installing tools (0/3)");

        let spinner = TaskSpinner::new(false, "Working", 0);
        assert_eq!(spinner.formatted(), "Working");
    }
}
