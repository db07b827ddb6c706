//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the S.C.R.I.B.E CLI,
//! including the live rendering of research progress.

use crate::research::ProgressEvent;
use owo_colors::OwoColorize;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the S.C.R.I.B.E banner
    pub fn banner(&self) {
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        if self.colored {
            println!(
                "\n   {} {}\n   {}\n",
                "S.C.R.I.B.E".bright_cyan().bold(),
                version.dimmed(),
                "Streaming deep-research server".bright_white()
            );
        } else {
            println!("\n   S.C.R.I.B.E {}\n   Streaming deep-research server\n", version);
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a step message (for multi-step operations)
    pub fn step(&self, step_num: usize, total: usize, message: &str) {
        if self.colored {
            println!(
                "  {} {}",
                format!("[{}/{}]", step_num, total).dimmed(),
                message.bright_white()
            );
        } else {
            println!("  [{}/{}] {}", step_num, total, message);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print a list item
    pub fn list_item(&self, item: &str) {
        if self.colored {
            println!("    {} {}", "•".blue(), item);
        } else {
            println!("    - {}", item);
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {}", message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Render one progress event as it arrives
    pub fn progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { run_id, query } => {
                self.info(&format!("Starting research {} for \"{}\"", run_id, query));
            }
            ProgressEvent::PlanReady { count, queries } => {
                self.success(&format!("Planned {} searches", count));
                for query in queries {
                    self.list_item(query);
                }
            }
            ProgressEvent::SearchProgress { completed, total } => {
                self.step(*completed, *total, "searches completed");
            }
            ProgressEvent::SearchFailed { query_text, cause } => {
                self.warning(&format!("Search \"{}\" failed: {}", query_text, cause));
            }
            ProgressEvent::WritingReport { findings, sources } => {
                self.info(&format!(
                    "Writing report from {} findings and {} sources",
                    findings, sources
                ));
            }
            ProgressEvent::ReportReady { .. } => self.success("Report ready"),
            ProgressEvent::SearchesExhausted { .. } | ProgressEvent::StageFailed { .. } => {
                self.error(&failure_message(event));
            }
        }
    }
}

/// One-line description of a terminal failure event
pub fn failure_message(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::SearchesExhausted { cause } => format!("No search succeeded: {}", cause),
        ProgressEvent::StageFailed { stage, cause } => format!("{} failed: {}", stage, cause),
        other => format!("Unexpected event: {}", other.name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::Stage;

    #[test]
    fn test_failure_messages() {
        let exhausted = ProgressEvent::SearchesExhausted {
            cause: "all 3 searches failed".to_string(),
        };
        assert_eq!(
            failure_message(&exhausted),
            "No search succeeded: all 3 searches failed"
        );

        let planning = ProgressEvent::StageFailed {
            stage: Stage::Planning,
            cause: "empty plan".to_string(),
        };
        assert_eq!(failure_message(&planning), "PLANNING failed: empty plan");
    }

    #[test]
    fn test_output_modes() {
        assert!(Output::new().colored);
        assert!(!Output::no_color().colored);
    }
}
