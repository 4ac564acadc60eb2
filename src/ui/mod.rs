//! User interface components.
//!
//! This module provides:
//! - [`UserInterface`] trait for UI abstraction
//! - [`TerminalUI`] for interactive terminal usage
//! - [`NonInteractiveUI`] for CI/headless environments
//! - [`MockUI`] for tests
//!
//! # Example
//!
//! ```
//! use siteprep::ui::{create_ui, OutputMode};
//!
//! let mut ui = create_ui(false, OutputMode::Quiet);
//! ui.show_header("Site preparation");
//! ui.success("Features installed");
//! ```

pub mod mock;
pub mod non_interactive;
pub mod output;
pub mod prompts;
pub mod spinner;
pub mod terminal;
pub mod theme;

pub use mock::{MockSpinner, MockUI};
pub use non_interactive::NonInteractiveUI;
pub use output::{format_duration, OutputMode};
pub use prompts::prompt_user;
pub use spinner::ProgressSpinner;
pub use terminal::{create_ui, TerminalUI};
pub use theme::{should_use_colors, SiteprepTheme};

use crate::error::Result;

/// Trait for user interface interactions.
///
/// This trait allows mocking the UI in tests.
pub trait UserInterface {
    /// Get the current output mode.
    fn output_mode(&self) -> OutputMode;

    /// Display a message to the user.
    fn message(&mut self, msg: &str);

    /// Display a success message.
    fn success(&mut self, msg: &str);

    /// Display a warning message.
    fn warning(&mut self, msg: &str);

    /// Display an error message.
    fn error(&mut self, msg: &str);

    /// Show a yes/no prompt and return the answer.
    fn prompt(&mut self, prompt: &Prompt) -> Result<bool>;

    /// Start a spinner for an operation.
    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle>;

    /// Show a header/banner.
    fn show_header(&mut self, title: &str);

    /// Show a contextual hint.
    fn show_hint(&mut self, hint: &str);

    /// Show a `key: value` line.
    fn show_field(&mut self, key: &str, value: &str) {
        self.message(&format!("  {}: {}", key, value));
    }

    /// Check if running in interactive mode.
    fn is_interactive(&self) -> bool;

    /// Ask a yes/no question; `default` is the answer when nobody can respond.
    fn confirm(&mut self, key: &str, question: &str, default: bool) -> Result<bool> {
        let prompt = Prompt {
            key: key.to_string(),
            question: question.to_string(),
            default: Some(default),
        };
        self.prompt(&prompt)
    }
}

/// Handle for controlling a spinner.
pub trait SpinnerHandle {
    /// Update the spinner message.
    fn set_message(&mut self, msg: &str);

    /// Mark the operation as successful.
    fn finish_success(&mut self, msg: &str);

    /// Mark the operation as failed.
    fn finish_error(&mut self, msg: &str);

    /// Mark as skipped.
    fn finish_skipped(&mut self, msg: &str);
}

/// A yes/no prompt to show to the user.
#[derive(Debug, Clone)]
pub struct Prompt {
    /// Unique key for the prompt (used for overrides and scripted answers).
    pub key: String,
    /// The question to display.
    pub question: String,
    /// Answer used when the user just presses enter.
    pub default: Option<bool>,
}

/// Parse the usual spellings of yes and no.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_spellings() {
        assert_eq!(parse_bool("Y"), Some(true));
        assert_eq!(parse_bool(" no "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn confirm_uses_scripted_answer() {
        let mut ui = MockUI::new();
        ui.set_prompt_response("proceed", "no");
        assert!(!ui.confirm("proceed", "Continue?", true).unwrap());
    }

    #[test]
    fn confirm_falls_back_to_default() {
        let mut ui = MockUI::new();
        assert!(ui.confirm("proceed", "Continue?", true).unwrap());
    }

    #[test]
    fn show_field_goes_through_message() {
        let mut ui = MockUI::new();
        ui.show_field("Container", "CN=System Management");
        assert!(ui.has_message("Container: CN=System Management"));
    }
}
