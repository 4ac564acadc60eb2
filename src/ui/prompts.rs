//! Interactive prompts.

use console::{style, Term};
use dialoguer::theme::ColorfulTheme;
use dialoguer::Confirm;

use crate::error::{Result, SiteprepError};

use super::Prompt;

/// Convert dialoguer errors to SiteprepError.
fn map_dialoguer_err(e: dialoguer::Error) -> SiteprepError {
    SiteprepError::Io(e.into())
}

/// Dialoguer theme without the default yellow `?` prefix.
fn prompt_theme() -> ColorfulTheme {
    ColorfulTheme {
        prompt_prefix: style("".to_string()),
        ..ColorfulTheme::default()
    }
}

/// Ask the user a yes/no question on the terminal.
pub fn prompt_user(prompt: &Prompt, term: &Term) -> Result<bool> {
    Confirm::with_theme(&prompt_theme())
        .with_prompt(&prompt.question)
        .default(confirm_default(prompt))
        .interact_on(term)
        .map_err(map_dialoguer_err)
}

/// Confirm prompts default to yes unless told otherwise.
fn confirm_default(prompt: &Prompt) -> bool {
    prompt.default.unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_prompt(default: Option<bool>) -> Prompt {
        Prompt {
            key: "x".to_string(),
            question: "Test question?".to_string(),
            default,
        }
    }

    #[test]
    fn confirm_default_reads_prompt_default() {
        assert!(!confirm_default(&make_prompt(Some(false))));
        assert!(confirm_default(&make_prompt(Some(true))));
    }

    #[test]
    fn confirm_default_is_yes_without_default() {
        assert!(confirm_default(&make_prompt(None)));
    }
}
