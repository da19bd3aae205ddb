//! Terminal prompter backed by dialoguer

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use tcex_shared::{DefaultPrompter, Prompter, Result, TcexError};

/// Asks on the attached terminal
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

fn is_yes_no(choices: &[&str]) -> bool {
    let lower: Vec<String> = choices.iter().map(|c| c.to_ascii_lowercase()).collect();
    lower == ["y", "n"]
}

impl Prompter for TerminalPrompter {
    fn ask(&self, message: &str, choices: &[&str], default: &str) -> Result<String> {
        let prompt_error = |e: dialoguer::Error| TcexError::Other(format!("Prompt failed: {}", e));

        if choices.is_empty() {
            return Input::<String>::with_theme(&self.theme)
                .with_prompt(message)
                .default(default.to_string())
                .interact_text()
                .map_err(prompt_error);
        }

        if is_yes_no(choices) {
            let yes = Confirm::with_theme(&self.theme)
                .with_prompt(message)
                .default(default.eq_ignore_ascii_case("y"))
                .interact()
                .map_err(prompt_error)?;
            return Ok(if yes { "y" } else { "n" }.to_string());
        }

        let default_index = choices
            .iter()
            .position(|c| c.eq_ignore_ascii_case(default))
            .unwrap_or(0);
        let index = Select::with_theme(&self.theme)
            .with_prompt(message)
            .items(choices)
            .default(default_index)
            .interact()
            .map_err(prompt_error)?;
        Ok(choices[index].to_string())
    }
}

/// Terminal prompter when someone is attached, defaults otherwise
pub fn prompter() -> Box<dyn Prompter> {
    if console::user_attended() {
        Box::new(TerminalPrompter::new())
    } else {
        Box::new(DefaultPrompter)
    }
}
