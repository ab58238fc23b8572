pub mod menu;
pub mod output;
pub mod progress;

pub use menu::{Menu, MenuChoice};
pub use output::{
    error, error_with_hint, header, info, key_values, section, state, success, url, warning,
};
pub use progress::Spinner;

// Convenience prompt wrappers around dialoguer

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, FuzzySelect, Input, Password, Select};

use crate::core::error::AppError;

pub(crate) fn prompt_error(e: dialoguer::Error) -> AppError {
    AppError::Io(std::io::Error::other(e))
}

/// Prompts for text input.
pub fn input(prompt: &str) -> Result<String, AppError> {
    Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact_text()
        .map_err(prompt_error)
}

/// Prompts for text input, returning `default` when left empty.
pub fn input_with_default(prompt: &str, default: &str) -> Result<String, AppError> {
    Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default.to_string())
        .interact_text()
        .map_err(prompt_error)
}

/// Prompts for optional text input; empty means `None`.
pub fn input_optional(prompt: &str) -> Result<Option<String>, AppError> {
    let value: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_error)?;
    let value = value.trim().to_string();
    Ok(if value.is_empty() { None } else { Some(value) })
}

/// Prompts for text input validated by `validate`.
pub fn input_validated<F>(prompt: &str, default: Option<&str>, validate: F) -> Result<String, AppError>
where
    F: Fn(&str) -> Result<(), AppError>,
{
    let theme = ColorfulTheme::default();
    let mut input = Input::<String>::with_theme(&theme).with_prompt(prompt);
    if let Some(default) = default {
        input = input.default(default.to_string());
    }
    input
        .validate_with(|value: &String| -> Result<(), String> {
            validate(value.trim()).map_err(|e| e.to_string())
        })
        .interact_text()
        .map(|value| value.trim().to_string())
        .map_err(prompt_error)
}

/// Prompts for password input (masked).
pub fn password(prompt: &str) -> Result<String, AppError> {
    Password::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact()
        .map_err(prompt_error)
}

/// Prompts for a new password with confirmation.
pub fn new_password(prompt: &str) -> Result<String, AppError> {
    Password::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .with_confirmation("Repeat", "Passwords do not match")
        .interact()
        .map_err(prompt_error)
}

/// Prompts for selection from a list of options.
pub fn select<T: ToString>(prompt: &str, items: &[T]) -> Result<usize, AppError> {
    select_with_default(prompt, items, 0)
}

/// Prompts for selection with a preselected item.
pub fn select_with_default<T: ToString>(
    prompt: &str,
    items: &[T],
    default: usize,
) -> Result<usize, AppError> {
    Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(items)
        .default(default.min(items.len().saturating_sub(1)))
        .interact()
        .map_err(prompt_error)
}

/// Prompts for selection with type-ahead filtering.
pub fn fuzzy_select<T: ToString>(prompt: &str, items: &[T]) -> Result<usize, AppError> {
    FuzzySelect::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(items)
        .default(0)
        .interact()
        .map_err(prompt_error)
}

/// Prompts for a yes/no confirmation.
pub fn confirm(prompt: &str, default: bool) -> Result<bool, AppError> {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default)
        .interact()
        .map_err(prompt_error)
}

/// Waits for Enter so output stays visible before a menu redraws.
pub fn pause() {
    let _ = Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt("Press Enter to continue")
        .allow_empty(true)
        .interact_text();
}
