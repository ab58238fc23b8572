//! Numbered console menus. `0` always leaves the current menu.

use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Input;

use crate::core::error::AppError;

/// What the user picked in a menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    /// Zero-based index into the menu items.
    Item(usize),
    /// `0`: back to the parent menu, or exit at the top level.
    Back,
}

/// A numbered menu.
pub struct Menu<'a> {
    title: &'a str,
    items: &'a [&'a str],
    back_label: &'a str,
}

impl<'a> Menu<'a> {
    pub fn new(title: &'a str, items: &'a [&'a str]) -> Self {
        Self {
            title,
            items,
            back_label: "Back",
        }
    }

    /// Label for the `0` entry ("Back" by default, "Exit" at the top level).
    pub fn back_label(mut self, label: &'a str) -> Self {
        self.back_label = label;
        self
    }

    /// Renders the menu and reads a choice until a valid one is entered.
    pub fn run(&self) -> Result<MenuChoice, AppError> {
        self.render();

        let count = self.items.len();
        let input: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Select an option")
            .validate_with(|value: &String| -> Result<(), String> {
                parse_choice(value, count)
                    .map(|_| ())
                    .ok_or_else(|| format!("Enter a number between 0 and {}", count))
            })
            .interact_text()
            .map_err(super::prompt_error)?;

        parse_choice(&input, count)
            .ok_or_else(|| AppError::Validation(format!("Invalid menu choice '{}'", input)))
    }

    fn render(&self) {
        println!();
        println!("{}", style(self.title).cyan().bold());
        println!("{}", style("═".repeat(self.title.chars().count().max(20))).dim());
        for (i, item) in self.items.iter().enumerate() {
            println!("  {} {}", style(format!("{:>2}.", i + 1)).cyan(), item);
        }
        println!("  {} {}", style(" 0.").dim(), style(self.back_label).dim());
        println!();
    }
}

/// Parses a typed menu choice; `None` when it is not a number in range.
pub fn parse_choice(input: &str, item_count: usize) -> Option<MenuChoice> {
    let number: usize = input.trim().parse().ok()?;
    match number {
        0 => Some(MenuChoice::Back),
        n if n <= item_count => Some(MenuChoice::Item(n - 1)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_choice() {
        assert_eq!(parse_choice("0", 3), Some(MenuChoice::Back));
        assert_eq!(parse_choice(" 2 ", 3), Some(MenuChoice::Item(1)));
        assert_eq!(parse_choice("3", 3), Some(MenuChoice::Item(2)));
        assert_eq!(parse_choice("4", 3), None);
        assert_eq!(parse_choice("two", 3), None);
        assert_eq!(parse_choice("-1", 3), None);
    }
}
