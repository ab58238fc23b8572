use console::{style, Term};

const ASCII_HEADER: &str = r#"
  _                          _       _
 | |__   ___  _ __ ___   ___| | __ _| |__
 | '_ \ / _ \| '_ ` _ \ / _ \ |/ _` | '_ \
 | | | | (_) | | | | | |  __/ | (_| | |_) |
 |_| |_|\___/|_| |_| |_|\___|_|\__,_|_.__/
"#;

/// Prints the ASCII art header.
pub fn header() {
    let term = Term::stdout();
    let _ = term.write_line(&style(ASCII_HEADER).cyan().to_string());
}

/// Prints a section title followed by an underline.
pub fn section(title: &str) {
    println!();
    println!("{}", style(title).bold());
    println!("{}", style("─".repeat(title.chars().count())).dim());
}

/// Prints a success message with a green checkmark.
pub fn success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Prints an error message with a red cross.
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red(), message);
}

/// Prints a warning message in yellow.
pub fn warning(message: &str) {
    println!("{} {}", style("!").yellow(), message);
}

/// Prints an info message with an arrow.
pub fn info(message: &str) {
    println!("{} {}", style("→").cyan(), message);
}

/// Prints a URL in cyan and bold.
pub fn url(url: &str) {
    println!("{} {}", style("→").cyan(), style(url).cyan().bold());
}

/// Prints an error with a hint for resolution.
pub fn error_with_hint(message: &str, hint: &str) {
    eprintln!("{} {}", style("✗").red(), message);
    eprintln!("  {} {}", style("→").dim(), hint);
}

/// Prints aligned `key  value` rows.
pub fn key_values(rows: &[(&str, String)]) {
    let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    for (key, value) in rows {
        println!(
            "  {}  {}",
            style(format!("{:<width$}", key, width = width)).dim(),
            value
        );
    }
}

/// Colors a provisioning state for display.
pub fn state(state: &str) -> String {
    match state {
        "Succeeded" | "Running" | "Connected" => style(state).green().to_string(),
        "Failed" | "Canceled" => style(state).red().to_string(),
        "Not deployed" | "Not connected" => style(state).dim().to_string(),
        _ => style(state).yellow().to_string(),
    }
}
