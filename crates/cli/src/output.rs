//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable key/value output (default)
    #[default]
    Plain,
    /// JSON format
    Json,
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format an RUL estimate in hours
pub fn format_hours(hours: f64) -> String {
    format!("{hours:.1} h")
}

/// Color an RUL estimate by how close the equipment is to failure
pub fn color_rul(hours: f64) -> String {
    let formatted = format_hours(hours);
    if hours >= 20.0 {
        formatted.green().to_string()
    } else if hours >= 8.0 {
        formatted.yellow().to_string()
    } else {
        formatted.red().bold().to_string()
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "published" | "ready" => status.green().to_string(),
        "degraded" | "skipped" | "busy" => status.yellow().to_string(),
        "unhealthy" | "error" | "failed" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Format timestamp for display
pub fn format_timestamp(ts: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(ts) {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        ts.to_string()
    }
}
