//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use sleepwise_core::flows::{Notice, Severity};
use sleepwise_core::models::Confidence;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of rows
pub fn print_table<T: Tabled>(rows: Vec<T>, empty_message: &str) {
    if rows.is_empty() {
        print_warning(empty_message);
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print any value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a flow notice, including per-field validation messages
pub fn print_notice(notice: &Notice, format: OutputFormat) {
    if let OutputFormat::Json = format {
        if let Ok(json) = serde_json::to_string_pretty(notice) {
            eprintln!("{}", json);
            return;
        }
    }

    match notice.severity {
        Severity::Success => print_success(&notice.message),
        Severity::Info => print_info(&notice.message),
        Severity::Warning => eprintln!("{} {}", "⚠".yellow().bold(), notice.message),
        Severity::Error => print_error(&notice.message),
    }

    if let Some(fields) = &notice.fields {
        for (field, message) in fields.iter() {
            eprintln!("  {} {}", format!("--{}:", field.replace('_', "-")).bold(), message);
        }
    }
}

/// Format an optional number, `-` when missing
pub fn format_optional<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Format hours of sleep
pub fn format_hours(hours: f64) -> String {
    format!("{:.1}h", hours)
}

/// Format a step count with thousands separators
pub fn format_steps(steps: f64) -> String {
    let rounded = steps.round() as i64;
    let digits = rounded.abs().to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if rounded < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

/// Color a 0-10 quality score
pub fn color_quality(quality: f64) -> String {
    let formatted = format!("{:.1}/10", quality);
    if quality >= 7.0 {
        formatted.green().to_string()
    } else if quality >= 5.0 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

/// Color a disorder risk label
pub fn color_risk(risk: &str) -> String {
    if risk.eq_ignore_ascii_case("none") {
        risk.green().to_string()
    } else {
        risk.red().bold().to_string()
    }
}

/// Color the coach confidence
pub fn color_confidence(confidence: Confidence) -> String {
    let formatted = confidence.to_string();
    match confidence {
        Confidence::High => formatted.green().to_string(),
        Confidence::Medium => formatted.yellow().to_string(),
        Confidence::Low => formatted.red().to_string(),
        Confidence::NotApplicable => formatted.dimmed().to_string(),
    }
}

/// Format timestamp for display
pub fn format_timestamp(ts: &chrono::DateTime<chrono::Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_steps() {
        assert_eq!(format_steps(0.0), "0");
        assert_eq!(format_steps(999.0), "999");
        assert_eq!(format_steps(8000.4), "8,000");
        assert_eq!(format_steps(1234567.0), "1,234,567");
    }

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(Some(7.5)), "7.5");
        assert_eq!(format_optional::<i32>(None), "-");
    }

    #[test]
    fn test_format_hours() {
        assert_eq!(format_hours(7.26), "7.3h");
        assert_eq!(format_hours(8.0), "8.0h");
    }
}
