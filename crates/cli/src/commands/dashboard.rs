//! Dashboard command

use anyhow::Result;
use colored::Colorize;
use sleepwise_core::{
    dashboard::DashboardSummary, flows, models::Window, ApiClient, DashboardController,
};
use std::sync::Arc;
use tabled::Tabled;

use crate::output::{
    format_hours, format_optional, format_steps, format_timestamp, print_json, print_table,
    OutputFormat,
};

/// Row for the daily log table
#[derive(Tabled)]
struct LogRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Sleep")]
    sleep: String,
    #[tabled(rename = "Quality")]
    quality: String,
    #[tabled(rename = "Stress")]
    stress: String,
    #[tabled(rename = "Steps")]
    steps: String,
}

/// Row for the top drivers table
#[derive(Tabled)]
struct DriverRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Driver")]
    driver: String,
    #[tabled(rename = "Count")]
    count: u32,
}

/// Show trends for a window
pub async fn show_dashboard(
    client: Arc<ApiClient>,
    window: Window,
    format: OutputFormat,
) -> Result<()> {
    let controller = DashboardController::new(client);
    let summary = flows::load_dashboard(&controller, window).await?;

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => print_summary(&summary),
    }

    Ok(())
}

fn print_summary(summary: &DashboardSummary) {
    println!(
        "{} {}",
        "Sleep Dashboard".bold(),
        format!("(last {} days)", summary.window.days()).dimmed()
    );
    println!("{}", "=".repeat(50));

    let averages = summary.averages();
    println!("Avg sleep:              {}", format_hours(averages.sleep));
    println!("Avg quality:            {:.1}/10", averages.quality);
    println!("Avg stress:             {:.1}/10", averages.stress);
    println!("Avg steps:              {}", format_steps(averages.steps));
    println!();

    let rows: Vec<LogRow> = summary
        .series
        .logs
        .iter()
        .map(|entry| LogRow {
            date: format_timestamp(&entry.created_at),
            sleep: entry
                .sleep_duration
                .map(format_hours)
                .unwrap_or_else(|| "-".to_string()),
            quality: entry
                .predicted_quality
                .map(|q| format!("{:.1}", q))
                .unwrap_or_else(|| "-".to_string()),
            stress: format_optional(entry.stress_level),
            steps: entry
                .daily_steps
                .map(|s| format_steps(s as f64))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    print_table(rows, "No logs in this window");
    println!();

    println!("{}", "Top Drivers".bold());
    println!("{}", "-".repeat(50));
    let rows: Vec<DriverRow> = summary
        .top_drivers
        .iter()
        .enumerate()
        .map(|(i, d)| DriverRow {
            rank: i + 1,
            driver: d.driver.clone(),
            count: d.count,
        })
        .collect();
    print_table(rows, "No drivers recorded yet");

    if !summary.latest_top_drivers.is_empty() {
        println!(
            "\nLatest prediction drivers: {}",
            summary.latest_top_drivers.join(", ").cyan()
        );
    }
}
