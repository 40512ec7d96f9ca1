//! Prediction and coaching commands

use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use sleepwise_core::{
    flows,
    models::{CoachTip, Feedback, PredictionResult, RawMetrics},
    validate_coach, ApiClient, ClientError,
};

use crate::output::{
    color_confidence, color_quality, color_risk, print_json, print_success, print_warning,
    OutputFormat,
};

/// Validate the metrics and show a prediction
pub async fn predict(client: &ApiClient, raw: RawMetrics, format: OutputFormat) -> Result<()> {
    let (metrics, prediction) = flows::submit_prediction(client, &raw).await?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "input": metrics,
            "prediction": prediction,
        }))?,
        OutputFormat::Table => print_prediction(&prediction),
    }

    Ok(())
}

/// Ask the coach for a tip without running the model
pub async fn coach(
    client: &ApiClient,
    raw: RawMetrics,
    risk: String,
    drivers: Vec<String>,
    format: OutputFormat,
) -> Result<()> {
    let request = validate_coach(&raw, risk, drivers).map_err(ClientError::from)?;
    let tip = client.coach(&request).await?;

    match format {
        OutputFormat::Json => print_json(&tip)?,
        OutputFormat::Table => print_tip(&tip),
    }

    Ok(())
}

/// Send tip feedback
pub async fn feedback(
    client: &ApiClient,
    followed: bool,
    acknowledged: bool,
    format: OutputFormat,
) -> Result<()> {
    let receipt = client
        .feedback(&Feedback {
            followed,
            acknowledged,
        })
        .await?;

    match format {
        OutputFormat::Json => print_json(&receipt)?,
        OutputFormat::Table => print_success("Thanks, feedback recorded"),
    }

    Ok(())
}

fn print_prediction(prediction: &PredictionResult) {
    println!("{}", "Sleep Quality Prediction".bold());
    println!("{}", "=".repeat(50));
    println!(
        "Predicted quality:      {}",
        color_quality(prediction.predicted_quality)
    );
    println!(
        "Disorder risk:          {}",
        color_risk(&prediction.disorder_risk)
    );
    if prediction.top_drivers.is_empty() {
        println!("Top drivers:            -");
    } else {
        println!(
            "Top drivers:            {}",
            prediction.top_drivers.join(", ").cyan()
        );
    }
    println!();

    println!("{}", "Coach".bold());
    println!("{}", "-".repeat(50));
    println!("{}", prediction.coach_tip);
    println!(
        "Confidence:             {}",
        color_confidence(prediction.confidence)
    );

    if prediction.rule_override_flag {
        println!();
        print_warning("A safety rule overrode the model output; please consult a clinician.");
    }
}

fn print_tip(tip: &CoachTip) {
    println!("{}", "Coach Tip".bold());
    println!("{}", "=".repeat(50));
    println!("{}", tip.tip);
    if !tip.rationale.is_empty() {
        println!();
        println!("{} {}", "Why:".bold(), tip.rationale);
    }
    println!("Confidence:             {}", color_confidence(tip.confidence));
}
