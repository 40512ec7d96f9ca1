//! Daily log command

use anyhow::Result;
use sleepwise_core::{flows, models::RawMetrics, ApiClient};

use crate::output::{print_json, print_success, OutputFormat};

/// Validate and store today's metrics
pub async fn log_day(client: &ApiClient, raw: RawMetrics, format: OutputFormat) -> Result<()> {
    let receipt = flows::submit_log(client, &raw).await?;

    match format {
        OutputFormat::Json => print_json(&receipt)?,
        OutputFormat::Table => {
            let message = receipt
                .message
                .as_deref()
                .unwrap_or("Daily log stored");
            print_success(message);
        }
    }

    Ok(())
}
