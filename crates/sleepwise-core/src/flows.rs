//! User-facing flows: predict, daily log and dashboard
//!
//! Each flow validates locally, calls the API and hands back either a typed
//! result or a single [`Notice`] for the user. Nothing escapes as a raw error.

use crate::client::ApiClient;
use crate::dashboard::{DashboardController, DashboardSummary};
use crate::error::{ClientError, Result, GENERIC_USER_MESSAGE};
use crate::models::{HealthMetricsInput, LogReceipt, PredictionResult, RawMetrics, Window};
use crate::observability::ClientMetrics;
use crate::validation::{validate, ValidationErrors};
use serde::Serialize;
use std::future::Future;
use tracing::{info, warn};

/// How prominently a notice should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

/// The one message a flow produces for the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
    /// Per-field messages when the notice comes from local validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ValidationErrors>,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            message: message.into(),
            fields: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            fields: None,
        }
    }

    /// Convert a client error
    pub fn from_error(err: &ClientError) -> Self {
        match err {
            ClientError::Validation(errors) => Self {
                severity: Severity::Warning,
                message: errors.summary(),
                fields: Some(errors.clone()),
            },
            other => Self::error(other.user_message()),
        }
    }

    /// Convert any error; unknown errors become a generic message
    pub fn from_any(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<ClientError>() {
            Some(client_err) => Self::from_error(client_err),
            None => Self::error(GENERIC_USER_MESSAGE),
        }
    }
}

/// Run a flow and reduce any failure to a notice
pub async fn guarded<T, F>(flow: &str, fut: F) -> std::result::Result<T, Notice>
where
    F: Future<Output = Result<T>>,
{
    match fut.await {
        Ok(value) => Ok(value),
        Err(err) => {
            warn!(flow, error = %err, "Flow failed");
            Err(Notice::from_error(&err))
        }
    }
}

fn validate_or_reject(raw: &RawMetrics) -> Result<HealthMetricsInput> {
    validate(raw).map_err(|errors| {
        ClientMetrics::new().inc_validation_rejections();
        info!(fields = ?errors.fields().collect::<Vec<_>>(), "Submission rejected locally");
        ClientError::Validation(errors)
    })
}

/// Validate the form and request a prediction
pub async fn submit_prediction(
    client: &ApiClient,
    raw: &RawMetrics,
) -> Result<(HealthMetricsInput, PredictionResult)> {
    let metrics = validate_or_reject(raw)?;
    let prediction = client.predict(&metrics).await?;
    info!(
        quality = prediction.predicted_quality,
        risk = %prediction.disorder_risk,
        rule_override = prediction.rule_override_flag,
        "Prediction received"
    );
    Ok((metrics, prediction))
}

/// Validate the form and store it as today's log
pub async fn submit_log(client: &ApiClient, raw: &RawMetrics) -> Result<LogReceipt> {
    let metrics = validate_or_reject(raw)?;
    client.log(&metrics).await
}

/// Load the dashboard for a window
pub async fn load_dashboard(
    controller: &DashboardController,
    window: Window,
) -> Result<DashboardSummary> {
    controller.load(window).await
}
