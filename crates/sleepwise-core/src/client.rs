//! API client for communicating with the SleepWise API
//!
//! Credential transport follows the backend contract: POST requests carry
//! the bearer credential as a `token` field in the JSON body, GET requests
//! and `/coach` carry it as a `token` query parameter.

use crate::config::ClientConfig;
use crate::dashboard::DashboardApi;
use crate::error::{ClientError, Result};
use crate::models::{
    CoachRequest, CoachTip, Credentials, DashboardSeries, Feedback, FeedbackReceipt,
    HealthMetricsInput, LogReceipt, LoginResponse, PredictionResult, SignupResponse, TopDrivers,
    Window,
};
use crate::observability::{outcome, ClientMetrics};
use crate::session::SessionProvider;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// Endpoint paths, relative to the base URL
pub mod endpoints {
    pub const PREDICT: &str = "predict";
    pub const LOG: &str = "log";
    pub const COACH: &str = "coach";
    pub const FEEDBACK: &str = "feedback";
    pub const LOGIN: &str = "login";
    pub const SIGNUP: &str = "signup";
    pub const DASHBOARD_SERIES: &str = "dashboard/series";
    pub const DASHBOARD_TOP_DRIVERS: &str = "dashboard/top-drivers";
}

/// Error body returned by the backend on non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Value,
}

/// API client for the SleepWise API
pub struct ApiClient {
    client: Client,
    base_url: Url,
    session: Arc<dyn SessionProvider>,
    metrics: ClientMetrics,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(config: &ClientConfig, session: Arc<dyn SessionProvider>) -> Result<Self> {
        config.validate()?;
        Self::build(config.base_url()?, config.timeout(), session)
    }

    /// Create a client for `base_url` with the default timeout
    pub fn with_base_url(base_url: &str, session: Arc<dyn SessionProvider>) -> Result<Self> {
        let config = ClientConfig::default().with_api_url(base_url);
        Self::new(&config, session)
    }

    fn build(mut base_url: Url, timeout: Duration, session: Arc<dyn SessionProvider>) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to create HTTP client: {}", e)))?;

        // Url::join drops the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            session,
            metrics: ClientMetrics::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<dyn SessionProvider> {
        &self.session
    }

    /// Make a POST request with the current credential embedded in the body
    pub async fn post<T, B>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.post_with(endpoint, body, decode).await
    }

    /// Make a GET request with the credential and `params` in the query string
    ///
    /// Fails with [`ClientError::AuthenticationMissing`] without sending
    /// anything when nobody is signed in.
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, String)]) -> Result<T> {
        self.get_with(endpoint, params, decode).await
    }

    /// Request a sleep quality prediction
    pub async fn predict(&self, metrics: &HealthMetricsInput) -> Result<PredictionResult> {
        self.post_with(endpoints::PREDICT, metrics, |endpoint, body| {
            let prediction: PredictionResult = decode(endpoint, body)?;
            prediction
                .check()
                .map_err(|e| ClientError::MalformedResponse(format!("{}: {}", endpoint, e)))?;
            Ok(prediction)
        })
        .await
    }

    /// Store today's metrics; the response body is informational only
    pub async fn log(&self, metrics: &HealthMetricsInput) -> Result<LogReceipt> {
        self.post_with(endpoints::LOG, metrics, |_, body| {
            Ok(serde_json::from_str(body).unwrap_or_default())
        })
        .await
    }

    /// Ask the coach for a tip on an existing prediction
    ///
    /// Unlike the other POST endpoints, `/coach` reads the credential from
    /// the query string; the body carries only the request fields.
    pub async fn coach(&self, request: &CoachRequest) -> Result<CoachTip> {
        let url = self.endpoint_url(endpoints::COACH)?;
        let mut builder = self.client.post(url).json(request);
        if let Some(token) = self.session.access_token().await? {
            builder = builder.query(&[("token", token)]);
        }
        self.execute(endpoints::COACH, builder, decode).await
    }

    /// Report whether the last tip was followed
    pub async fn feedback(&self, feedback: &Feedback) -> Result<FeedbackReceipt> {
        let receipt: FeedbackReceipt = self.post(endpoints::FEEDBACK, feedback).await?;
        if receipt.status.eq_ignore_ascii_case("error") {
            return Err(ClientError::api(None, receipt.message));
        }
        Ok(receipt)
    }

    /// Series rows and averages for a window
    pub async fn dashboard_series(&self, window: Window) -> Result<DashboardSeries> {
        let mut series: DashboardSeries = self
            .get(endpoints::DASHBOARD_SERIES, &[("days", window.days().to_string())])
            .await?;
        series.sort_logs();
        Ok(series)
    }

    /// Driver frequencies for a window
    pub async fn top_drivers(&self, window: Window) -> Result<TopDrivers> {
        self.get(
            endpoints::DASHBOARD_TOP_DRIVERS,
            &[("days", window.days().to_string())],
        )
        .await
    }

    /// Exchange email and password for a credential
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse> {
        let url = self.endpoint_url(endpoints::LOGIN)?;
        let request = self.client.post(url).json(credentials);
        self.execute(endpoints::LOGIN, request, decode).await
    }

    /// Register a new account
    pub async fn signup(&self, credentials: &Credentials) -> Result<SignupResponse> {
        let url = self.endpoint_url(endpoints::SIGNUP)?;
        let request = self.client.post(url).json(credentials);
        self.execute(endpoints::SIGNUP, request, decode).await
    }

    async fn post_with<T, B, F>(&self, endpoint: &str, body: &B, decoder: F) -> Result<T>
    where
        B: Serialize + ?Sized,
        F: FnOnce(&str, &str) -> Result<T>,
    {
        let url = self.endpoint_url(endpoint)?;
        let token = self.session.access_token().await?;
        let payload = embed_token(body, token)?;

        let request = self.client.post(url).json(&payload);
        self.execute(endpoint, request, decoder).await
    }

    async fn get_with<T, F>(&self, endpoint: &str, params: &[(&str, String)], decoder: F) -> Result<T>
    where
        F: FnOnce(&str, &str) -> Result<T>,
    {
        let url = self.endpoint_url(endpoint)?;
        let Some(token) = self.session.access_token().await? else {
            self.metrics.record_refused(endpoint, outcome::AUTH_MISSING);
            warn!(endpoint, "Refusing GET without a credential");
            return Err(ClientError::AuthenticationMissing);
        };

        let mut query: Vec<(&str, String)> = Vec::with_capacity(params.len() + 1);
        query.push(("token", token));
        query.extend(params.iter().cloned());

        let request = self.client.get(url).query(&query);
        self.execute(endpoint, request, decoder).await
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url> {
        self.base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| ClientError::Config(format!("invalid endpoint {:?}: {}", endpoint, e)))
    }

    /// Send, normalize errors, decode, and record the outcome
    async fn execute<T, F>(&self, endpoint: &str, request: RequestBuilder, decoder: F) -> Result<T>
    where
        F: FnOnce(&str, &str) -> Result<T>,
    {
        let started = Instant::now();
        let result = match self.round_trip(request).await {
            Ok(body) => decoder(endpoint, &body),
            Err(err) => Err(err),
        };
        let elapsed = started.elapsed();

        let label = match &result {
            Ok(_) => outcome::SUCCESS,
            Err(ClientError::Api { status: Some(_), .. }) => outcome::HTTP_ERROR,
            Err(ClientError::MalformedResponse(_)) => outcome::MALFORMED,
            Err(_) => outcome::TRANSPORT_ERROR,
        };
        self.metrics
            .observe_request(endpoint, label, elapsed.as_secs_f64());

        match &result {
            Ok(_) => debug!(endpoint, elapsed_ms = elapsed.as_millis() as u64, "API request succeeded"),
            Err(err) => warn!(
                endpoint,
                status = ?err.status(),
                error = %err,
                "API request failed"
            ),
        }

        result
    }

    async fn round_trip(&self, request: RequestBuilder) -> Result<String> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await;

        if !status.is_success() {
            let detail = body.ok().as_deref().and_then(extract_detail);
            return Err(ClientError::api(Some(status.as_u16()), detail));
        }

        Ok(body?)
    }
}

#[async_trait]
impl DashboardApi for ApiClient {
    async fn fetch_series(&self, window: Window) -> Result<DashboardSeries> {
        self.dashboard_series(window).await
    }

    async fn fetch_top_drivers(&self, window: Window) -> Result<TopDrivers> {
        self.top_drivers(window).await
    }
}

/// Decode a 2xx body into the declared shape
fn decode<T: DeserializeOwned>(endpoint: &str, body: &str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| ClientError::MalformedResponse(format!("{}: {}", endpoint, e)))
}

/// Serialize `body` and add the `token` field
fn embed_token<B: Serialize + ?Sized>(body: &B, token: Option<String>) -> Result<Value> {
    let mut value = serde_json::to_value(body).map_err(|e| ClientError::Api {
        status: None,
        message: format!("failed to encode request: {}", e),
    })?;

    let Some(object) = value.as_object_mut() else {
        return Err(ClientError::Api {
            status: None,
            message: "request body must be a JSON object".to_string(),
        });
    };
    object.insert("token".to_string(), token.map_or(Value::Null, Value::String));
    Ok(value)
}

/// Pull a readable message out of an error body
///
/// `detail` is usually a string; request validation failures carry a list
/// of `{loc, msg}` objects instead.
fn extract_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail {
        Value::String(s) => Some(s),
        Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_embed_token_adds_field() {
        let body = json!({"age": 30});
        let value = embed_token(&body, Some("jwt".to_string())).unwrap();
        assert_eq!(value, json!({"age": 30, "token": "jwt"}));

        let value = embed_token(&body, None).unwrap();
        assert_eq!(value["token"], Value::Null);
    }

    #[test]
    fn test_embed_token_rejects_non_objects() {
        assert!(embed_token(&json!([1, 2]), None).is_err());
    }

    #[test]
    fn test_extract_detail() {
        assert_eq!(
            extract_detail(r#"{"detail": "quota exceeded"}"#).as_deref(),
            Some("quota exceeded")
        );
        assert_eq!(
            extract_detail(r#"{"detail": [{"loc": ["body", "age"], "msg": "too old"}]}"#)
                .as_deref(),
            Some("too old")
        );
        assert_eq!(extract_detail("<html>oops</html>"), None);
        assert_eq!(extract_detail(r#"{"error": "x"}"#), None);
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let session = Arc::new(crate::session::MemorySession::default());
        let client = ApiClient::with_base_url("http://localhost:8000/api", session).unwrap();
        assert_eq!(
            client.endpoint_url("/dashboard/series").unwrap().as_str(),
            "http://localhost:8000/api/dashboard/series"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let session = Arc::new(crate::session::MemorySession::default());
        assert!(matches!(
            ApiClient::with_base_url("::::", session),
            Err(ClientError::Config(_))
        ));
    }
}
