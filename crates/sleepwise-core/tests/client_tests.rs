//! Integration tests for the API client against a mock backend

use async_trait::async_trait;
use mockito::{Matcher, Server};
use serde_json::json;
use sleepwise_core::{
    client::endpoints,
    flows::{self, Notice, Severity},
    models::{Confidence, Credentials, Feedback, RawMetrics, Window},
    validate_coach, ApiClient, ClientError, DashboardController, MemorySession, SessionProvider,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

fn valid_form() -> RawMetrics {
    RawMetrics {
        age: Some("42".to_string()),
        gender: Some("Male".to_string()),
        sleep_duration: Some("6.5".to_string()),
        stress_level: Some("7".to_string()),
        daily_steps: Some("4000".to_string()),
        bmi_category: Some("Overweight".to_string()),
        blood_pressure: Some("130/85".to_string()),
        heart_rate: Some("75".to_string()),
        physical_activity: Some("30".to_string()),
    }
}

fn prediction_body() -> serde_json::Value {
    json!({
        "predicted_quality": 5.8,
        "disorder_risk": "Insomnia",
        "top_drivers": ["Stress Level", "Sleep Duration"],
        "coach_tip": "Try a fixed bedtime this week.",
        "confidence": "medium",
        "rule_override_flag": false
    })
}

fn client_for(server: &Server, token: Option<&str>) -> ApiClient {
    let session = Arc::new(MemorySession::new(token.map(str::to_string)));
    ApiClient::with_base_url(&server.url(), session).unwrap()
}

/// Session that hands out a fresh credential on every fetch
struct RotatingSession {
    fetches: AtomicUsize,
    tx: watch::Sender<Option<String>>,
}

#[async_trait]
impl SessionProvider for RotatingSession {
    async fn access_token(&self) -> sleepwise_core::Result<Option<String>> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Some(format!("jwt-{}", n)))
    }

    fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }
}

#[tokio::test]
async fn test_predict_embeds_credential_in_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/predict")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "token": "jwt-abc",
            "age": 42,
            "gender": "Male",
            "bmi_category": "Overweight",
            "blood_pressure": "130/85"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(prediction_body().to_string())
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server, Some("jwt-abc"));
    let (metrics, prediction) = flows::submit_prediction(&client, &valid_form())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(metrics.age, 42);
    assert_eq!(prediction.predicted_quality, 5.8);
    assert_eq!(prediction.disorder_risk, "Insomnia");
    assert_eq!(prediction.top_drivers, vec!["Stress Level", "Sleep Duration"]);
    assert_eq!(prediction.confidence, Confidence::Medium);
    assert!(!prediction.rule_override_flag);
}

#[tokio::test]
async fn test_invalid_form_never_reaches_network() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let client = client_for(&server, Some("jwt-abc"));
    let mut form = valid_form();
    form.age = Some("130".to_string());
    form.gender = None;

    let err = flows::submit_prediction(&client, &form).await.unwrap_err();
    let ClientError::Validation(errors) = &err else {
        panic!("expected validation error, got {:?}", err);
    };
    assert!(errors.contains("age"));
    assert!(errors.contains("gender"));

    let err = flows::submit_log(&client, &form).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_without_credential_is_refused_locally() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let client = client_for(&server, None);
    let err = client.dashboard_series(Window::Week).await.unwrap_err();
    assert!(matches!(err, ClientError::AuthenticationMissing));

    let err = client.top_drivers(Window::Month).await.unwrap_err();
    assert!(matches!(err, ClientError::AuthenticationMissing));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_detail_is_surfaced() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/predict")
        .with_status(429)
        .with_header("content-type", "application/json")
        .with_body(r#"{"detail": "quota exceeded"}"#)
        .create_async()
        .await;

    let client = client_for(&server, Some("jwt"));
    let err = flows::submit_prediction(&client, &valid_form())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "quota exceeded");
    assert_eq!(err.status(), Some(429));
    assert_eq!(Notice::from_error(&err).message, "quota exceeded");
}

#[tokio::test]
async fn test_unparseable_error_body_falls_back_to_generic_message() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/dashboard/series")
        .match_query(Matcher::Any)
        .with_status(502)
        .with_body("<html>Bad Gateway</html>")
        .create_async()
        .await;

    let client = client_for(&server, Some("jwt"));
    let err = client.dashboard_series(Window::Week).await.unwrap_err();
    assert_eq!(err.to_string(), "Request failed");
    assert_eq!(err.status(), Some(502));
}

#[tokio::test]
async fn test_log_accepts_any_success_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/log")
        .match_body(Matcher::PartialJson(json!({"token": "jwt", "daily_steps": 4000})))
        .with_status(200)
        .with_body("")
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server, Some("jwt"));
    let receipt = flows::submit_log(&client, &valid_form()).await.unwrap();
    assert_eq!(receipt.status, None);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_post_without_credential_sends_null_token() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/log")
        .match_body(Matcher::PartialJson(json!({"token": null})))
        .with_status(401)
        .with_body(r#"{"detail": "Invalid token"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server, None);
    let err = flows::submit_log(&client, &valid_form()).await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid token");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_malformed_prediction_is_rejected() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/predict")
        .with_status(200)
        .with_body(r#"{"predicted_quality": 7.0, "disorder_risk": "None"}"#)
        .create_async()
        .await;

    let client = client_for(&server, Some("jwt"));
    let err = flows::submit_prediction(&client, &valid_form())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_out_of_range_prediction_is_rejected() {
    let mut body = prediction_body();
    body["predicted_quality"] = json!(14.2);

    let mut server = Server::new_async().await;
    server
        .mock("POST", "/predict")
        .with_status(200)
        .with_body(body.to_string())
        .create_async()
        .await;

    let client = client_for(&server, Some("jwt"));
    let err = flows::submit_prediction(&client, &valid_form())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::MalformedResponse(_)));
    assert_eq!(Notice::from_error(&err).severity, Severity::Error);
}

#[tokio::test]
async fn test_dashboard_queries_carry_token_and_days() {
    let mut server = Server::new_async().await;
    let series = server
        .mock("GET", "/dashboard/series")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("token".into(), "jwt-dash".into()),
            Matcher::UrlEncoded("days".into(), "14".into()),
        ]))
        .with_status(200)
        .with_body(
            json!({
                "logs": [
                    {
                        "created_at": "2024-05-03T07:00:00+00:00",
                        "sleep_duration": 6.0,
                        "predicted_quality": null,
                        "stress_level": 6,
                        "daily_steps": 5000
                    },
                    {
                        "created_at": "2024-05-01T07:00:00Z",
                        "sleep_duration": 7.5,
                        "predicted_quality": 7.1,
                        "stress_level": null
                    }
                ],
                "averages": {"sleep": 6.75, "quality": 7.1, "stress": 6.0, "steps": 5000.0}
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let drivers = server
        .mock("GET", "/dashboard/top-drivers")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("token".into(), "jwt-dash".into()),
            Matcher::UrlEncoded("days".into(), "14".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"{"latest_top_drivers": ["Stress Level"],
                "driver_counts": {"A": 3, "B": 5, "C": 5, "D": 1, "E": 2, "F": 4}}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let client = Arc::new(client_for(&server, Some("jwt-dash")));
    let controller = DashboardController::new(client);
    let summary = flows::load_dashboard(&controller, Window::Fortnight)
        .await
        .unwrap();

    series.assert_async().await;
    drivers.assert_async().await;

    // logs come back sorted ascending, nulls preserved
    assert_eq!(summary.series.logs.len(), 2);
    assert!(summary.series.logs[0].created_at < summary.series.logs[1].created_at);
    assert_eq!(summary.series.logs[0].stress_level, None);
    assert_eq!(summary.series.logs[1].daily_steps, Some(5000));

    // averages pass through untouched
    assert_eq!(summary.averages().sleep, 6.75);
    assert_eq!(summary.averages().steps, 5000.0);

    let ranked: Vec<_> = summary
        .top_drivers
        .iter()
        .map(|d| (d.driver.as_str(), d.count))
        .collect();
    assert_eq!(ranked, vec![("B", 5), ("C", 5), ("F", 4), ("A", 3), ("E", 2)]);
    assert_eq!(summary.latest_top_drivers, vec!["Stress Level"]);
}

#[tokio::test]
async fn test_dashboard_fails_as_a_whole() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/dashboard/series")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"logs": [], "averages": {"sleep": 0, "quality": 0, "stress": 0, "steps": 0}}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/dashboard/top-drivers")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(r#"{"detail": "Fetch failed"}"#)
        .create_async()
        .await;

    let controller = DashboardController::new(Arc::new(client_for(&server, Some("jwt"))));
    let err = flows::load_dashboard(&controller, Window::Week)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Fetch failed");
}

#[tokio::test]
async fn test_credential_is_fetched_on_every_call() {
    let mut server = Server::new_async().await;
    let first = server
        .mock("GET", "/dashboard/top-drivers")
        .match_query(Matcher::UrlEncoded("token".into(), "jwt-1".into()))
        .with_status(200)
        .with_body(r#"{"latest_top_drivers": [], "driver_counts": {}}"#)
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("GET", "/dashboard/top-drivers")
        .match_query(Matcher::UrlEncoded("token".into(), "jwt-2".into()))
        .with_status(200)
        .with_body(r#"{"latest_top_drivers": [], "driver_counts": {}}"#)
        .expect(1)
        .create_async()
        .await;

    let (tx, _rx) = watch::channel(None);
    let session = Arc::new(RotatingSession {
        fetches: AtomicUsize::new(0),
        tx,
    });
    let client = ApiClient::with_base_url(&server.url(), session.clone()).unwrap();

    client.top_drivers(Window::Week).await.unwrap();
    client.top_drivers(Window::Week).await.unwrap();

    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(session.fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_login_does_not_embed_token() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/login")
        .match_body(Matcher::Json(json!({"email": "sam@example.com", "password": "pw"})))
        .with_status(200)
        .with_body(r#"{"access_token": "jwt-new", "user_id": "u-1"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server, Some("stale"));
    let login = client
        .login(&Credentials {
            email: "sam@example.com".to_string(),
            password: "pw".to_string(),
        })
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(login.access_token, "jwt-new");
    assert_eq!(login.user_id, "u-1");
}

#[tokio::test]
async fn test_signup_sends_credentials_only() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/signup")
        .match_body(Matcher::Json(json!({"email": "new@example.com", "password": "pw"})))
        .with_status(200)
        .with_body(r#"{"message": "Signup successful", "user": null}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server, Some("jwt"));
    let response = client
        .signup(&Credentials {
            email: "new@example.com".to_string(),
            password: "pw".to_string(),
        })
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response.message, "Signup successful");
    assert_eq!(response.user, None);
}

#[tokio::test]
async fn test_coach_sends_credential_in_query() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/coach")
        .match_query(Matcher::UrlEncoded("token".into(), "jwt-abc".into()))
        .match_body(Matcher::Json(json!({
            "age": 42,
            "gender": "Male",
            "sleep_duration": 6.5,
            "stress_level": 7,
            "daily_steps": 4000,
            "bmi_category": "Overweight",
            "disorder_risk": "Insomnia",
            "top_drivers": ["Stress Level"]
        })))
        .with_status(200)
        .with_body(r#"{"tip": "Wind down 30 minutes earlier.", "confidence": "n/a"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server, Some("jwt-abc"));
    let request = validate_coach(&valid_form(), "Insomnia", vec!["Stress Level".to_string()])
        .unwrap();
    let tip = client.coach(&request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(tip.tip, "Wind down 30 minutes earlier.");
    assert_eq!(tip.rationale, "");
    assert_eq!(tip.confidence, Confidence::NotApplicable);
    assert!(!tip.rule_override_flag);
}

#[tokio::test]
async fn test_prediction_confidence_casing_is_tolerated() {
    let mut server = Server::new_async().await;
    let mut body = prediction_body();
    body["confidence"] = json!("High");
    server
        .mock("POST", "/predict")
        .with_status(200)
        .with_body(body.to_string())
        .create_async()
        .await;

    let client = client_for(&server, Some("jwt"));
    let metrics = sleepwise_core::validate(&valid_form()).unwrap();
    let prediction = client.predict(&metrics).await.unwrap();
    assert_eq!(prediction.confidence, Confidence::High);
    assert_eq!(prediction.predicted_quality, 5.8);
}

#[tokio::test]
async fn test_feedback_error_status_is_an_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/feedback")
        .match_body(Matcher::PartialJson(json!({"followed": true, "token": "jwt"})))
        .with_status(200)
        .with_body(r#"{"status": "error", "message": "Store failed"}"#)
        .create_async()
        .await;

    let client = client_for(&server, Some("jwt"));
    let err = client
        .feedback(&Feedback {
            followed: true,
            acknowledged: true,
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Store failed");
}

#[tokio::test]
async fn test_network_failure_is_an_api_error() {
    let session = Arc::new(MemorySession::signed_in("jwt"));
    let client = ApiClient::with_base_url("http://127.0.0.1:1", session).unwrap();

    let err = client.top_drivers(Window::Week).await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: None, .. }));
    assert_eq!(
        flows::guarded(endpoints::DASHBOARD_TOP_DRIVERS, async { Err::<(), _>(err) })
            .await
            .unwrap_err()
            .severity,
        Severity::Error
    );
}
