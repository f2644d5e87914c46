//! Integration tests for the triage HTTP API.
//!
//! Each test spins up the Axum router on a random port and drives it with
//! reqwest. Model-backed tests also start a stub OpenAI-compatible server so
//! the real `OpenAiProvider` is exercised end to end.

use std::sync::Arc;
use std::time::Duration;

use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::post};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use inbox_triage::api::triage_routes;
use inbox_triage::config::TriageConfig;
use inbox_triage::triage::{Locale, TriageCoordinator};

/// Serve `app` on a random local port and return the base URL.
async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{port}")
}

/// Stub chat-completions endpoint.
///
/// Looks at the user prompt: `FAIL_UPSTREAM` → 503, `FAIL_AUTH` → 401,
/// `FAIL_GARBAGE` → prose instead of JSON, otherwise a fixed classification.
async fn stub_completions(Json(request): Json<Value>) -> impl IntoResponse {
    let prompt = request["messages"][1]["content"].as_str().unwrap_or_default();

    if prompt.contains("FAIL_AUTH") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"message": "invalid api key"}})),
        );
    }

    if prompt.contains("FAIL_UPSTREAM") {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": {"message": "overloaded"}})),
        );
    }

    let content = if prompt.contains("FAIL_GARBAGE") {
        "Sorry, I cannot classify this email.".to_string()
    } else {
        json!({
            "category": "model-category",
            "priority": "urgent",
            "action": "needs-review",
            "response": "Drafted by the model"
        })
        .to_string()
    };

    (
        StatusCode::OK,
        Json(json!({
            "choices": [{
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 20}
        })),
    )
}

async fn start_rules_server() -> String {
    let coordinator = TriageCoordinator::from_config(&TriageConfig::default()).unwrap();
    spawn(triage_routes(Arc::new(coordinator))).await
}

async fn start_model_server() -> String {
    let stub_url = spawn(Router::new().route("/v1/chat/completions", post(stub_completions))).await;

    let config = TriageConfig {
        api_key: Some(SecretString::from("sk-test")),
        base_url: format!("{stub_url}/v1"),
        locale: Locale::Arabic,
        ..TriageConfig::default()
    };
    let coordinator = TriageCoordinator::from_config(&config).unwrap();
    spawn(triage_routes(Arc::new(coordinator))).await
}

fn email(id: &str, subject: &str, body: &str) -> Value {
    json!({
        "id": id,
        "from": "a@b.com",
        "subject": subject,
        "body": body,
        "timestamp": "2025-03-01T10:00:00.000Z"
    })
}

async fn post_batch(base: &str, payload: &Value) -> (StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(format!("{base}/api/process-emails"))
        .json(payload)
        .send()
        .await
        .unwrap();
    let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn health_reports_rules_strategy() {
    let base = start_rules_server().await;
    let body: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["strategy"], "rules");
}

#[tokio::test]
async fn rules_batch_classifies_in_order() {
    let base = start_rules_server().await;
    let payload = json!({
        "emails": [
            email("1", "سؤال", "عندي استفسار عن الخدمة"),
            email("2", "عرض", "هذا عرض تسويقي رائع"),
            email("3", "", ""),
        ]
    });

    let (status, body) = post_batch(&base, &payload).await;
    assert_eq!(status, StatusCode::OK);

    let results = body["processedEmails"].as_array().unwrap();
    assert_eq!(results.len(), 3);

    assert_eq!(results[0]["id"], "1");
    assert_eq!(results[0]["category"], "inquiries");
    assert_eq!(results[0]["priority"], "medium");
    assert_eq!(results[0]["action"], "auto-reply");
    assert!(!results[0]["response"].as_str().unwrap().is_empty());

    assert_eq!(results[1]["id"], "2");
    assert_eq!(results[1]["category"], "marketing");
    assert_eq!(results[1]["priority"], "low");
    assert_eq!(results[1]["action"], "ignore");
    assert!(results[1].get("response").is_none());

    assert_eq!(results[2]["id"], "3");
    assert_eq!(results[2]["category"], "general");
    assert_eq!(results[2]["action"], "auto-reply");
}

#[tokio::test]
async fn results_echo_message_fields() {
    let base = start_rules_server().await;
    let payload = json!({ "emails": [email("42", "Hello", "Just saying hi")] });

    let (_, body) = post_batch(&base, &payload).await;
    let result = &body["processedEmails"][0];
    assert_eq!(result["id"], "42");
    assert_eq!(result["from"], "a@b.com");
    assert_eq!(result["subject"], "Hello");
    assert_eq!(result["body"], "Just saying hi");
    assert!(result["timestamp"].as_str().unwrap().starts_with("2025-03-01T10:00:00"));
}

#[tokio::test]
async fn emails_not_an_array_is_bad_request() {
    let base = start_rules_server().await;

    for payload in [
        json!({ "emails": email("1", "s", "b") }),
        json!({ "emails": "not a list" }),
        json!({}),
    ] {
        let (status, body) = post_batch(&base, &payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid request format");
        assert!(body.get("processedEmails").is_none());
    }
}

#[tokio::test]
async fn unparseable_body_is_bad_request() {
    let base = start_rules_server().await;
    let response = reqwest::Client::new()
        .post(format!("{base}/api/process-emails"))
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn model_strategy_with_per_message_fallback() {
    let base = start_model_server().await;

    let body: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["strategy"], "model");

    let payload = json!({
        "emails": [
            email("1", "Hello", "please help"),
            email("2", "Offer", "FAIL_UPSTREAM هذا عرض تسويقي رائع"),
            email("3", "Hi", "FAIL_GARBAGE"),
            email("4", "Hello", "another one"),
            email("5", "Billing", "FAIL_AUTH my payment went through twice"),
        ]
    });

    let (status, body) = post_batch(&base, &payload).await;
    assert_eq!(status, StatusCode::OK);
    let results = body["processedEmails"].as_array().unwrap();
    assert_eq!(results.len(), 5);

    // Model succeeded.
    assert_eq!(results[0]["id"], "1");
    assert_eq!(results[0]["category"], "model-category");
    assert_eq!(results[0]["priority"], "urgent");
    assert_eq!(results[0]["action"], "needs-review");
    assert_eq!(results[0]["response"], "Drafted by the model");

    // Upstream 503 → rules.
    assert_eq!(results[1]["id"], "2");
    assert_eq!(results[1]["category"], "marketing");
    assert_eq!(results[1]["action"], "ignore");

    // Unparseable reply → rules.
    assert_eq!(results[2]["id"], "3");
    assert_eq!(results[2]["category"], "general");

    // Siblings unaffected.
    assert_eq!(results[3]["id"], "4");
    assert_eq!(results[3]["category"], "model-category");

    // Rejected credential → rules.
    assert_eq!(results[4]["id"], "5");
    assert_eq!(results[4]["category"], "financial");
    assert_eq!(results[4]["priority"], "medium");
    assert_eq!(results[4]["action"], "auto-reply");
}

#[tokio::test]
async fn timestamp_offset_is_echoed_unchanged() {
    let base = start_rules_server().await;
    let mut record = email("7", "Hello", "Just saying hi");
    record["timestamp"] = json!("2025-03-01T10:00:00.000+03:00");

    let (status, body) = post_batch(&base, &json!({ "emails": [record] })).await;
    assert_eq!(status, StatusCode::OK);
    let timestamp = body["processedEmails"][0]["timestamp"].as_str().unwrap();
    assert!(timestamp.starts_with("2025-03-01T10:00:00"));
    assert!(timestamp.ends_with("+03:00"));
}
