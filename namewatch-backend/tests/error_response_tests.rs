use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use namewatch_backend::{AppState, create_app, dispatcher};
use namewatch_core::Settings;
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;

/// Helper to create an app with default settings
fn create_test_app(api_key: Option<&str>) -> axum::Router {
    let (dispatch, outbox) =
        dispatcher::launch(Settings::default(), Box::new(Settings::default));
    create_app(
        AppState::new(dispatch, outbox, api_key),
        1024 * 1024,
        Duration::from_secs(30),
    )
}

/// Helper to send a request and get response
async fn send_request(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    auth_token: Option<&str>,
) -> (StatusCode, Value) {
    let mut request_builder = Request::builder().uri(uri).method(method);

    if let Some(token) = auth_token {
        request_builder = request_builder.header("Authorization", format!("Bearer {}", token));
    }

    let request = if let Some(json_body) = body {
        request_builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&json_body).unwrap()))
            .unwrap()
    } else {
        request_builder.body(Body::empty()).unwrap()
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();

    let body_bytes = response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes();

    let json = if body_bytes.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(json!({}))
    };

    (status, json)
}

#[tokio::test]
async fn test_error_response_format_for_invalid_guid() {
    // GIVEN: A running application
    let app = create_test_app(None);

    // WHEN: Sending a disconnect with an empty GUID
    let (status, body) = send_request(
        app,
        "POST",
        "/events/disconnect",
        Some(json!({ "guid": "" })),
        None,
    )
    .await;

    // THEN: Should return 400 with JSON error
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // AND: Error response should have proper structure
    assert!(body.get("error").is_some(), "Response should have 'error' field");
    assert_eq!(body["error"], "Invalid request");
    assert_eq!(body["details"], "GUID cannot be empty");
}

#[tokio::test]
async fn test_error_response_details_for_long_name() {
    // GIVEN: A running application
    let app = create_test_app(None);

    // WHEN: Sending a rename with an overlong name
    let (status, body) = send_request(
        app,
        "POST",
        "/events/rename",
        Some(json!({ "guid": "GUID1", "slot": 1, "ip": "10.0.0.1", "name": "x".repeat(70), "level": 0 })),
        None,
    )
    .await;

    // THEN: Details should name the limit
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let details = body["details"].as_str().unwrap();
    assert!(
        details.contains("max 64 characters"),
        "Details should mention the limit, got: {}",
        details
    );
}

#[tokio::test]
async fn test_error_response_format_for_unauthorized() {
    // GIVEN: An app protected by an API key
    let app = create_test_app(Some("namewatch-secret"));

    // WHEN: Draining commands without a key
    let (status, body) = send_request(app, "GET", "/commands", None, None).await;

    // THEN: Should return 401 with an error and no details
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or missing API key");
    assert!(
        body.get("details").is_none(),
        "Details should be omitted when absent"
    );
}

#[tokio::test]
async fn test_commands_empty_is_json_array() {
    // GIVEN: A fresh application
    let app = create_test_app(None);

    // WHEN: Draining commands with nothing queued
    let (status, body) = send_request(app, "GET", "/commands", None, None).await;

    // THEN: Should return an empty JSON array
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}
