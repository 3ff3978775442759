// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Request instrumentation: timing, failure capture, transparency, and
//! collector self-exclusion.

mod common;

use std::sync::Arc;
use std::time::Duration;

use pulse::{HttpClient, HttpRequest, HttpResponse, TransportError};

use common::{agent, settle, RecordingClient};

const COLLECTOR_EVENT: &str = "http://localhost:8000/api/v1/error-tracking/error/";

// ============================================================================
// Self-Exclusion Tests
// ============================================================================

#[tokio::test]
async fn test_collector_calls_are_not_instrumented() {
    let relay_client = Arc::new(RecordingClient::new());
    let agent = agent(relay_client.clone());
    let app_client = Arc::new(RecordingClient::new());
    let client = agent.instrument(app_client.clone());

    let response = client
        .execute(HttpRequest::post(COLLECTOR_EVENT).body(b"{}".to_vec()))
        .await
        .unwrap();
    assert_eq!(response.status, 200);

    // Passed through unmodified
    let seen = app_client.requests();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].url, COLLECTOR_EVENT);
    assert_eq!(seen[0].body.as_deref(), Some(&b"{}"[..]));

    // And nothing was reported about it
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(agent.relay_stats().dispatched, 0);
    assert_eq!(relay_client.count(), 0);
}

#[tokio::test]
async fn test_failed_collector_call_is_not_captured() {
    let relay_client = Arc::new(RecordingClient::new());
    let agent = agent(relay_client.clone());
    let client = agent.instrument(RecordingClient::failing());

    let result = client
        .execute(HttpRequest::post(
            "http://localhost:8000/api/v1/error-tracking/session-update/",
        ))
        .await;
    assert!(matches!(result, Err(TransportError::Network(_))));

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(agent.relay_stats().dispatched, 0);
}

#[tokio::test]
async fn test_relative_collector_address_is_excluded() {
    let agent = agent(Arc::new(RecordingClient::new()));
    let client = agent.instrument(RecordingClient::new());

    assert!(client.is_collector_url("/api/v1/error-tracking/performance/"));
    assert!(!client.is_collector_url("/api/v1/contact/"));
}

// ============================================================================
// Timing Tests
// ============================================================================

#[tokio::test]
async fn test_successful_call_emits_api_call_metric() {
    let relay_client = Arc::new(RecordingClient::new());
    let agent = agent(relay_client.clone());
    let client = agent.instrument(RecordingClient::new().with_status(404));

    let response = client
        .execute(HttpRequest::get("https://api.example.com/projects/"))
        .await
        .unwrap();
    assert_eq!(response, HttpResponse::new(404));
    settle(&agent).await;

    let metrics = relay_client.bodies_for("/performance/");
    assert_eq!(metrics.len(), 1);
    let metric = &metrics[0];
    assert_eq!(metric["type"], "api_call");
    assert_eq!(metric["requestUrl"], "https://api.example.com/projects/");
    assert_eq!(metric["metrics"]["status"], 404);
    assert_eq!(metric["metrics"]["ok"], false);
    assert!(metric["duration"].is_u64());
    // Page address is kept alongside the measured address
    assert_eq!(metric["url"], common::PAGE_URL);
}

#[tokio::test(start_paused = true)]
async fn test_duration_reflects_call_time() {
    let relay_client = Arc::new(RecordingClient::new());
    let agent = agent(relay_client.clone());
    let client =
        agent.instrument(RecordingClient::new().with_delay(Duration::from_millis(250)));

    client
        .execute(HttpRequest::get("https://api.example.com/slow"))
        .await
        .unwrap();
    relay_client.wait_for(1).await;
    settle(&agent).await;

    let metric = &relay_client.bodies_for("/performance/")[0];
    assert!(metric["duration"].as_u64().unwrap() >= 250);
}

// ============================================================================
// Transparency Tests
// ============================================================================

#[tokio::test]
async fn test_response_identical_with_and_without_instrumentation() {
    let agent = agent(Arc::new(RecordingClient::new()));
    let plain = RecordingClient::new().with_status(201);
    let wrapped = agent.instrument(RecordingClient::new().with_status(201));

    let request = HttpRequest::post("https://api.example.com/contact/")
        .header("Content-Type", "application/json")
        .body(br#"{"name":"a"}"#.to_vec());

    let direct = plain.execute(request.clone()).await.unwrap();
    let instrumented = wrapped.execute(request).await.unwrap();
    assert_eq!(direct, instrumented);

    // Inner client saw the same request
    let seen = wrapped.inner().requests();
    assert_eq!(seen[0].header_value("Content-Type"), Some("application/json"));
    assert_eq!(seen[0].body.as_deref(), Some(&br#"{"name":"a"}"#[..]));
}

#[tokio::test]
async fn test_failure_propagates_and_is_captured() {
    let relay_client = Arc::new(RecordingClient::new());
    let agent = agent(relay_client.clone());
    let client = agent.instrument(RecordingClient::failing());

    let result = client
        .execute(HttpRequest::get("https://api.example.com/projects/"))
        .await;

    match result {
        Err(TransportError::Network(msg)) => assert_eq!(msg, "connection refused"),
        other => panic!("expected original network error, got {:?}", other),
    }
    settle(&agent).await;

    let errors = relay_client.bodies_for("/error/");
    assert_eq!(errors.len(), 1);
    let event = &errors[0];
    assert_eq!(event["type"], "api");
    assert_eq!(event["severity"], "medium");
    assert_eq!(
        event["message"],
        "API call failed: Network error: connection refused"
    );
    assert_eq!(event["extra_data"]["url"], "https://api.example.com/projects/");
    assert!(event["extra_data"]["duration"].is_u64());
    assert!(relay_client.bodies_for("/performance/").is_empty());
}

#[tokio::test]
async fn test_instrumented_client_outlives_agent() {
    let app_client = Arc::new(RecordingClient::new());
    let client = {
        let agent = agent(Arc::new(RecordingClient::new()));
        agent.instrument(app_client.clone())
    };

    let response = client
        .execute(HttpRequest::get("https://api.example.com/ping"))
        .await
        .unwrap();
    assert!(response.ok());
    assert_eq!(app_client.count(), 1);
}
