//! # Extraction Client Tests
//!
//! Exercises the outbound call against a mock provider: request shape, the
//! bounded retry on server errors and the immediate failure on client errors.

use claimintake::{
    prompts::{build_extraction_prompt, CLAIM_FIELDS, EXTENDED_CLAIM_FIELDS},
    AiProvider, ErrorKind, ExtractionClient, IntakeError, ProviderContract, RetryPolicy,
};
use claimintake_test_utils::chat_completion;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CREDENTIAL: &str = "test-key";

fn client_for(server: &MockServer, contract: ProviderContract) -> ExtractionClient {
    ExtractionClient::new(
        format!("{}/v1/chat/completions", server.uri()),
        Some("test-model".to_string()),
        contract,
        Some(Duration::from_secs(5)),
    )
    .unwrap()
    .with_retry_policy(RetryPolicy::immediate(3))
}

async fn received(server: &MockServer) -> usize {
    server.received_requests().await.unwrap_or_default().len()
}

#[tokio::test]
async fn test_chat_request_shape_and_success() {
    let server = MockServer::start().await;
    let completion = chat_completion(r#"{"State": "Maharashtra"}"#);

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "max_tokens": 512,
            "n": 1,
            "messages": [{ "role": "user" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, ProviderContract::ChatCompletions);
    let prompt = build_extraction_prompt("State: Maharashtra", CLAIM_FIELDS);

    let response = client.complete(&prompt, CREDENTIAL).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.attempts, 1);
    assert_eq!(response.body, completion);
    assert!(response
        .headers
        .iter()
        .any(|(name, value)| name == "content-type" && value.contains("application/json")));
}

#[tokio::test]
async fn test_structured_request_carries_fields() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "fields": EXTENDED_CLAIM_FIELDS
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "parsed_data": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, ProviderContract::Structured).with_max_tokens(2048);
    let prompt = build_extraction_prompt("text", EXTENDED_CLAIM_FIELDS);

    let response = client.complete(&prompt, CREDENTIAL).await.unwrap();
    assert_eq!(response.body, json!({ "parsed_data": {} }));
}

#[tokio::test]
async fn test_server_errors_stop_after_three_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server, ProviderContract::ChatCompletions);
    let prompt = build_extraction_prompt("text", CLAIM_FIELDS);

    let err = client.complete(&prompt, CREDENTIAL).await.unwrap_err();

    match err {
        IntakeError::ExtractionService {
            status,
            body,
            attempts,
        } => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream exploded");
            assert_eq!(attempts, 3);
        }
        other => panic!("expected ExtractionService, got {other:?}"),
    }
    assert_eq!(received(&server).await, 3);
}

#[tokio::test]
async fn test_success_on_second_attempt_short_circuits() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("{}")))
        .mount(&server)
        .await;

    let client = client_for(&server, ProviderContract::ChatCompletions);
    let prompt = build_extraction_prompt("text", CLAIM_FIELDS);

    let response = client.complete(&prompt, CREDENTIAL).await.unwrap();

    assert_eq!(response.attempts, 2);
    assert_eq!(received(&server).await, 2);
}

#[tokio::test]
async fn test_rejection_after_a_retry_reports_every_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("key revoked"))
        .mount(&server)
        .await;

    let client = client_for(&server, ProviderContract::ChatCompletions);
    let prompt = build_extraction_prompt("text", CLAIM_FIELDS);

    let err = client.complete(&prompt, CREDENTIAL).await.unwrap_err();

    assert!(
        matches!(err, IntakeError::Authentication { status: 401, attempts: 2, .. }),
        "got {err:?}"
    );
    assert_eq!(err.attempts(), Some(2));
    assert_eq!(received(&server).await, 2);
}

#[tokio::test]
async fn test_success_on_third_attempt_uses_backoff() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("{}")))
        .mount(&server)
        .await;

    let client = client_for(&server, ProviderContract::ChatCompletions).with_retry_policy(
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(100),
            jitter: false,
        },
    );
    let prompt = build_extraction_prompt("text", CLAIM_FIELDS);

    let started = std::time::Instant::now();
    let response = client.complete(&prompt, CREDENTIAL).await.unwrap();

    assert_eq!(response.attempts, 3);
    // 20ms after the first failure, 40ms after the second.
    assert!(started.elapsed() >= Duration::from_millis(60));
}

#[tokio::test]
async fn test_rejected_credential_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, ProviderContract::ChatCompletions);
    let prompt = build_extraction_prompt("text", CLAIM_FIELDS);

    let err = client.complete(&prompt, "wrong-key").await.unwrap_err();

    assert!(
        matches!(err, IntakeError::Authentication { status: 401, .. }),
        "got {err:?}"
    );
    assert_eq!(received(&server).await, 1);
}

#[tokio::test]
async fn test_bad_request_is_a_validation_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("max_tokens too large"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, ProviderContract::ChatCompletions);
    let prompt = build_extraction_prompt("text", CLAIM_FIELDS);

    let err = client.complete(&prompt, CREDENTIAL).await.unwrap_err();

    match &err {
        IntakeError::Rejected { status, body, attempts } => {
            assert_eq!(*status, 400);
            assert!(body.contains("max_tokens too large"));
            assert_eq!(*attempts, 1);
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(received(&server).await, 1);
}

#[tokio::test]
async fn test_non_json_success_body_is_a_normalization_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server, ProviderContract::ChatCompletions);
    let prompt = build_extraction_prompt("text", CLAIM_FIELDS);

    let err = client.complete(&prompt, CREDENTIAL).await.unwrap_err();
    assert!(matches!(err, IntakeError::Normalization(_)), "got {err:?}");
}

#[tokio::test]
async fn test_unreachable_provider_is_a_transport_error() {
    // Bind and drop a listener so nothing accepts on its port.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = ExtractionClient::new(
        format!("http://127.0.0.1:{port}/v1/chat/completions"),
        None,
        ProviderContract::ChatCompletions,
        Some(Duration::from_secs(2)),
    )
    .unwrap()
    .with_retry_policy(RetryPolicy::immediate(3));
    let prompt = build_extraction_prompt("text", CLAIM_FIELDS);

    let err = client.complete(&prompt, CREDENTIAL).await.unwrap_err();
    assert!(
        matches!(err, IntakeError::Transport { attempts: 1, .. }),
        "got {err:?}"
    );
}
