use daily_digest::config::LlmConfig;
use daily_digest::{ChatCompletionClient, CompletionClient, DigestError};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> LlmConfig {
    LlmConfig {
        endpoint: format!("{}/v1/", server.uri()),
        api_key: Some("test-key".to_string()),
        model: "test-model".to_string(),
        timeout_secs: 5,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_posts_single_user_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "messages": [{"role": "user", "content": "rate these"}],
            "max_tokens": 4000
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"results\": []}"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatCompletionClient::new(&config_for(&server)).unwrap();
    assert_eq!(client.adapter_name(), "chat-completions:test-model");
    let reply = client.complete("rate these").await.unwrap();
    assert_eq!(reply, "{\"results\": []}");
}

#[tokio::test]
async fn test_error_status_is_reported_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatCompletionClient::new(&config_for(&server)).unwrap();
    match client.complete("anything").await {
        Err(DigestError::Llm(message)) => assert!(message.contains("429"), "{}", message),
        other => panic!("expected an LLM error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_choices_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let client = ChatCompletionClient::new(&config_for(&server)).unwrap();
    assert!(matches!(client.complete("anything").await, Err(DigestError::Llm(_))));
}

#[test]
fn test_missing_api_key_is_a_config_error() {
    let config = LlmConfig::default();
    assert!(matches!(ChatCompletionClient::new(&config), Err(DigestError::Config(_))));
}
