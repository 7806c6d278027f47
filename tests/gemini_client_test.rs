//! HTTP-level tests for GeminiClient against a wiremock server.

use reguwatch::config::Config;
use reguwatch::gemini::{GeminiClient, GeminiError, Schema, SearchGrounded, StructuredOutput};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH_PATH: &str = "/models/gemini-3-pro-preview:generateContent";
const ANALYSIS_PATH: &str = "/models/gemini-3-flash-preview:generateContent";

fn test_client(base_url: &str) -> GeminiClient {
    let config = Config {
        base_url: base_url.to_string(),
        timeout: 5,
        ..Config::new("test-key")
    };
    GeminiClient::new(config).unwrap()
}

fn text_reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

#[tokio::test]
async fn grounded_request_enables_search_and_authenticates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{ "role": "user", "parts": [{ "text": "find updates" }] }],
            "tools": [{ "google_search": {} }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("[]")))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let text = client.generate_grounded("find updates").await.unwrap();
    assert_eq!(text, "[]");
}

#[tokio::test]
async fn structured_request_sends_mime_type_and_schema() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ANALYSIS_PATH))
        .and(body_partial_json(json!({
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": { "status": { "type": "STRING" } },
                    "required": ["status"]
                }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_reply(r#"{"status":"Compliant"}"#)))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let schema = Schema::object([("status", Schema::string())]);
    let text = client.generate_structured("audit this", &schema).await.unwrap();
    assert_eq!(text, r#"{"status":"Compliant"}"#);
}

#[tokio::test]
async fn multi_part_reply_is_concatenated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Here: " }, { "text": "[1,2]" }] } }]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    assert_eq!(client.generate_grounded("q").await.unwrap(), "Here: [1,2]");
}

#[tokio::test]
async fn rate_limit_maps_to_server_busy() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.generate_grounded("q").await.unwrap_err();
    assert!(err.is_server_busy(), "got {:?}", err);
}

#[tokio::test]
async fn api_error_message_is_extracted_from_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "Search grounding is not supported.", "status": "INVALID_ARGUMENT" }
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    match client.generate_grounded("q").await {
        Err(GeminiError::ApiError { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "Search grounding is not supported.");
        }
        other => panic!("expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn non_json_body_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .generate_structured("q", &Schema::string())
        .await
        .unwrap_err();
    assert!(matches!(err, GeminiError::ParseError { .. }), "got {:?}", err);
}

#[tokio::test]
async fn blocked_prompt_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.generate_grounded("q").await.unwrap_err();
    assert!(matches!(err, GeminiError::Blocked { ref reason } if reason == "SAFETY"));
}

#[tokio::test]
async fn unreachable_host_is_a_network_error() {
    let client = test_client("http://127.0.0.1:1");
    let err = client.generate_grounded("q").await.unwrap_err();
    assert!(err.is_network_error(), "got {:?}", err);
}
