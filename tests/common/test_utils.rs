use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use medassist::{
    config::{Config, LlmConfig, LogsConfig, ServerConfig},
    gateway::InferenceGateway,
    llm::LlmClient,
    server::{self, AppState},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

pub const TEST_API_KEY: &str = "test-api-key";

/// LLM settings pointing at `base_url` with a short timeout
pub fn create_test_llm_config(base_url: &str) -> LlmConfig {
    LlmConfig {
        provider: "groq".to_string(),
        base_url: base_url.to_string(),
        api_key: TEST_API_KEY.to_string(),
        text_model: "llama3-8b-8192".to_string(),
        vision_model: "llama-3.2-11b-vision-preview".to_string(),
        request_timeout_secs: 5,
    }
}

/// Create a test configuration with sensible defaults
pub fn create_test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            logs: LogsConfig {
                level: "debug".to_string(),
            },
            body_limit_bytes: 16 * 1024 * 1024,
        },
        llm: create_test_llm_config("https://api.groq.com/openai/v1"),
    }
}

/// Router wired to an arbitrary LLM client
pub fn create_test_app(client: Arc<dyn LlmClient>) -> Router {
    create_test_app_with_body_limit(client, create_test_config().server.body_limit_bytes)
}

pub fn create_test_app_with_body_limit(client: Arc<dyn LlmClient>, body_limit: usize) -> Router {
    let config = create_test_config();
    let gateway = InferenceGateway::new(client, &config.llm);
    server::router(AppState {
        gateway: Arc::new(gateway),
        body_limit,
    })
}

/// Sends `body` verbatim with the given content type
pub async fn post_raw(
    app: Router,
    uri: &str,
    content_type: &str,
    body: impl Into<Body>,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", content_type)
        .body(body.into())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, value)
}

/// Base64 of `len` zero bytes
pub fn encoded_image(len: usize) -> String {
    STANDARD.encode(vec![0u8; len])
}

/// POSTs a JSON body and returns the status with the parsed response body
pub async fn post_json(app: Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    post_raw(app, uri, "application/json", body.to_string()).await
}

/// OpenAI-compatible completion body as the upstream would send it
pub fn completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "llama3-8b-8192",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop",
            "logprobs": null
        }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16 }
    })
}
