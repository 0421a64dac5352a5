use super::types::*;
use crate::{Error, Result, config::LlmConfig};
use async_openai::{Client, config::OpenAIConfig, types as openai_types};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn create_chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse>;
}

pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::config("LLM API key is empty"));
        }

        let mut openai_config = OpenAIConfig::new().with_api_key(config.api_key);

        if !config.base_url.is_empty() {
            openai_config = openai_config.with_api_base(config.base_url);
        }

        let timeout = Duration::from_secs(config.request_timeout_secs);
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        let client = Client::with_config(openai_config)
            .with_http_client(http_client)
            .with_backoff(single_attempt());

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// The client retries 5xx and rate-limit responses by default; a zero elapsed-time
/// budget makes every failure final after the first attempt.
fn single_attempt() -> backoff::ExponentialBackoff {
    backoff::ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn create_chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        debug!(
            "Creating chat completion with {} messages on model {}",
            request.messages.len(),
            request.model
        );

        let mut messages = Vec::with_capacity(request.messages.len());
        for msg in &request.messages {
            messages.push(msg.to_openai_message()?);
        }

        let openai_request = openai_types::CreateChatCompletionRequestArgs::default()
            .model(&request.model)
            .messages(messages)
            .build()?;

        let response = self.client.chat().create(openai_request).await?;

        debug!(
            "Received chat completion response with {} choices",
            response.choices.len()
        );

        let choices = response
            .choices
            .into_iter()
            .map(|choice| Choice {
                index: choice.index,
                message: ResponseMessage {
                    role: format!("{:?}", choice.message.role).to_lowercase(),
                    content: choice.message.content,
                },
                finish_reason: choice.finish_reason.map(|fr| format!("{fr:?}")),
            })
            .collect();

        let usage = response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ChatCompletionResponse {
            id: response.id,
            model: response.model,
            choices,
            usage,
        })
    }
}
