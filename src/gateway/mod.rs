pub mod prompts;

use crate::{
    Result,
    config::LlmConfig,
    error::{InferenceTask, ServiceError},
    llm::{ChatCompletionRequest, ChatMessage, ContentPart, LlmClient, OpenAiClient},
    validation::EmbeddedImage,
};
use prompts::{CHAT_SYSTEM_PROMPT, DEFAULT_IMAGE_QUERY, DISCLAIMER};
use std::sync::Arc;
use tracing::{error, info};

/// Forwards text and image requests to the completion API and annotates replies
/// with the medical disclaimer. Holds no per-request state.
pub struct InferenceGateway {
    client: Arc<dyn LlmClient>,
    text_model: String,
    vision_model: String,
}

impl InferenceGateway {
    pub fn new(client: Arc<dyn LlmClient>, config: &LlmConfig) -> Self {
        Self {
            client,
            text_model: config.text_model.clone(),
            vision_model: config.vision_model.clone(),
        }
    }

    /// Builds the real upstream client. Fails when the credential is missing.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let client = OpenAiClient::new(config.clone())?;
        info!(
            "Inference gateway ready (provider: {}, text model: {}, vision model: {})",
            config.provider, config.text_model, config.vision_model
        );
        Ok(Self::new(Arc::new(client), config))
    }

    pub async fn chat_with_text(
        &self,
        message: Option<&str>,
    ) -> std::result::Result<String, ServiceError> {
        let message = match message {
            Some(message) if !message.is_empty() => message,
            _ => return Err(ServiceError::MissingMessage),
        };

        info!("Sending medical chat request ({} chars)", message.len());

        let request = ChatCompletionRequest {
            model: self.text_model.clone(),
            messages: vec![
                ChatMessage::system(CHAT_SYSTEM_PROMPT),
                ChatMessage::user(message),
            ],
        };

        let reply = self.complete(request, InferenceTask::Chat).await?;
        info!("Medical chat response received");
        Ok(reply)
    }

    pub async fn analyze_image(
        &self,
        image_base64: Option<&str>,
        query: Option<&str>,
    ) -> std::result::Result<String, ServiceError> {
        let raw = match image_base64 {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Err(ServiceError::MissingImage),
        };
        let query = query
            .filter(|q| !q.trim().is_empty())
            .unwrap_or(DEFAULT_IMAGE_QUERY);

        let image = EmbeddedImage::parse(raw);
        info!(
            "Analyzing medical image (subtype: {}, {} base64 chars)",
            image.subtype.unwrap_or("unspecified"),
            image.payload.len()
        );

        let request = ChatCompletionRequest {
            model: self.vision_model.clone(),
            messages: vec![ChatMessage::user_parts(vec![
                ContentPart::text(query),
                ContentPart::image_url(image.to_data_uri()),
            ])],
        };

        let reply = self.complete(request, InferenceTask::ImageAnalysis).await?;
        info!("Medical image analysis response received");
        Ok(reply)
    }

    async fn complete(
        &self,
        request: ChatCompletionRequest,
        task: InferenceTask,
    ) -> std::result::Result<String, ServiceError> {
        let response = self
            .client
            .create_chat_completion(request)
            .await
            .map_err(|e| {
                error!("{:?} upstream call failed: {}", task, e);
                ServiceError::InferenceFailed(task)
            })?;

        match response.first_content() {
            Some(content) => Ok(with_disclaimer(content)),
            None => {
                error!(
                    "{:?} upstream response {} carried no content ({} choices)",
                    task,
                    response.id,
                    response.choices.len()
                );
                Err(ServiceError::InferenceFailed(task))
            }
        }
    }
}

pub fn with_disclaimer(content: &str) -> String {
    format!("{content}{DISCLAIMER}")
}
