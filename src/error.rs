use axum::http::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Payment error: {0}")]
    Payment(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Address parse error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    #[error("OpenAI error: {0}")]
    OpenAi(#[from] async_openai::error::OpenAIError),

    #[error("Invalid state transition: {current} -> {requested}")]
    InvalidTransition { current: String, requested: String },

    #[error("Payment not found: {order_id}")]
    PaymentNotFound { order_id: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    pub fn payment(msg: impl Into<String>) -> Self {
        Self::Payment(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Which inference operation failed. Only used to pick the caller-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceTask {
    Chat,
    ImageAnalysis,
}

impl InferenceTask {
    pub fn failure_message(&self) -> &'static str {
        match self {
            Self::Chat => "Medical chat processing failed",
            Self::ImageAnalysis => "Medical image processing failed",
        }
    }
}

/// Errors surfaced to HTTP callers. Messages are safe to return verbatim;
/// upstream detail is logged where the error is produced, never carried here.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Invalid request body")]
    InvalidRequestBody,

    #[error("Message is required")]
    MissingMessage,

    #[error("No image provided")]
    MissingImage,

    #[error("Invalid base64 encoding")]
    InvalidEncoding,

    #[error("Invalid image data")]
    InvalidImageData,

    #[error("Image too large (max 5MB)")]
    ImageTooLarge,

    #[error("{}", .0.failure_message())]
    InferenceFailed(InferenceTask),

    #[error("Image validation failed")]
    ValidationFailed,
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody
            | Self::MissingMessage
            | Self::MissingImage
            | Self::InvalidEncoding
            | Self::InvalidImageData
            | Self::ImageTooLarge => StatusCode::BAD_REQUEST,
            Self::InferenceFailed(_) | Self::ValidationFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}
