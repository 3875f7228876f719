use thiserror::Error;

pub const AUTH_MESSAGE: &str = "The API key is not valid. Please check your configuration.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TryOnError {
    #[error("Encoding error: {0}")]
    Encoding(String),
    #[error("{0}")]
    Validation(String),
    #[error("Request was blocked. Reason: {0}")]
    Blocked(String),
    #[error("API returned no candidates in the response.")]
    EmptyResponse,
    #[error("Model returned text instead of an image: {0}")]
    UnexpectedText(String),
    #[error("No image was generated in the response. The response may be empty or in an unexpected format.")]
    MalformedResponse,
    #[error("Auth error: {0}")]
    Auth(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TryOnError {
    /// The single line shown on the result surface.
    ///
    /// Remote failures carry the "Failed to generate image" prefix; transport
    /// detail stays in the logs.
    pub fn user_message(&self) -> String {
        match self {
            TryOnError::Encoding(_) => "Failed to load image. Please try another file.".to_string(),
            TryOnError::Validation(msg) => msg.clone(),
            TryOnError::Auth(_) => AUTH_MESSAGE.to_string(),
            TryOnError::Transport(_) => {
                "Failed to generate image: the model service could not be reached or returned an error."
                    .to_string()
            }
            TryOnError::Config(msg) => format!("Configuration error: {}", msg),
            TryOnError::Serialization(_) => {
                "Failed to generate image: the request could not be built.".to_string()
            }
            TryOnError::Internal(_) => {
                "An unknown error occurred while generating the image.".to_string()
            }
            TryOnError::Blocked(_)
            | TryOnError::EmptyResponse
            | TryOnError::UnexpectedText(_)
            | TryOnError::MalformedResponse => format!("Failed to generate image: {}", self),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TryOnError::Encoding(_) => "encoding",
            TryOnError::Validation(_) => "validation",
            TryOnError::Blocked(_) => "blocked",
            TryOnError::EmptyResponse => "empty_response",
            TryOnError::UnexpectedText(_) => "unexpected_text",
            TryOnError::MalformedResponse => "malformed_response",
            TryOnError::Auth(_) => "auth",
            TryOnError::Transport(_) => "transport",
            TryOnError::Config(_) => "config",
            TryOnError::Serialization(_) => "serialization",
            TryOnError::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for TryOnError {
    fn from(e: serde_json::Error) -> Self {
        TryOnError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TryOnError>;
