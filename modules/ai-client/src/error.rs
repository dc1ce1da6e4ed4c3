use thiserror::Error;

pub type Result<T> = std::result::Result<T, AiClientError>;

#[derive(Debug, Error)]
pub enum AiClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Empty response: {0}")]
    EmptyResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for AiClientError {
    fn from(err: reqwest::Error) -> Self {
        AiClientError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for AiClientError {
    fn from(err: serde_json::Error) -> Self {
        AiClientError::Parse(err.to_string())
    }
}
