pub mod integration;
pub mod llm;
pub mod messages;
pub mod speech;
pub mod ui;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ChatError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Gateway error: {0}")]
    GatewayError(String),

    #[error("Narration error: {0}")]
    NarrationError(String),

    #[error("IO error: {0}")]
    IOError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl From<std::io::Error> for ChatError {
    fn from(e: std::io::Error) -> Self {
        ChatError::IOError(e.to_string())
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(e: serde_json::Error) -> Self {
        ChatError::SerializationError(e.to_string())
    }
}

impl ChatError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Missing credentials or a broken config file need the user
            ChatError::ConfigError(_) => false,
            // These are typically transient errors
            ChatError::GatewayError(_) => true,
            ChatError::NarrationError(_) => true,
            ChatError::IOError(_) => false,
            ChatError::SerializationError(_) => false,
            ChatError::ChannelError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            ChatError::ConfigError(_) => {
                "Configuration error. Please check settings and the API key.".to_string()
            }
            ChatError::GatewayError(_) => {
                "AI response generation failed. Please try again.".to_string()
            }
            ChatError::NarrationError(_) => {
                "Text-to-speech failed. Response will be shown as text.".to_string()
            }
            ChatError::IOError(_) => "File system error occurred.".to_string(),
            ChatError::SerializationError(_) => {
                "Could not read the configuration file.".to_string()
            }
            ChatError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
