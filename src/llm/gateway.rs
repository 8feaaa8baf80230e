//! AI gateway seam
//!
//! The controller only sees this trait. Every failure crossing it is already
//! normalized into a [`GatewayError`].

use crate::ChatError;
use async_trait::async_trait;
use thiserror::Error;

/// Message used for every transport, quota or decoding failure
pub const GENERIC_FAILURE: &str = "Failed to get a response from the AI.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("The prompt cannot be empty.")]
    EmptyPrompt,

    #[error("{0}")]
    Unavailable(String),
}

impl GatewayError {
    /// The normalized failure returned for any remote problem
    pub fn unavailable() -> Self {
        GatewayError::Unavailable(GENERIC_FAILURE.to_string())
    }
}

impl From<GatewayError> for ChatError {
    fn from(e: GatewayError) -> Self {
        ChatError::GatewayError(e.to_string())
    }
}

/// A stateless prompt-in, text-out generative model
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Send one prompt and return the generated text.
    ///
    /// Empty or whitespace-only prompts are rejected with
    /// [`GatewayError::EmptyPrompt`] without any network call.
    async fn send(&self, prompt: &str) -> Result<String, GatewayError>;
}
