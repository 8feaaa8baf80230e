//! AI gateway: prompt templates and the Gemini client

pub mod config;
pub mod gateway;
pub mod gemini;
pub mod prompts;

pub use config::GatewayConfig;
pub use gateway::{Gateway, GatewayError, GENERIC_FAILURE};
pub use gemini::GeminiClient;
pub use prompts::{build_topic_prompt, PromptConfig, DEFAULT_SUBJECT, INTRO_PROMPT};
