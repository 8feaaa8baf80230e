//! Wiring between the AI gateway, the narrator and the presentation layer

pub mod config;
pub mod controller;

pub use config::ChatConfig;
pub use controller::{
    ControllerBuilder, ControllerEvent, ConversationController, ConversationSnapshot, SendOutcome,
};

use crate::llm::{Gateway, GeminiClient};
use crate::speech::{CommandNarrator, Narrator, SilentNarrator};
use crate::Result;
use std::sync::Arc;
use tracing::info;

/// Build a controller backed by Gemini and the configured narrator
pub fn build_controller(config: &ChatConfig) -> Result<ConversationController> {
    config.validate()?;

    let client = GeminiClient::new(config.gateway.clone())?;
    info!("Using Gemini model {}", client.model());
    let gateway: Arc<dyn Gateway> = Arc::new(client);

    let narrator: Arc<dyn Narrator> = if config.narrator.enabled {
        info!("Narrating replies with {}", config.narrator.command);
        Arc::new(CommandNarrator::new(&config.narrator))
    } else {
        info!("Audio disabled, replies will not be spoken");
        Arc::new(SilentNarrator::new())
    };

    ControllerBuilder::new(gateway, narrator)
        .with_prompts(config.prompts.clone())
        .with_narrator_config(&config.narrator)
        .build()
}
