//! Speech output
//!
//! This module provides:
//! - The `Narrator` seam used by the conversation controller
//! - `CommandNarrator`, speaking through an external TTS program
//! - `SilentNarrator`, for running with audio disabled

pub mod command;
pub mod narrator;
pub mod silent;

// Re-export commonly used types
pub use command::CommandNarrator;
pub use narrator::{
    normalize_text_for_narration, NarrationError, Narrator, NarratorConfig, DEFAULT_LANGUAGE,
};
pub use silent::SilentNarrator;
