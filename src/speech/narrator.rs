//! Narrator seam and shared narration settings

use crate::ChatError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Brazilian Portuguese, the language replies are written in
pub const DEFAULT_LANGUAGE: &str = "pt-BR";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NarrationError {
    #[error("Narration engine unavailable: {0}")]
    Unavailable(String),

    #[error("Narration failed: {0}")]
    Failed(String),

    #[error("Narration stopped")]
    Stopped,
}

impl From<NarrationError> for ChatError {
    fn from(e: NarrationError) -> Self {
        ChatError::NarrationError(e.to_string())
    }
}

/// Text-to-speech service.
///
/// `speak` resolves once the text has been read out (`Ok`) or narration
/// failed (`Err`). After `stop` the pending `speak` may resolve either way.
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn speak(&self, text: &str, language: &str) -> Result<(), NarrationError>;

    /// Halt any active narration. No-op when nothing is playing.
    fn stop(&self);
}

/// Configuration for narration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarratorConfig {
    /// Whether replies are spoken aloud through the TTS command
    pub enabled: bool,

    /// Language tag passed to the narrator
    pub language: String,

    /// Delay between a reply landing in the log and narration starting
    pub start_delay_ms: u64,

    /// TTS program to run
    pub command: String,

    /// Arguments placed before the text. `{language}` is substituted.
    pub args: Vec<String>,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            language: DEFAULT_LANGUAGE.to_string(),
            start_delay_ms: 100,
            command: "espeak-ng".to_string(),
            args: vec!["-v".to_string(), "{language}".to_string()],
        }
    }
}

impl NarratorConfig {
    /// Set the narration language
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the delay before narration of a new reply starts
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Use a different TTS program
    pub fn with_command(mut self, command: impl Into<String>, args: Vec<String>) -> Self {
        self.command = command.into();
        self.args = args;
        self
    }

    /// Disable audio output
    pub fn without_audio(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }
}

/// Clean model output before it is read aloud.
///
/// Gemini replies are markdown; the markup would otherwise be spelled out.
pub fn normalize_text_for_narration(text: &str) -> String {
    let mut lines = Vec::new();
    let mut in_code_block = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            in_code_block = !in_code_block;
            continue;
        }
        if in_code_block {
            continue;
        }

        let stripped = trimmed
            .trim_start_matches('#')
            .trim_start_matches(['*', '-', '•'])
            .trim();
        if !stripped.is_empty() {
            lines.push(stripped.to_string());
        }
    }

    let mut result = lines.join(". ");
    for marker in ["**", "__", "`", "*"] {
        result = result.replace(marker, "");
    }

    let symbols = [
        ("&", " e "),
        ("%", " por cento"),
        ("+", " mais "),
        ("=", " igual a "),
        ("@", " arroba "),
    ];
    for (symbol, spoken) in symbols {
        result = result.replace(symbol, spoken);
    }

    let abbreviations = [
        ("Sr.", "Senhor"),
        ("Sra.", "Senhora"),
        ("Dr.", "Doutor"),
        ("vs.", "versus"),
        ("etc.", "etcétera"),
    ];
    for (abbrev, expansion) in abbreviations {
        result = result.replace(abbrev, expansion);
    }

    // Headings already ending in punctuation would get a doubled stop
    result = result
        .replace(".. ", ". ")
        .replace("!. ", "! ")
        .replace("?. ", "? ")
        .replace(":. ", ": ");

    result
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || ".,!?;:'-\"()".contains(*c))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
