//! Narrator used when audio output is disabled

use crate::speech::narrator::{normalize_text_for_narration, NarrationError, Narrator};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::info;

/// Average speaking rate used to simulate narration time
const WORDS_PER_SECOND: f32 = 2.5;

/// Logs the text and takes roughly as long as reading it aloud would.
pub struct SilentNarrator {
    words_per_second: f32,
    stopped: Notify,
}

impl SilentNarrator {
    pub fn new() -> Self {
        Self {
            words_per_second: WORDS_PER_SECOND,
            stopped: Notify::new(),
        }
    }

    /// Override the simulated speaking rate
    pub fn with_rate(mut self, words_per_second: f32) -> Self {
        self.words_per_second = words_per_second.max(0.1);
        self
    }

    pub fn estimated_duration(&self, text: &str) -> Duration {
        let words = text.split_whitespace().count() as f32;
        Duration::from_secs_f32(words / self.words_per_second)
    }
}

impl Default for SilentNarrator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Narrator for SilentNarrator {
    async fn speak(&self, text: &str, language: &str) -> Result<(), NarrationError> {
        let spoken = normalize_text_for_narration(text);
        info!(language = %language, "(muted) {}", spoken);

        let stopped = self.stopped.notified();
        tokio::select! {
            _ = tokio::time::sleep(self.estimated_duration(&spoken)) => Ok(()),
            _ = stopped => Err(NarrationError::Stopped),
        }
    }

    fn stop(&self) {
        self.stopped.notify_waiters();
    }
}
