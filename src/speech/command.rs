//! Narration through an external TTS program (espeak-ng by default)

use crate::speech::narrator::{normalize_text_for_narration, NarrationError, Narrator, NarratorConfig};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Runs one TTS process per narration; `stop` kills it.
pub struct CommandNarrator {
    command: String,
    args: Vec<String>,
    next_id: AtomicU64,
    /// Stop signal for the process currently speaking, tagged with its id
    active: Mutex<Option<(u64, oneshot::Sender<()>)>>,
}

impl CommandNarrator {
    pub fn new(config: &NarratorConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            next_id: AtomicU64::new(0),
            active: Mutex::new(None),
        }
    }

    /// Program arguments for one narration
    fn build_args(&self, text: &str, language: &str) -> Vec<String> {
        // espeak-ng voice names are lowercase ("pt-br")
        let voice = language.to_lowercase();
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace("{language}", &voice))
            .collect();
        args.push(text.to_string());
        args
    }

    fn release(&self, id: u64) {
        let mut active = self.active.lock();
        if active.as_ref().map(|(current, _)| *current == id).unwrap_or(false) {
            *active = None;
        }
    }
}

#[async_trait]
impl Narrator for CommandNarrator {
    async fn speak(&self, text: &str, language: &str) -> Result<(), NarrationError> {
        let spoken = normalize_text_for_narration(text);
        if spoken.is_empty() {
            return Ok(());
        }

        // A new narration replaces whatever is playing
        self.stop();

        let mut child = Command::new(&self.command)
            .args(self.build_args(&spoken, language))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| NarrationError::Unavailable(format!("{}: {}", self.command, e)))?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (stop_tx, stop_rx) = oneshot::channel();
        *self.active.lock() = Some((id, stop_tx));

        debug!("Narrating {} chars with {}", spoken.len(), self.command);

        let result = tokio::select! {
            status = child.wait() => match status {
                Ok(status) if status.success() => Ok(()),
                Ok(status) => Err(NarrationError::Failed(format!(
                    "{} exited with {}",
                    self.command, status
                ))),
                Err(e) => Err(NarrationError::Failed(e.to_string())),
            },
            _ = stop_rx => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill narration process: {}", e);
                }
                Err(NarrationError::Stopped)
            }
        };

        self.release(id);
        result
    }

    fn stop(&self) {
        if let Some((id, stop_tx)) = self.active.lock().take() {
            info!("Stopping narration {}", id);
            let _ = stop_tx.send(());
        }
    }
}
