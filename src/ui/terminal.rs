//! Line-based terminal front end
//!
//! Shows a start banner, then reads chat lines from stdin. Output is driven by
//! polling a [`ChatView`], the same way a GUI would on each frame.

use crate::integration::{ConversationController, ConversationSnapshot};
use crate::messages::Sender;
use crate::ui::notification::Notification;
use crate::ui::state::ChatView;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use uuid::Uuid;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

const BANNER: &str = r#"
  FURIA Chat
  Pergunte sobre o time de Counter-Strike da FURIA.

  /speak  play or stop the last reply
  /clear  clear the conversation
  /quit   exit
"#;

/// A parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Message(String),
    ToggleSpeech,
    Clear,
    Help,
    Quit,
    Empty,
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed {
            "" => ReplCommand::Empty,
            "/speak" | "/s" => ReplCommand::ToggleSpeech,
            "/clear" | "/c" => ReplCommand::Clear,
            "/help" | "/h" | "/?" => ReplCommand::Help,
            "/quit" | "/q" | "/exit" => ReplCommand::Quit,
            _ => ReplCommand::Message(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

/// Turns snapshots into printable lines, remembering what was already shown
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    printed: usize,
    /// Id of the oldest message shown; changes when the log is cleared
    first: Option<Uuid>,
    loading: bool,
    speaking: bool,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, snapshot: &ConversationSnapshot) -> Vec<String> {
        let mut lines = Vec::new();

        // Log was cleared since the last render, possibly refilled
        let first = snapshot.messages.first().map(|m| m.id);
        if first != self.first || snapshot.messages.len() < self.printed {
            self.printed = 0;
        }
        self.first = first;

        for message in &snapshot.messages[self.printed..] {
            let prefix = match (message.sender, message.is_error) {
                (Sender::User, _) => "you>",
                (Sender::Assistant, false) => "furia>",
                (Sender::Assistant, true) => "furia [error]>",
            };
            lines.push(format!("{} {}", prefix, message.text));
        }
        self.printed = snapshot.messages.len();

        if snapshot.loading && !self.loading {
            lines.push("... waiting for a response".to_string());
        }
        if snapshot.speaking != self.speaking {
            lines.push(if snapshot.speaking {
                "(speaking)".to_string()
            } else {
                "(stopped speaking)".to_string()
            });
        }
        self.loading = snapshot.loading;
        self.speaking = snapshot.speaking;

        lines
    }

    pub fn render_notification(notification: &Notification) -> String {
        match &notification.body {
            Some(body) => format!(
                "[{}] {}: {}",
                notification.kind.label(),
                notification.title,
                body
            ),
            None => format!("[{}] {}", notification.kind.label(), notification.title),
        }
    }
}

fn print_lines(lines: &[String]) {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for line in lines {
        let _ = writeln!(out, "{}", line);
    }
    let _ = out.flush();
}

/// Run the chat loop until `/quit` or end of input
pub async fn run(controller: Arc<ConversationController>) -> anyhow::Result<()> {
    print_lines(&[BANNER.to_string()]);

    let printer = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            let mut view = ChatView::new(&controller);
            let mut renderer = TerminalRenderer::new();
            let mut interval = tokio::time::interval(POLL_INTERVAL);
            loop {
                interval.tick().await;
                let notifications = view.poll_events(&controller);
                let mut lines: Vec<String> = notifications
                    .iter()
                    .map(TerminalRenderer::render_notification)
                    .collect();
                lines.extend(renderer.render(&view.snapshot));
                if !lines.is_empty() {
                    print_lines(&lines);
                }
            }
        })
    };

    {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            controller.initialize().await;
        });
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match ReplCommand::parse(&line) {
            ReplCommand::Quit => break,
            ReplCommand::Empty => {}
            ReplCommand::Help => print_lines(&[BANNER.to_string()]),
            ReplCommand::ToggleSpeech => {
                controller.toggle_speech();
            }
            ReplCommand::Clear => controller.clear_conversation(),
            ReplCommand::Message(text) => {
                let controller = Arc::clone(&controller);
                tokio::spawn(async move {
                    let outcome = controller.submit(text).await;
                    debug!("Send finished: {:?}", outcome);
                });
            }
        }
    }

    info!("Leaving chat");
    controller.shutdown();
    // Let the printer flush the final state
    tokio::time::sleep(POLL_INTERVAL * 2).await;
    printer.abort();
    Ok(())
}
