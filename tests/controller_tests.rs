//! Behavioural tests for the conversation controller
//!
//! The gateway and narrator are replaced by scripted fakes so every outcome
//! (reply, failure, panic, slow request, long narration) can be driven.

use async_trait::async_trait;
use furia_chat::integration::{
    ControllerBuilder, ControllerEvent, ConversationController, SendOutcome,
};
use furia_chat::llm::{Gateway, GatewayError, DEFAULT_SUBJECT};
use furia_chat::messages::Sender;
use furia_chat::speech::{NarrationError, Narrator};
use furia_chat::ui::{Notification, NotificationKind};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Gateway that answers from a script and records every prompt
#[derive(Default)]
struct ScriptedGateway {
    replies: Mutex<VecDeque<Result<String, GatewayError>>>,
    prompts: Mutex<Vec<String>>,
    /// When set, each call waits for a permit before answering
    gate: Option<Arc<Notify>>,
}

impl ScriptedGateway {
    fn replying(replies: Vec<Result<String, GatewayError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn send(&self, prompt: &str) -> Result<String, GatewayError> {
        self.prompts.lock().push(prompt.to_string());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let next = self.replies.lock().pop_front();
        next.unwrap_or_else(|| Ok("Vai FURIA!".to_string()))
    }
}

struct PanickingGateway;

#[async_trait]
impl Gateway for PanickingGateway {
    async fn send(&self, _prompt: &str) -> Result<String, GatewayError> {
        panic!("connection pool poisoned")
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum NarrationMode {
    /// Speak until stopped
    Hold,
    /// Finish immediately
    Complete,
    /// Report an engine failure
    Fail,
}

struct RecordingNarrator {
    mode: NarrationMode,
    spoken: Mutex<Vec<(String, String)>>,
    stops: AtomicUsize,
    release: Notify,
}

impl RecordingNarrator {
    fn new(mode: NarrationMode) -> Self {
        Self {
            mode,
            spoken: Mutex::new(Vec::new()),
            stops: AtomicUsize::new(0),
            release: Notify::new(),
        }
    }

    fn spoken_texts(&self) -> Vec<String> {
        self.spoken.lock().iter().map(|(t, _)| t.clone()).collect()
    }

    fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Narrator for RecordingNarrator {
    async fn speak(&self, text: &str, language: &str) -> Result<(), NarrationError> {
        self.spoken.lock().push((text.to_string(), language.to_string()));
        match self.mode {
            NarrationMode::Complete => Ok(()),
            NarrationMode::Fail => Err(NarrationError::Failed("audio device busy".into())),
            NarrationMode::Hold => {
                self.release.notified().await;
                Ok(())
            }
        }
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.release.notify_waiters();
    }
}

fn build(
    gateway: Arc<dyn Gateway>,
    narrator: Arc<RecordingNarrator>,
    delay: Duration,
) -> ConversationController {
    ControllerBuilder::new(gateway, narrator)
        .with_narration_delay(delay)
        .build()
        .unwrap()
}

fn notifications(controller: &ConversationController) -> Vec<Notification> {
    controller
        .subscribe()
        .try_iter()
        .filter_map(|event| match event {
            ControllerEvent::Notification(n) => Some(n),
            ControllerEvent::StateChanged => None,
        })
        .collect()
}

async fn wait_until(condition: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

#[tokio::test]
async fn test_whitespace_input_is_ignored() {
    let gateway = Arc::new(ScriptedGateway::default());
    let narrator = Arc::new(RecordingNarrator::new(NarrationMode::Complete));
    let controller = build(gateway.clone(), narrator, Duration::ZERO);

    for input in ["", "   ", " \n\t "] {
        controller.set_input(input);
        assert_eq!(controller.send_message().await, SendOutcome::Ignored);
        assert!(controller.messages().is_empty());
        assert!(!controller.is_loading());
        assert_eq!(controller.input(), input);
    }
    assert!(gateway.prompts().is_empty());
}

#[tokio::test]
async fn test_successful_send_appends_user_then_assistant() {
    let gateway = Arc::new(ScriptedGateway::replying(vec![Ok(
        "A FURIA joga com KSCERATO e yuurih.".into(),
    )]));
    let narrator = Arc::new(RecordingNarrator::new(NarrationMode::Complete));
    let controller = build(gateway.clone(), narrator.clone(), Duration::ZERO);

    controller.set_input("Quem são os riflers?");
    assert_eq!(controller.send_message().await, SendOutcome::Replied);

    let messages = controller.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender, Sender::User);
    assert_eq!(messages[0].text, "Quem são os riflers?");
    assert_eq!(messages[1].sender, Sender::Assistant);
    assert_eq!(messages[1].text, "A FURIA joga com KSCERATO e yuurih.");
    assert!(!messages[1].is_error);

    assert!(!controller.is_loading());
    assert!(controller.input().is_empty());

    assert!(wait_until(|| !narrator.spoken_texts().is_empty()).await);
    let spoken = narrator.spoken.lock().clone();
    assert_eq!(
        spoken,
        vec![("A FURIA joga com KSCERATO e yuurih.".to_string(), "pt-BR".to_string())]
    );
}

#[tokio::test]
async fn test_prompt_is_wrapped_with_subject() {
    let gateway = Arc::new(ScriptedGateway::replying(vec![
        Ok("About Furia's roster".into()),
        Ok("Não fui programada para responder assuntos desse tipo.".into()),
    ]));
    let narrator = Arc::new(RecordingNarrator::new(NarrationMode::Complete));
    let controller = build(gateway.clone(), narrator, Duration::ZERO);

    assert_eq!(controller.initialize().await, SendOutcome::Replied);
    assert_eq!(controller.submit("what's the weather").await, SendOutcome::Replied);

    let prompts = gateway.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains(DEFAULT_SUBJECT));
    assert!(prompts[1].contains("what's the weather"));

    let messages = controller.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].text, "About Furia's roster");
    assert_eq!(messages[1].sender, Sender::User);
    assert_eq!(messages[1].text, "what's the weather");
    assert_eq!(messages[2].sender, Sender::Assistant);
}

#[tokio::test]
async fn test_gateway_failure_appends_error_bubble() {
    let gateway = Arc::new(ScriptedGateway::replying(vec![Err(
        GatewayError::Unavailable("network timeout".into()),
    )]));
    let narrator = Arc::new(RecordingNarrator::new(NarrationMode::Complete));
    let controller = build(gateway, narrator.clone(), Duration::ZERO);

    assert_eq!(controller.submit("Quando é o próximo jogo?").await, SendOutcome::Failed);

    let messages = controller.messages();
    assert_eq!(messages.len(), 2);
    let last = messages.last().unwrap();
    assert_eq!(last.sender, Sender::Assistant);
    assert!(last.is_error);
    assert!(last.text.contains("network timeout"));
    assert!(!controller.is_loading());

    let danger: Vec<_> = notifications(&controller)
        .into_iter()
        .filter(|n| n.kind == NotificationKind::Danger)
        .collect();
    assert_eq!(danger.len(), 1);
    assert_eq!(danger[0].title, "Communication error");
    assert_eq!(danger[0].duration, Duration::from_secs(5));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(narrator.spoken_texts().is_empty());
}

#[tokio::test]
async fn test_panicking_gateway_is_contained() {
    let narrator = Arc::new(RecordingNarrator::new(NarrationMode::Complete));
    let controller = build(Arc::new(PanickingGateway), narrator, Duration::ZERO);

    assert_eq!(controller.submit("oi").await, SendOutcome::Failed);

    let last = controller.messages().pop().unwrap();
    assert!(last.is_error);
    assert_eq!(last.text, "Unexpected error: connection pool poisoned");
    assert!(!controller.is_loading());
    assert!(notifications(&controller)
        .iter()
        .any(|n| n.title == "Unexpected error"));
}

#[tokio::test]
async fn test_initialize_narrates_welcome() {
    let gateway = Arc::new(ScriptedGateway::replying(vec![Ok(
        "Hello, I am the assistant.".into(),
    )]));
    let narrator = Arc::new(RecordingNarrator::new(NarrationMode::Hold));
    let controller = build(gateway.clone(), narrator.clone(), Duration::from_millis(10));

    assert_eq!(controller.initialize().await, SendOutcome::Replied);

    let messages = controller.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender, Sender::Assistant);
    assert_eq!(messages[0].text, "Hello, I am the assistant.");
    assert!(!controller.is_loading());

    let welcome = notifications(&controller);
    assert_eq!(welcome.len(), 1);
    assert_eq!(welcome[0].kind, NotificationKind::Info);
    assert_eq!(welcome[0].title, "Welcome!");
    assert_eq!(welcome[0].body.as_deref(), Some("Hello, I am the assistant."));

    assert!(wait_until(|| controller.is_speaking()).await);
    assert_eq!(narrator.spoken_texts(), vec!["Hello, I am the assistant."]);
    assert_eq!(gateway.prompts().len(), 1);
}

#[tokio::test]
async fn test_welcome_does_not_interrupt_active_narration() {
    let gateway = Arc::new(ScriptedGateway::replying(vec![
        Ok("Resposta anterior".into()),
        Ok("Boas-vindas".into()),
    ]));
    let narrator = Arc::new(RecordingNarrator::new(NarrationMode::Hold));
    let controller = build(gateway, narrator.clone(), Duration::from_millis(50));

    assert_eq!(controller.submit("oi").await, SendOutcome::Replied);
    // Start narration by hand before the delayed one fires
    assert!(controller.toggle_speech());

    assert_eq!(controller.initialize().await, SendOutcome::Replied);
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(controller.is_speaking());
    assert_eq!(narrator.spoken_texts(), vec!["Resposta anterior"]);
    assert_eq!(controller.messages().len(), 3);
}

#[tokio::test]
async fn test_initialize_failure_is_not_fatal() {
    let gateway = Arc::new(ScriptedGateway::replying(vec![
        Err(GatewayError::unavailable()),
        Ok("Agora sim!".into()),
    ]));
    let narrator = Arc::new(RecordingNarrator::new(NarrationMode::Complete));
    let controller = build(gateway, narrator, Duration::ZERO);

    assert_eq!(controller.initialize().await, SendOutcome::Failed);
    let first = controller.messages().pop().unwrap();
    assert!(first.is_error);
    assert_eq!(first.text, "Failed to load: Failed to get a response from the AI.");
    assert!(!controller.is_loading());

    // Conversation stays usable
    assert_eq!(controller.submit("oi").await, SendOutcome::Replied);
    assert_eq!(controller.messages().len(), 3);
}

#[tokio::test]
async fn test_toggle_without_reply_warns() {
    let gateway = Arc::new(ScriptedGateway::replying(vec![Err(
        GatewayError::Unavailable("quota exceeded".into()),
    )]));
    let narrator = Arc::new(RecordingNarrator::new(NarrationMode::Complete));
    let controller = build(gateway, narrator.clone(), Duration::ZERO);

    // Only a user message and an error bubble in the log
    controller.submit("oi").await;
    let _ = notifications(&controller);

    assert!(!controller.toggle_speech());
    assert!(!controller.is_speaking());

    let warnings = notifications(&controller);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, NotificationKind::Warning);
    assert_eq!(warnings[0].title, "Nothing to speak");
    assert!(narrator.spoken_texts().is_empty());
}

#[tokio::test]
async fn test_toggle_stops_and_restarts_latest_reply() {
    let gateway = Arc::new(ScriptedGateway::replying(vec![
        Ok("Primeira resposta".into()),
        Err(GatewayError::unavailable()),
    ]));
    let narrator = Arc::new(RecordingNarrator::new(NarrationMode::Hold));
    let controller = build(gateway, narrator.clone(), Duration::ZERO);

    controller.submit("pergunta 1").await;
    assert!(wait_until(|| controller.is_speaking()).await);

    let stops_before = narrator.stops();
    assert!(!controller.toggle_speech());
    assert!(!controller.is_speaking());
    assert!(narrator.stops() > stops_before);

    // The error bubble is skipped; the last good reply is replayed
    controller.submit("pergunta 2").await;
    assert!(controller.toggle_speech());
    assert!(controller.is_speaking());
    assert!(wait_until(|| narrator.spoken_texts().len() == 2).await);
    assert_eq!(
        narrator.spoken_texts(),
        vec!["Primeira resposta", "Primeira resposta"]
    );
}

#[tokio::test]
async fn test_send_stops_active_narration() {
    let gateway = Arc::new(ScriptedGateway::replying(vec![
        Ok("Boas-vindas".into()),
        Ok("Resposta".into()),
    ]));
    let narrator = Arc::new(RecordingNarrator::new(NarrationMode::Hold));
    let controller = build(gateway, narrator.clone(), Duration::ZERO);

    controller.initialize().await;
    assert!(wait_until(|| controller.is_speaking()).await);
    let stops_before = narrator.stops();

    controller.submit("e agora?").await;
    assert!(narrator.stops() > stops_before);

    assert!(wait_until(|| narrator.spoken_texts().len() == 2).await);
    assert_eq!(narrator.spoken_texts(), vec!["Boas-vindas", "Resposta"]);
    assert!(controller.is_speaking());
}

#[tokio::test]
async fn test_narration_error_clears_speaking() {
    let gateway = Arc::new(ScriptedGateway::default());
    let narrator = Arc::new(RecordingNarrator::new(NarrationMode::Fail));
    let controller = build(gateway, narrator.clone(), Duration::ZERO);

    controller.submit("oi").await;
    assert!(wait_until(|| !narrator.spoken_texts().is_empty()).await);
    assert!(wait_until(|| !controller.is_speaking()).await);

    // Narration failures never reach the log
    let messages = controller.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| !m.is_error));
}

#[tokio::test]
async fn test_second_send_while_loading_is_rejected() {
    let gate = Arc::new(Notify::new());
    let gateway = Arc::new(ScriptedGateway::default().gated(gate.clone()));
    let narrator = Arc::new(RecordingNarrator::new(NarrationMode::Complete));
    let controller = Arc::new(build(gateway.clone(), narrator, Duration::ZERO));

    let first = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.submit("primeira").await })
    };
    assert!(wait_until(|| controller.is_loading()).await);
    let _ = notifications(&controller);

    controller.set_input("segunda");
    assert_eq!(controller.send_message().await, SendOutcome::Busy);
    assert_eq!(controller.input(), "segunda");
    assert_eq!(controller.messages().len(), 1);
    assert!(notifications(&controller)
        .iter()
        .any(|n| n.kind == NotificationKind::Warning && n.title == "Please wait"));

    gate.notify_one();
    assert_eq!(first.await.unwrap(), SendOutcome::Replied);
    assert!(!controller.is_loading());
    assert_eq!(gateway.prompts().len(), 1);

    // Once idle, the kept input can be sent
    gate.notify_one();
    assert_eq!(controller.send_message().await, SendOutcome::Replied);
    assert_eq!(gateway.prompts().len(), 2);
    assert!(gateway.prompts()[1].contains("segunda"));
}

#[tokio::test]
async fn test_concurrent_submits_never_lose_a_line() {
    let gate = Arc::new(Notify::new());
    let gateway = Arc::new(ScriptedGateway::default().gated(gate.clone()));
    let narrator = Arc::new(RecordingNarrator::new(NarrationMode::Complete));
    let controller = Arc::new(build(gateway.clone(), narrator, Duration::ZERO));

    let sends: Vec<_> = ["primeira", "segunda"]
        .into_iter()
        .map(|line| {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.submit(line).await })
        })
        .collect();

    // One line is in flight, the other was rejected and kept in the buffer
    assert!(wait_until(|| controller.is_loading() && !controller.input().is_empty()).await);
    assert!(notifications(&controller)
        .iter()
        .any(|n| n.kind == NotificationKind::Warning && n.title == "Please wait"));

    gate.notify_one();
    let mut outcomes = Vec::new();
    for send in sends {
        outcomes.push(send.await.unwrap());
    }
    assert!(outcomes.contains(&SendOutcome::Replied));
    assert!(outcomes.contains(&SendOutcome::Busy));

    let messages = controller.messages();
    assert_eq!(messages.len(), 2);
    let sent = messages[0].text.clone();
    let kept = controller.input();
    let mut lines = vec![sent.clone(), kept];
    lines.sort();
    assert_eq!(lines, vec!["primeira", "segunda"]);

    let prompts = gateway.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].ends_with(&sent));
}

#[tokio::test]
async fn test_clear_resets_everything_mid_request() {
    let gate = Arc::new(Notify::new());
    let gateway = Arc::new(ScriptedGateway::default().gated(gate.clone()));
    let narrator = Arc::new(RecordingNarrator::new(NarrationMode::Hold));
    let controller = Arc::new(build(gateway, narrator.clone(), Duration::ZERO));

    let pending = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.submit("vai ter jogo hoje?").await })
    };
    assert!(wait_until(|| controller.is_loading()).await);
    controller.set_input("rascunho");

    controller.clear_conversation();

    let snapshot = controller.snapshot();
    assert!(snapshot.messages.is_empty());
    assert!(snapshot.input.is_empty());
    assert!(!snapshot.loading);
    assert!(!snapshot.speaking);
    assert!(notifications(&controller)
        .iter()
        .any(|n| n.kind == NotificationKind::Info && n.title == "Chat cleared"));

    // The request that was in flight still lands exactly one reply
    gate.notify_one();
    assert_eq!(pending.await.unwrap(), SendOutcome::Replied);
    let messages = controller.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender, Sender::Assistant);
    assert!(!controller.is_loading());
}

#[tokio::test]
async fn test_clear_cancels_pending_narration() {
    let gateway = Arc::new(ScriptedGateway::default());
    let narrator = Arc::new(RecordingNarrator::new(NarrationMode::Hold));
    let controller = build(gateway, narrator.clone(), Duration::from_millis(50));

    controller.submit("oi").await;
    controller.clear_conversation();

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(narrator.spoken_texts().is_empty());
    assert!(!controller.is_speaking());
}

#[tokio::test]
async fn test_drop_stops_narration() {
    let gateway = Arc::new(ScriptedGateway::default());
    let narrator = Arc::new(RecordingNarrator::new(NarrationMode::Hold));
    let controller = build(gateway, narrator.clone(), Duration::ZERO);

    controller.submit("oi").await;
    assert!(wait_until(|| controller.is_speaking()).await);
    let stops_before = narrator.stops();

    drop(controller);
    assert!(narrator.stops() > stops_before);
}
