//! Conversation controller
//!
//! Owns the message log, the input buffer and the loading/speaking flags, and
//! sequences calls to the AI gateway and the narrator. Presentation code only
//! calls the action methods and reads snapshots or events.

use crate::llm::{Gateway, GatewayError, PromptConfig};
use crate::messages::{Message, MessageStorage};
use crate::speech::{Narrator, NarrationError, NarratorConfig, DEFAULT_LANGUAGE};
use crate::ui::notification::{Notification, NotificationKind};
use crate::{ChatError, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const WELCOME_DURATION: Duration = Duration::from_millis(4000);
const ERROR_DURATION: Duration = Duration::from_millis(5000);
const NOTHING_TO_SPEAK_DURATION: Duration = Duration::from_millis(2000);
const CLEARED_DURATION: Duration = Duration::from_millis(1500);
const BUSY_DURATION: Duration = Duration::from_millis(2000);

const EVENT_QUEUE_SIZE: usize = 256;

/// Events emitted by the controller
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// Log, input or flags changed; re-read the snapshot
    StateChanged,

    /// A transient notification should be shown
    Notification(Notification),
}

/// Result of `initialize` / `send_message`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Input was empty or whitespace; nothing happened
    Ignored,
    /// A request is already in flight; nothing happened
    Busy,
    /// The gateway replied and the reply was appended
    Replied,
    /// An error bubble was appended
    Failed,
}

/// Point-in-time copy of the controller state for rendering
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationSnapshot {
    pub messages: Vec<Message>,
    pub input: String,
    pub loading: bool,
    pub speaking: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NarrationPolicy {
    /// Only start when nothing is being narrated
    IfIdle,
    /// Start even if something else is being narrated
    Replace,
}

/// Why a dispatched prompt produced no text
#[derive(Debug, Clone)]
enum DispatchFailure {
    Gateway(GatewayError),
    Unexpected(String),
}

impl fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchFailure::Gateway(e) => write!(f, "{}", e),
            DispatchFailure::Unexpected(description) => write!(f, "{}", description),
        }
    }
}

#[derive(Default)]
struct ControlState {
    input: String,

    /// Request currently awaiting the gateway; `loading` is `in_flight.is_some()`
    in_flight: Option<Uuid>,

    speaking: bool,

    /// Bumped on every narration start and stop. Pending or finishing
    /// narrations compare against it to detect that they were superseded.
    narration_epoch: u64,

    narration_task: Option<JoinHandle<()>>,
}

struct Shared {
    gateway: Arc<dyn Gateway>,
    narrator: Arc<dyn Narrator>,
    prompts: PromptConfig,
    language: String,
    narration_delay: Duration,
    messages: MessageStorage,
    state: Mutex<ControlState>,
    event_tx: Sender<ControllerEvent>,
    event_rx: Receiver<ControllerEvent>,
    runtime: Handle,
}

/// Clears the loading flag when the owning request finishes, however it ends
struct LoadingGuard<'a> {
    shared: &'a Shared,
    request: Uuid,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            if state.in_flight == Some(self.request) {
                state.in_flight = None;
            }
        }
        self.shared.emit(ControllerEvent::StateChanged);
    }
}

impl Shared {
    /// Queue an event. When nobody drains the queue, the oldest event is
    /// dropped so the newest one is always kept.
    fn emit(&self, event: ControllerEvent) {
        if let Err(TrySendError::Full(event)) = self.event_tx.try_send(event) {
            debug!("Event queue full, dropping oldest event");
            let _ = self.event_rx.try_recv();
            if self.event_tx.try_send(event).is_err() {
                debug!("Event queue still full, dropping event");
            }
        }
    }

    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Info => info!("{}", notification.title),
            NotificationKind::Warning | NotificationKind::Danger => warn!(
                "{}: {}",
                notification.title,
                notification.body.as_deref().unwrap_or_default()
            ),
        }
        self.emit(ControllerEvent::Notification(notification));
    }

    fn notify_busy(&self) {
        debug!("Rejected send while a request is in flight");
        self.notify(
            Notification::warning("Please wait", BUSY_DURATION)
                .with_body("The assistant is still answering the previous message."),
        );
    }

    /// Mark a request as in flight, unless one already is
    fn begin_request(&self) -> Option<Uuid> {
        let mut state = self.state.lock();
        if state.in_flight.is_some() {
            return None;
        }
        let request = Uuid::new_v4();
        state.in_flight = Some(request);
        Some(request)
    }

    /// Run the gateway call on its own task so a panic in it is contained
    async fn dispatch(&self, prompt: String) -> std::result::Result<String, DispatchFailure> {
        let gateway = Arc::clone(&self.gateway);
        let call = self
            .runtime
            .spawn(async move { gateway.send(&prompt).await });

        match call.await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(DispatchFailure::Gateway(e)),
            Err(e) => Err(DispatchFailure::Unexpected(describe_join_error(e))),
        }
    }

    /// Stop narration and forget any pending one. Returns whether audio was playing.
    fn halt_narration(&self, state: &mut ControlState) -> bool {
        let was_speaking = state.speaking;
        state.narration_epoch += 1;
        state.speaking = false;
        if let Some(task) = state.narration_task.take() {
            task.abort();
        }
        self.narrator.stop();
        was_speaking
    }

    fn start_narration(self: &Arc<Self>, state: &mut ControlState, text: String) {
        if state.speaking || state.narration_task.is_some() {
            self.halt_narration(state);
        }

        state.narration_epoch += 1;
        state.speaking = true;
        let epoch = state.narration_epoch;

        let shared = Arc::clone(self);
        let language = self.language.clone();
        info!("Narration {} started ({} chars)", epoch, text.len());
        state.narration_task = Some(self.runtime.spawn(async move {
            let result = shared.narrator.speak(&text, &language).await;
            shared.finish_narration(epoch, result);
        }));
    }

    fn finish_narration(&self, epoch: u64, result: std::result::Result<(), NarrationError>) {
        {
            let mut state = self.state.lock();
            if state.narration_epoch != epoch {
                debug!("Ignoring completion of superseded narration {}", epoch);
                return;
            }
            state.speaking = false;
            state.narration_task = None;
        }

        match result {
            Ok(()) => debug!("Narration {} finished", epoch),
            Err(e) => warn!("Narration {} failed: {}", epoch, e),
        }
        self.emit(ControllerEvent::StateChanged);
    }

    /// Start narrating `text` after the configured delay.
    ///
    /// Dropped if narration was started or stopped in the meantime.
    fn schedule_narration(self: &Arc<Self>, text: String, policy: NarrationPolicy) {
        let epoch = self.state.lock().narration_epoch;
        let delay = self.narration_delay;
        let shared = Arc::clone(self);

        self.runtime.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let started = {
                let mut state = shared.state.lock();
                if state.narration_epoch != epoch {
                    debug!("Pending narration cancelled");
                    false
                } else if policy == NarrationPolicy::IfIdle && state.speaking {
                    debug!("Narration already active, not starting another");
                    false
                } else {
                    shared.start_narration(&mut state, text);
                    true
                }
            };

            if started {
                shared.emit(ControllerEvent::StateChanged);
            }
        });
    }
}

fn describe_join_error(e: JoinError) -> String {
    if e.is_panic() {
        let payload = e.into_panic();
        payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "the AI request panicked".to_string())
    } else {
        "the AI request was cancelled".to_string()
    }
}

/// State container for one conversation view
pub struct ConversationController {
    shared: Arc<Shared>,
}

impl ConversationController {
    /// Create a controller with default prompts and narration settings.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(gateway: Arc<dyn Gateway>, narrator: Arc<dyn Narrator>) -> Result<Self> {
        ControllerBuilder::new(gateway, narrator).build()
    }

    /// Load the welcome message. Call once after creation.
    pub async fn initialize(&self) -> SendOutcome {
        let shared = &self.shared;
        let Some(request) = shared.begin_request() else {
            shared.notify_busy();
            return SendOutcome::Busy;
        };
        let _loading = LoadingGuard { shared, request };
        shared.emit(ControllerEvent::StateChanged);

        info!("Loading welcome message");
        match shared.dispatch(shared.prompts.intro_prompt.clone()).await {
            Ok(text) => {
                info!("Welcome message received ({} chars)", text.len());
                shared.messages.add(Message::assistant(text.clone()));
                shared.notify(Notification::info("Welcome!", WELCOME_DURATION).with_body(text.clone()));
                shared.schedule_narration(text, NarrationPolicy::IfIdle);
                SendOutcome::Replied
            }
            Err(failure) => {
                if let DispatchFailure::Unexpected(_) = failure {
                    error!("Unexpected failure loading welcome message: {}", failure);
                }
                shared
                    .messages
                    .add(Message::assistant_error(format!("Failed to load: {}", failure)));
                shared.notify(
                    Notification::danger("Error", ERROR_DURATION)
                        .with_body(format!("Could not load the welcome message: {}", failure)),
                );
                SendOutcome::Failed
            }
        }
    }

    /// Send the current input buffer.
    ///
    /// Rejected with [`SendOutcome::Busy`] while another request is in flight;
    /// the input buffer is left untouched in that case.
    pub async fn send_message(&self) -> SendOutcome {
        self.send_input(None).await
    }

    /// Replace the input buffer with `text` and send it.
    ///
    /// The buffer is replaced and taken under one lock, so concurrent callers
    /// cannot overwrite each other's text. When busy, `text` stays in the buffer.
    pub async fn submit(&self, text: impl Into<String>) -> SendOutcome {
        self.send_input(Some(text.into())).await
    }

    async fn send_input(&self, replacement: Option<String>) -> SendOutcome {
        let shared = &self.shared;
        let replaced = replacement.is_some();

        let (request, text) = {
            let mut state = shared.state.lock();
            if let Some(text) = replacement {
                state.input = text;
            }
            if state.input.trim().is_empty() {
                drop(state);
                if replaced {
                    shared.emit(ControllerEvent::StateChanged);
                }
                return SendOutcome::Ignored;
            }
            if state.in_flight.is_some() {
                drop(state);
                if replaced {
                    shared.emit(ControllerEvent::StateChanged);
                }
                shared.notify_busy();
                return SendOutcome::Busy;
            }

            if shared.halt_narration(&mut state) {
                debug!("Stopped narration before sending");
            }
            let request = Uuid::new_v4();
            state.in_flight = Some(request);
            let text = std::mem::take(&mut state.input);
            shared.messages.add(Message::user(text.clone()));
            (request, text)
        };
        let _loading = LoadingGuard { shared, request };
        shared.emit(ControllerEvent::StateChanged);

        let prompt = shared.prompts.wrap_question(&text);
        debug!(request = %request, "Dispatching prompt: {}", prompt);

        match shared.dispatch(prompt).await {
            Ok(reply) => {
                debug!(request = %request, "Reply received ({} chars)", reply.len());
                shared.messages.add(Message::assistant(reply.clone()));
                shared.schedule_narration(reply, NarrationPolicy::Replace);
                SendOutcome::Replied
            }
            Err(DispatchFailure::Gateway(e)) => {
                shared
                    .messages
                    .add(Message::assistant_error(format!("Error: {}", e)));
                shared.notify(
                    Notification::danger("Communication error", ERROR_DURATION)
                        .with_body(format!("Could not get a response: {}", e)),
                );
                SendOutcome::Failed
            }
            Err(DispatchFailure::Unexpected(description)) => {
                error!(request = %request, "Unexpected error while sending: {}", description);
                shared
                    .messages
                    .add(Message::assistant_error(format!("Unexpected error: {}", description)));
                shared.notify(
                    Notification::danger("Unexpected error", ERROR_DURATION)
                        .with_body(format!("An unexpected error occurred: {}", description)),
                );
                SendOutcome::Failed
            }
        }
    }

    /// Stop narration if active, otherwise narrate the latest assistant reply.
    ///
    /// Returns whether narration is active afterwards.
    pub fn toggle_speech(&self) -> bool {
        let shared = &self.shared;
        let mut state = shared.state.lock();

        if state.speaking {
            shared.halt_narration(&mut state);
            drop(state);
            info!("Narration stopped by user");
            shared.emit(ControllerEvent::StateChanged);
            return false;
        }

        match shared.messages.last_narratable() {
            Some(message) => {
                shared.start_narration(&mut state, message.text);
                drop(state);
                shared.emit(ControllerEvent::StateChanged);
                true
            }
            None => {
                drop(state);
                shared.notify(
                    Notification::warning("Nothing to speak", NOTHING_TO_SPEAK_DURATION)
                        .with_body("There are no AI messages to play."),
                );
                false
            }
        }
    }

    /// Reset everything: log, narration, input and loading flag
    pub fn clear_conversation(&self) {
        let shared = &self.shared;
        {
            let mut state = shared.state.lock();
            shared.messages.clear();
            shared.halt_narration(&mut state);
            state.input.clear();
            state.in_flight = None;
        }
        shared.emit(ControllerEvent::StateChanged);
        shared.notify(Notification::info("Chat cleared", CLEARED_DURATION));
    }

    /// Stop any narration. Also runs on drop.
    pub fn shutdown(&self) {
        let mut state = self.shared.state.lock();
        if self.shared.halt_narration(&mut state) {
            info!("Narration stopped on shutdown");
        }
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.shared.state.lock().input = text.into();
        self.shared.emit(ControllerEvent::StateChanged);
    }

    pub fn input(&self) -> String {
        self.shared.state.lock().input.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.state.lock().in_flight.is_some()
    }

    pub fn is_speaking(&self) -> bool {
        self.shared.state.lock().speaking
    }

    pub fn messages(&self) -> Vec<Message> {
        self.shared.messages.get_all()
    }

    /// Shared read handle to the conversation log
    pub fn storage(&self) -> MessageStorage {
        self.shared.messages.clone()
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        let state = self.shared.state.lock();
        ConversationSnapshot {
            messages: self.shared.messages.get_all(),
            input: state.input.clone(),
            loading: state.in_flight.is_some(),
            speaking: state.speaking,
        }
    }

    /// Receiver for controller events.
    ///
    /// All receivers share one queue; each event goes to exactly one of them.
    pub fn subscribe(&self) -> Receiver<ControllerEvent> {
        self.shared.event_rx.clone()
    }

    /// Try to receive an event from the controller
    pub fn try_recv_event(&self) -> Option<ControllerEvent> {
        self.shared.event_rx.try_recv().ok()
    }
}

impl Drop for ConversationController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Builder for creating a controller
pub struct ControllerBuilder {
    gateway: Arc<dyn Gateway>,
    narrator: Arc<dyn Narrator>,
    prompts: PromptConfig,
    language: String,
    narration_delay: Duration,
}

impl ControllerBuilder {
    pub fn new(gateway: Arc<dyn Gateway>, narrator: Arc<dyn Narrator>) -> Self {
        let defaults = NarratorConfig::default();
        Self {
            gateway,
            narrator,
            prompts: PromptConfig::default(),
            language: DEFAULT_LANGUAGE.to_string(),
            narration_delay: defaults.start_delay(),
        }
    }

    /// Set the prompt templates
    pub fn with_prompts(mut self, prompts: PromptConfig) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set the narration language tag
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the delay before a new reply is narrated
    pub fn with_narration_delay(mut self, delay: Duration) -> Self {
        self.narration_delay = delay;
        self
    }

    /// Take language and delay from a narrator configuration
    pub fn with_narrator_config(self, config: &NarratorConfig) -> Self {
        self.with_language(config.language.clone())
            .with_narration_delay(config.start_delay())
    }

    /// Build the controller. Fails outside a Tokio runtime.
    pub fn build(self) -> Result<ConversationController> {
        let runtime = Handle::try_current()
            .map_err(|e| ChatError::ConfigError(format!("No Tokio runtime available: {}", e)))?;
        let (event_tx, event_rx) = bounded(EVENT_QUEUE_SIZE);

        Ok(ConversationController {
            shared: Arc::new(Shared {
                gateway: self.gateway,
                narrator: self.narrator,
                prompts: self.prompts,
                language: self.language,
                narration_delay: self.narration_delay,
                messages: MessageStorage::new(),
                state: Mutex::new(ControlState::default()),
                event_tx,
                event_rx,
                runtime,
            }),
        })
    }
}
