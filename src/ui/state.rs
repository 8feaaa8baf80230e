//! Presentation state
//!
//! Mirrors the controller through its event queue and keeps transient
//! notifications on screen for their display duration.

use crate::integration::{ControllerEvent, ConversationController, ConversationSnapshot};
use crate::ui::notification::{Notification, ToastQueue};
use crossbeam_channel::Receiver;
use std::time::Instant;

/// What a front end renders from
pub struct ChatView {
    /// Last committed controller state
    pub snapshot: ConversationSnapshot,

    /// Notifications currently on screen
    pub toasts: ToastQueue,

    events: Receiver<ControllerEvent>,
}

impl ChatView {
    pub fn new(controller: &ConversationController) -> Self {
        Self {
            snapshot: controller.snapshot(),
            toasts: ToastQueue::new(),
            events: controller.subscribe(),
        }
    }

    /// Process pending controller events.
    ///
    /// Returns the notifications that arrived since the last poll.
    pub fn poll_events(&mut self, controller: &ConversationController) -> Vec<Notification> {
        let now = Instant::now();
        let mut dirty = false;
        let mut arrived = Vec::new();

        while let Ok(event) = self.events.try_recv() {
            match event {
                ControllerEvent::StateChanged => dirty = true,
                ControllerEvent::Notification(notification) => {
                    self.toasts.push(notification.clone(), now);
                    arrived.push(notification);
                }
            }
        }

        if dirty {
            self.snapshot = controller.snapshot();
        }
        self.toasts.prune(now);

        arrived
    }

    /// Whether the send action should be enabled
    pub fn can_send(&self) -> bool {
        !self.snapshot.loading && !self.snapshot.input.trim().is_empty()
    }
}
