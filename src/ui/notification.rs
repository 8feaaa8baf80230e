//! Transient status notifications ("toasts")

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Warning,
    Danger,
}

impl NotificationKind {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Warning => "warning",
            NotificationKind::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    /// How long the notification stays on screen
    pub duration: Duration,
}

impl Notification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, duration: Duration) -> Self {
        Self {
            kind,
            title: title.into(),
            body: None,
            duration,
        }
    }

    pub fn info(title: impl Into<String>, duration: Duration) -> Self {
        Self::new(NotificationKind::Info, title, duration)
    }

    pub fn warning(title: impl Into<String>, duration: Duration) -> Self {
        Self::new(NotificationKind::Warning, title, duration)
    }

    pub fn danger(title: impl Into<String>, duration: Duration) -> Self {
        Self::new(NotificationKind::Danger, title, duration)
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A notification currently on screen
#[derive(Debug, Clone)]
pub struct Toast {
    pub notification: Notification,
    pub expires_at: Instant,
}

/// Notifications waiting to expire, oldest first
#[derive(Debug, Default)]
pub struct ToastQueue {
    toasts: Vec<Toast>,
}

impl ToastQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notification: Notification, now: Instant) {
        let expires_at = now + notification.duration;
        self.toasts.push(Toast {
            notification,
            expires_at,
        });
    }

    /// Drop expired toasts, returning how many were removed
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.toasts.len();
        self.toasts.retain(|t| t.expires_at > now);
        before - self.toasts.len()
    }

    pub fn visible(&self) -> &[Toast] {
        &self.toasts
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}
