//! Presentation layer
//!
//! Everything here is a caller of the conversation controller.

pub mod notification;
pub mod state;
pub mod terminal;

pub use notification::{Notification, NotificationKind, Toast, ToastQueue};
pub use state::ChatView;
pub use terminal::{ReplCommand, TerminalRenderer};
