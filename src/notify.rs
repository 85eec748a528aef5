//! Outward-facing notification collaborators
//!
//! State transitions report themselves through [`Notifier`]: a plain-string
//! screen-reader announcement and an optional transient toast. Rendering
//! either is the host's concern.

use std::cell::RefCell;
use tracing::info;

pub trait Notifier {
    /// Polite live-region announcement
    fn announce(&self, message: &str);

    /// Transient notification with an optional description
    fn toast(&self, title: &str, description: Option<&str>);
}

/// Routes notifications to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn announce(&self, message: &str) {
        info!(message = %message, "Announce");
    }

    fn toast(&self, title: &str, description: Option<&str>) {
        info!(title = %title, description = description.unwrap_or(""), "Toast");
    }
}

/// Notification captured by [`RecordingNotifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Announce(String),
    Toast {
        title: String,
        description: Option<String>,
    },
}

/// Keeps every notification in order; useful for hosts that batch output
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: RefCell<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain recorded notifications
    pub fn take(&self) -> Vec<Notice> {
        self.notices.take()
    }

    pub fn announcements(&self) -> Vec<String> {
        self.notices
            .borrow()
            .iter()
            .filter_map(|n| match n {
                Notice::Announce(m) => Some(m.clone()),
                Notice::Toast { .. } => None,
            })
            .collect()
    }

    pub fn toast_count(&self) -> usize {
        self.notices
            .borrow()
            .iter()
            .filter(|n| matches!(n, Notice::Toast { .. }))
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn announce(&self, message: &str) {
        self.notices.borrow_mut().push(Notice::Announce(message.to_string()));
    }

    fn toast(&self, title: &str, description: Option<&str>) {
        self.notices.borrow_mut().push(Notice::Toast {
            title: title.to_string(),
            description: description.map(str::to_string),
        });
    }
}

impl<N: Notifier + ?Sized> Notifier for std::rc::Rc<N> {
    fn announce(&self, message: &str) {
        (**self).announce(message)
    }

    fn toast(&self, title: &str, description: Option<&str>) {
        (**self).toast(title, description)
    }
}
