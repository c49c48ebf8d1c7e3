use std::collections::VecDeque;

use strum_macros::{AsRefStr, Display};

use super::api::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// One toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    /// HTTP status behind an error notice, 0 when none.
    pub status: u16,
}

/// Outbox of toasts waiting for the UI to show them.
#[derive(Debug, Default)]
pub struct Notifications {
    queue: VecDeque<Notice>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>, status: u16) {
        let notice = Notice {
            level,
            message: message.into(),
            status,
        };
        tracing::debug!(level = %notice.level, message = %notice.message, "Notice queued");
        self.queue.push_back(notice);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Success, message, 0);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Warning, message, 0);
    }

    pub fn error(&mut self, err: &ApiError) {
        self.push(NoticeLevel::Error, err.message.clone(), err.status);
    }

    pub fn latest(&self) -> Option<&Notice> {
        self.queue.back()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Hand every queued notice to the UI, oldest first.
    pub fn drain(&mut self) -> Vec<Notice> {
        self.queue.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_in_order() {
        let mut notices = Notifications::new();
        notices.warning("Please select a group first");
        notices.error(&ApiError::new("Internal Server Error", 500));

        assert_eq!(notices.latest().map(|n| n.status), Some(500));
        let drained = notices.drain();
        assert_eq!(drained[0].level, NoticeLevel::Warning);
        assert_eq!(drained[1].level.as_ref(), "error");
        assert!(notices.is_empty());
    }
}
