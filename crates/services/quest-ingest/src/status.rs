//! Text message status tracking
//!
//! Messages start as `sent` and are moved to `delivered` / `read` by
//! confirmation requests. Any status may be set at any time; backward
//! transitions are accepted and only flagged in the log.

use serde::Serialize;

use crate::error::{IngestError, Result};
use crate::history::BoundedHistory;
use crate::model::{MessageStatus, TextMessage};

/// Result of a status update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusTransition {
    pub message_id: String,
    pub previous: MessageStatus,
    pub current: MessageStatus,
}

impl StatusTransition {
    /// True when the status was already the requested one
    pub fn is_noop(&self) -> bool {
        self.previous == self.current
    }

    /// True when the new status precedes the old one (e.g. `read` -> `sent`)
    pub fn is_backward(&self) -> bool {
        self.current < self.previous
    }
}

/// Applies status updates to messages held in the text history
pub struct StatusTracker<'a> {
    history: &'a BoundedHistory<TextMessage>,
}

impl<'a> StatusTracker<'a> {
    pub fn new(history: &'a BoundedHistory<TextMessage>) -> Self {
        Self { history }
    }

    /// Set the status of `message_id`
    ///
    /// Returns [`IngestError::NotFound`] if the message was never created or
    /// has already been evicted from the history window.
    pub fn update_status(
        &self,
        message_id: &str,
        new_status: MessageStatus,
    ) -> Result<StatusTransition> {
        let previous = self
            .history
            .update_by_id(message_id, |message| {
                std::mem::replace(&mut message.status, new_status)
            })
            .ok_or_else(|| {
                tracing::warn!(message_id = %message_id, "Message not found");
                IngestError::NotFound(message_id.to_string())
            })?;

        let transition = StatusTransition {
            message_id: message_id.to_string(),
            previous,
            current: new_status,
        };

        if transition.is_noop() {
            tracing::debug!(message_id = %message_id, status = %new_status, "Message status unchanged");
        } else if transition.is_backward() {
            tracing::warn!(
                message_id = %message_id,
                from = %previous,
                to = %new_status,
                "Message status moved backward"
            );
        } else {
            tracing::info!(
                message_id = %message_id,
                from = %previous,
                to = %new_status,
                "Updated message status"
            );
        }

        Ok(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{message_id_for, StreamKind};

    fn history_with(count: u64, capacity: usize) -> BoundedHistory<TextMessage> {
        let history = BoundedHistory::new(StreamKind::Text, capacity);
        for _ in 0..count {
            history.append_with(|seq| TextMessage {
                timestamp: "2025-01-01T00:00:00Z".to_string(),
                message_id: message_id_for(seq),
                content: "hello".to_string(),
                status: MessageStatus::Sent,
            });
        }
        history
    }

    #[test]
    fn test_sent_delivered_read() {
        let history = history_with(1, 10);
        let tracker = StatusTracker::new(&history);

        let delivered = tracker
            .update_status("msg_000000", MessageStatus::Delivered)
            .unwrap();
        assert_eq!(delivered.previous, MessageStatus::Sent);
        assert_eq!(delivered.current, MessageStatus::Delivered);

        let read = tracker.update_status("msg_000000", MessageStatus::Read).unwrap();
        assert_eq!(read.previous, MessageStatus::Delivered);
        assert_eq!(
            history.find_by_id("msg_000000").unwrap().status,
            MessageStatus::Read
        );
    }

    #[test]
    fn test_same_status_twice_is_idempotent() {
        let history = history_with(1, 10);
        let tracker = StatusTracker::new(&history);

        let first = tracker
            .update_status("msg_000000", MessageStatus::Delivered)
            .unwrap();
        let second = tracker
            .update_status("msg_000000", MessageStatus::Delivered)
            .unwrap();

        assert!(!first.is_noop());
        assert!(second.is_noop());
        assert_eq!(
            history.find_by_id("msg_000000").unwrap().status,
            MessageStatus::Delivered
        );
    }

    #[test]
    fn test_backward_transition_allowed() {
        let history = history_with(1, 10);
        let tracker = StatusTracker::new(&history);

        tracker.update_status("msg_000000", MessageStatus::Read).unwrap();
        let back = tracker.update_status("msg_000000", MessageStatus::Sent).unwrap();

        assert!(back.is_backward());
        assert_eq!(
            history.find_by_id("msg_000000").unwrap().status,
            MessageStatus::Sent
        );
    }

    #[test]
    fn test_unknown_message_is_not_found() {
        let history = history_with(1, 10);
        let tracker = StatusTracker::new(&history);

        let result = tracker.update_status("msg_999999", MessageStatus::Read);
        assert!(matches!(result, Err(IngestError::NotFound(id)) if id == "msg_999999"));
    }

    #[test]
    fn test_evicted_message_is_not_found() {
        let history = history_with(3, 2);
        let tracker = StatusTracker::new(&history);

        assert!(matches!(
            tracker.update_status("msg_000000", MessageStatus::Delivered),
            Err(IngestError::NotFound(_))
        ));
        assert!(tracker
            .update_status("msg_000002", MessageStatus::Delivered)
            .is_ok());
    }
}
