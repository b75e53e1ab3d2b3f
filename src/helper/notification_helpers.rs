use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use crate::models::{Notification, NotificationKind};

/// Oldest notifications are dropped once this many are waiting.
pub const MAX_QUEUED_NOTIFICATIONS: usize = 20;

/// Longer messages are cut; some echo client input such as a content type.
pub const MAX_MESSAGE_CHARS: usize = 240;

fn clip(message: String) -> String {
    if message.chars().count() <= MAX_MESSAGE_CHARS {
        return message;
    }
    let mut clipped: String = message.chars().take(MAX_MESSAGE_CHARS - 3).collect();
    clipped.push_str("...");
    clipped
}

/// Pending back-office notifications, oldest first.
///
/// Only the first `max_visible` entries are shown at once; the rest wait
/// until something in front of them is dismissed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationQueue {
    next_id: u64,
    items: VecDeque<Notification>,
}

impl NotificationQueue {
    pub fn enqueue(&mut self, kind: NotificationKind, message: impl Into<String>) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.items.push_back(Notification {
            id,
            message: clip(message.into()),
            r#type: kind,
        });
        while self.items.len() > MAX_QUEUED_NOTIFICATIONS {
            self.items.pop_front();
        }
        id
    }

    pub fn success(&mut self, message: impl Into<String>) -> u64 {
        self.enqueue(NotificationKind::Success, message)
    }

    pub fn error(&mut self, message: impl Into<String>) -> u64 {
        self.enqueue(NotificationKind::Error, message)
    }

    /// Returns whether a notification with `id` was waiting.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }

    pub fn visible(&self, max_visible: usize) -> Vec<&Notification> {
        self.items.iter().take(max_visible).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn last(&self) -> Option<&Notification> {
        self.items.back()
    }
}

/// Notification queues kept server-side, one per account. Lost on restart.
#[derive(Default)]
pub struct NotificationStore {
    queues: RwLock<HashMap<String, NotificationQueue>>,
}

impl NotificationStore {
    pub fn load(&self, owner: &str) -> NotificationQueue {
        let queues = self.queues.read().unwrap_or_else(|poisoned| {
            log::error!("RwLock for notifications was poisoned! Using stale data.");
            poisoned.into_inner()
        });
        queues.get(&owner.to_lowercase()).cloned().unwrap_or_default()
    }

    pub fn save(&self, owner: &str, queue: NotificationQueue) {
        let mut queues = self.queues.write().unwrap_or_else(|poisoned| {
            log::error!("RwLock for notifications was poisoned during save! Recovering lock.");
            poisoned.into_inner()
        });
        if queue.is_empty() {
            queues.remove(&owner.to_lowercase());
        } else {
            queues.insert(owner.to_lowercase(), queue);
        }
    }

    /// Load, enqueue, save. For handlers that raise a single notification.
    pub fn notify(&self, owner: &str, kind: NotificationKind, message: &str) -> u64 {
        let mut queue = self.load(owner);
        let id = queue.enqueue(kind, message);
        self.save(owner, queue);
        id
    }

    pub fn dismiss(&self, owner: &str, id: u64) -> bool {
        let mut queue = self.load(owner);
        let dismissed = queue.dismiss(id);
        if dismissed {
            self.save(owner, queue);
        }
        dismissed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_oldest_few_are_visible() {
        let mut queue = NotificationQueue::default();
        let first = queue.success("one");
        queue.error("two");
        queue.success("three");
        queue.success("four");

        let shown: Vec<&str> = queue.visible(3).iter().map(|n| n.message.as_str()).collect();
        assert_eq!(shown, vec!["one", "two", "three"]);

        assert!(queue.dismiss(first));
        let shown: Vec<&str> = queue.visible(3).iter().map(|n| n.message.as_str()).collect();
        assert_eq!(shown, vec!["two", "three", "four"]);
    }

    #[test]
    fn dismissing_unknown_id_changes_nothing() {
        let mut queue = NotificationQueue::default();
        queue.success("saved");
        assert!(!queue.dismiss(99));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn ids_stay_unique_after_dismissal() {
        let mut queue = NotificationQueue::default();
        let a = queue.success("a");
        queue.dismiss(a);
        let b = queue.success("b");
        assert_ne!(a, b);
    }

    #[test]
    fn queue_is_capped() {
        let mut queue = NotificationQueue::default();
        for i in 0..(MAX_QUEUED_NOTIFICATIONS + 5) {
            queue.error(format!("failure {}", i));
        }
        assert_eq!(queue.len(), MAX_QUEUED_NOTIFICATIONS);
        assert_eq!(queue.visible(1)[0].message, "failure 5");
    }

    #[test]
    fn long_messages_are_clipped() {
        let mut queue = NotificationQueue::default();
        let content_type = format!("application/{}", "x".repeat(4000));
        queue.error(format!("Banner image must be an image, got '{}'.", content_type));
        let message = &queue.last().unwrap().message;
        assert_eq!(message.chars().count(), MAX_MESSAGE_CHARS);
        assert!(message.ends_with("..."));
    }

    #[test]
    fn store_keeps_one_bounded_queue_per_account() {
        let store = NotificationStore::default();
        let long = "Banner image must be an image, got 'application/vnd.openxmlformats-officedocument.wordprocessingml.document'.";
        for _ in 0..(MAX_QUEUED_NOTIFICATIONS * 3) {
            store.notify("Admin@Example.org", NotificationKind::Error, long);
        }
        let queue = store.load("admin@example.org");
        assert_eq!(queue.len(), MAX_QUEUED_NOTIFICATIONS);
        let total: usize = queue.visible(MAX_QUEUED_NOTIFICATIONS).iter().map(|n| n.message.len()).sum();
        assert!(total <= MAX_QUEUED_NOTIFICATIONS * MAX_MESSAGE_CHARS);
        assert!(store.load("editor@example.org").is_empty());

        let first = queue.visible(1)[0].id;
        assert!(store.dismiss("admin@example.org", first));
        assert!(!store.dismiss("admin@example.org", first));
        assert_eq!(store.load("admin@example.org").len(), MAX_QUEUED_NOTIFICATIONS - 1);
    }
}
