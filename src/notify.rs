//! Bounded queue of transient operator notifications.
//!
//! Replaces timer-callback toasts with an explicit queue: entries carry an
//! expiry timestamp and are dropped when [`NotificationQueue::advance`] is
//! called with a later clock reading. The queue is bounded; pushing onto a
//! full queue evicts the oldest entry.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

const DEFAULT_CAPACITY: usize = 16;
const DEFAULT_TTL_SECONDS: i64 = 5;

/// Visual weight of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

/// One transient message for the operator.
#[derive(Debug, Clone)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub severity: Severity,
    pub expires_at: DateTime<Utc>,
}

/// Bounded, expiry-aware notification queue.
///
/// The queue never owns a timer: callers advance it with an external clock
/// reading before displaying its contents.
pub struct NotificationQueue {
    items: VecDeque<Notification>,
    capacity: usize,
    ttl: Duration,
}

impl NotificationQueue {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            ttl,
        }
    }

    /// Enqueue a notification expiring `ttl` after `now`.
    pub fn push(
        &mut self,
        now: DateTime<Utc>,
        title: impl Into<String>,
        body: impl Into<String>,
        severity: Severity,
    ) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(Notification {
            title: title.into(),
            body: body.into(),
            severity,
            expires_at: now + self.ttl,
        });
    }

    /// Drop every entry whose expiry is at or before `now`.
    pub fn advance(&mut self, now: DateTime<Utc>) {
        self.items.retain(|item| item.expires_at > now);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, Duration::seconds(DEFAULT_TTL_SECONDS))
    }
}
