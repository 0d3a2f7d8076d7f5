//! State-change events for presentation layers.
//!
//! Components publish onto a broadcast channel instead of mutating shared UI
//! state in place. Subscribers that fall behind lose the oldest events, which
//! is acceptable for display purposes.

use tokio::sync::broadcast;

use crate::domain::lead::{Lead, LeadId};

const DEFAULT_CAPACITY: usize = 256;

/// A state change worth rendering.
#[derive(Debug, Clone)]
pub enum Event {
    /// The lead collection changed (import, manual add, removal).
    LeadsChanged,
    /// The call ledger changed (append or clear).
    LedgerChanged,
    /// A dispatch attempt started; the lead is now `calling`.
    CallStarted { lead_id: LeadId },
    /// A dispatch attempt succeeded and was ledgered.
    CallSucceeded { lead_id: LeadId, call_id: String },
    /// A dispatch attempt failed; `exhausted` means the retry budget is spent.
    CallFailed {
        lead_id: LeadId,
        retry_count: u32,
        exhausted: bool,
    },
    /// Bulk run progress, published after each dispatch.
    RunProgress {
        current: usize,
        total: usize,
        lead: Box<Lead>,
    },
    /// A bulk run finished, normally or via cancellation.
    RunFinished { processed: usize, cancelled: bool },
}

/// Broadcast channel for [`Event`]s.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Publish an event. Send errors (no subscribers) are ignored.
    pub fn emit(&self, event: Event) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_emitted_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.emit(Event::LeadsChanged);
        assert!(matches!(rx.recv().await.unwrap(), Event::LeadsChanged));
    }

    #[tokio::test]
    async fn emitting_without_subscribers_is_a_no_op() {
        let bus = EventBus::default();
        bus.emit(Event::LedgerChanged);
    }
}
