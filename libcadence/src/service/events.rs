//! In-process event bus
//!
//! Services announce what happened to posts over a `tokio::sync::broadcast`
//! channel. Emitting never blocks: with no subscribers the event is dropped,
//! and a lagging subscriber loses the oldest events rather than slowing the
//! emitter down. The server logs these; tests use them to observe the sweep.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::db::PostChange;
use crate::state::PostStatus;

/// Event receiver type alias
pub type EventReceiver = broadcast::Receiver<Event>;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: Event) {
        // Err only means nobody is listening
        let _ = self.sender.send(event);
    }

    /// Emit `PostTransitioned` if `change` moved the post to a new status
    pub fn emit_change(&self, change: &PostChange) {
        if change.status_changed() {
            self.emit(Event::PostTransitioned {
                post_id: change.after.id.clone(),
                from: change.before.status,
                to: change.after.status,
            });
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    PostCreated {
        post_id: String,
        batch_id: Option<String>,
    },

    PostTransitioned {
        post_id: String,
        from: PostStatus,
        to: PostStatus,
    },

    /// The post was cancelled locally but the publishing service may still
    /// hold a booking for it
    RemoteDeleteFailed {
        post_id: String,
        remote_post_id: String,
        error: String,
    },

    SweepCompleted {
        synced: usize,
        failed: usize,
    },

    AnalyticsSynced {
        post_id: String,
    },
}
