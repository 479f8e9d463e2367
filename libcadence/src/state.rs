//! Scheduled post lifecycle
//!
//! Every status change a post goes through is decided here. Services never
//! compare statuses themselves; they ask [`PostStatus::apply`] for the next
//! status and persist whatever it returns.
//!
//! ```text
//! (none)        --create, sync now-->     PENDING_SYNC
//! (none)        --create, deferred-->     DRAFT
//! PENDING_SYNC  --sync ok-->              SCHEDULED
//! PENDING_SYNC  --sync failed-->          FAILED
//! SCHEDULED     --reschedule-->           PENDING_SYNC
//! FAILED        --reschedule | requeue--> PENDING_SYNC
//! DRAFT | PENDING_SYNC | SCHEDULED | FAILED --cancel-->      CANCELLED
//! DRAFT | PENDING_SYNC | SCHEDULED | FAILED --publish now--> PUBLISHING
//! PUBLISHING    --publish ok-->           PUBLISHED
//! PUBLISHING    --publish failed-->       FAILED
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CadenceError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    PendingSync,
    Scheduled,
    Publishing,
    Published,
    Failed,
    Cancelled,
}

/// Events that can move a post between statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The publishing service accepted a create or update
    SyncSucceeded,
    /// The publishing service call failed, or the post could not be built
    SyncFailed,
    /// New time or timezone requested
    Reschedule,
    /// Operator asks for a failed post to be retried by the sweep
    Requeue,
    Cancel,
    PublishNow,
    PublishSucceeded,
    PublishFailed,
}

impl PostStatus {
    pub const ALL: [PostStatus; 7] = [
        PostStatus::Draft,
        PostStatus::PendingSync,
        PostStatus::Scheduled,
        PostStatus::Publishing,
        PostStatus::Published,
        PostStatus::Failed,
        PostStatus::Cancelled,
    ];

    /// Status for a freshly created post
    pub fn initial(sync_on_create: bool) -> Self {
        if sync_on_create {
            PostStatus::PendingSync
        } else {
            PostStatus::Draft
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PostStatus::Published | PostStatus::Cancelled)
    }

    /// Compute the status reached from `self` on `trigger`.
    ///
    /// Returns `CadenceError::Conflict` for any pair that is not an edge of
    /// the lifecycle graph. Terminal statuses reject every trigger.
    pub fn apply(self, trigger: Trigger) -> Result<PostStatus> {
        use PostStatus::*;
        use Trigger::*;

        let next = match (self, trigger) {
            (Published, _) | (Cancelled, _) => None,

            (PendingSync, SyncSucceeded) => Some(Scheduled),
            (PendingSync, SyncFailed) => Some(Failed),

            (Scheduled, Reschedule) => Some(PendingSync),
            (Draft, Reschedule) => Some(Draft),
            (PendingSync, Reschedule) => Some(PendingSync),
            (Failed, Reschedule) => Some(PendingSync),
            (Failed, Requeue) => Some(PendingSync),

            (Draft | PendingSync | Scheduled | Failed, Cancel) => Some(Cancelled),
            (Draft | PendingSync | Scheduled | Failed, PublishNow) => Some(Publishing),
            // An interrupted publish is resumed by publishing again
            (Publishing, PublishNow) => Some(Publishing),

            (Publishing, PublishSucceeded) => Some(Published),
            (Publishing, PublishFailed) => Some(Failed),

            _ => None,
        };

        next.ok_or_else(|| {
            CadenceError::Conflict(format!(
                "cannot {} a post that is {}",
                trigger.verb(),
                self
            ))
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::PendingSync => "pending_sync",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Publishing => "publishing",
            PostStatus::Published => "published",
            PostStatus::Failed => "failed",
            PostStatus::Cancelled => "cancelled",
        }
    }
}

impl Trigger {
    fn verb(self) -> &'static str {
        match self {
            Trigger::SyncSucceeded | Trigger::SyncFailed => "sync",
            Trigger::Reschedule => "reschedule",
            Trigger::Requeue => "requeue",
            Trigger::Cancel => "cancel",
            Trigger::PublishNow => "publish",
            Trigger::PublishSucceeded | Trigger::PublishFailed => "complete publishing of",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(PostStatus::Draft),
            "pending_sync" => Ok(PostStatus::PendingSync),
            "scheduled" => Ok(PostStatus::Scheduled),
            "publishing" => Ok(PostStatus::Publishing),
            "published" => Ok(PostStatus::Published),
            "failed" => Ok(PostStatus::Failed),
            "cancelled" => Ok(PostStatus::Cancelled),
            other => Err(CadenceError::Validation(format!(
                "Unknown post status: '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PostStatus::*;

    const TRIGGERS: [Trigger; 8] = [
        Trigger::SyncSucceeded,
        Trigger::SyncFailed,
        Trigger::Reschedule,
        Trigger::Requeue,
        Trigger::Cancel,
        Trigger::PublishNow,
        Trigger::PublishSucceeded,
        Trigger::PublishFailed,
    ];

    /// Status changes (self-loops excluded) the lifecycle permits.
    fn edges() -> Vec<(PostStatus, PostStatus)> {
        vec![
            (PendingSync, Scheduled),
            (PendingSync, Failed),
            (Scheduled, PendingSync),
            (Failed, PendingSync),
            (Draft, Cancelled),
            (PendingSync, Cancelled),
            (Scheduled, Cancelled),
            (Failed, Cancelled),
            (Draft, Publishing),
            (PendingSync, Publishing),
            (Scheduled, Publishing),
            (Failed, Publishing),
            (Publishing, Published),
            (Publishing, Failed),
        ]
    }

    #[test]
    fn test_initial_status() {
        assert_eq!(PostStatus::initial(true), PendingSync);
        assert_eq!(PostStatus::initial(false), Draft);
    }

    #[test]
    fn test_every_transition_is_a_known_edge() {
        let edges = edges();
        for from in PostStatus::ALL {
            for trigger in TRIGGERS {
                if let Ok(to) = from.apply(trigger) {
                    assert!(
                        to == from || edges.contains(&(from, to)),
                        "{:?} --{:?}--> {:?} is not in the lifecycle graph",
                        from,
                        trigger,
                        to
                    );
                }
            }
        }
    }

    #[test]
    fn test_every_edge_is_reachable() {
        for (from, to) in edges() {
            let reachable = TRIGGERS
                .iter()
                .any(|t| from.apply(*t).map(|s| s == to).unwrap_or(false));
            assert!(reachable, "{:?} -> {:?} has no trigger", from, to);
        }
    }

    #[test]
    fn test_terminal_statuses_reject_everything() {
        for status in [Published, Cancelled] {
            assert!(status.is_terminal());
            for trigger in TRIGGERS {
                let err = status.apply(trigger).unwrap_err();
                assert!(matches!(err, CadenceError::Conflict(_)));
            }
        }
    }

    #[test]
    fn test_reschedule_semantics() {
        assert_eq!(Scheduled.apply(Trigger::Reschedule).unwrap(), PendingSync);
        assert_eq!(Draft.apply(Trigger::Reschedule).unwrap(), Draft);
        assert_eq!(PendingSync.apply(Trigger::Reschedule).unwrap(), PendingSync);
        assert_eq!(Failed.apply(Trigger::Reschedule).unwrap(), PendingSync);
        assert!(Publishing.apply(Trigger::Reschedule).is_err());
    }

    #[test]
    fn test_publishing_only_accepts_another_publish() {
        for trigger in [Trigger::Cancel, Trigger::Reschedule, Trigger::Requeue] {
            assert!(Publishing.apply(trigger).is_err());
        }
        assert_eq!(Publishing.apply(Trigger::PublishNow).unwrap(), Publishing);
    }

    #[test]
    fn test_requeue_only_from_failed() {
        assert_eq!(Failed.apply(Trigger::Requeue).unwrap(), PendingSync);
        for status in [Draft, PendingSync, Scheduled, Publishing] {
            assert!(status.apply(Trigger::Requeue).is_err());
        }
    }

    #[test]
    fn test_sync_outcome_requires_pending_sync() {
        for status in [Draft, Scheduled, Failed, Publishing] {
            assert!(status.apply(Trigger::SyncSucceeded).is_err());
            assert!(status.apply(Trigger::SyncFailed).is_err());
        }
    }

    #[test]
    fn test_conflict_message_names_status() {
        let err = Published.apply(Trigger::Cancel).unwrap_err();
        assert_eq!(err.to_string(), "Conflict: cannot cancel a post that is published");
    }

    #[test]
    fn test_status_string_conversion() {
        for status in PostStatus::ALL {
            assert_eq!(status.as_str().parse::<PostStatus>().unwrap(), status);
        }
        assert!("posted".parse::<PostStatus>().is_err());
    }
}
