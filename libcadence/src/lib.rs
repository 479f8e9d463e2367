//! Cadence - scheduling and sync engine for social posts
//!
//! This library tracks content scheduled to connected social accounts,
//! keeps each post in step with an external publishing service and answers
//! calendar queries over the result.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod publisher;
pub mod scheduling;
pub mod service;
pub mod state;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use db::{Database, PostFilter};
pub use error::{CadenceError, PublisherError, Result};
pub use service::CadenceService;
pub use state::{PostStatus, Trigger};
pub use types::{
    ConnectedAccount, ContentReference, MediaItem, MediaType, Platform, PostAnalytics,
    RemoteStatus, ScheduleMode, ScheduledPost,
};
