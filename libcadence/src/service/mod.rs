//! Service layer for Cadence
//!
//! `CadenceService` is the single entry point shared by the REST server, the
//! sweep daemon and the queue CLI. It owns the database handle, the
//! publisher and the event bus, and hands out the specialized services:
//!
//! - [`Scheduler`]: creates single posts and multi-account batches
//! - [`SyncEngine`]: push, update, delete and publish against the
//!   publishing service, plus the retry sweep
//! - [`CalendarService`]: range queries, listing, reschedule and cancel
//! - [`AnalyticsService`]: metrics pulls for published posts
//!
//! # Example
//!
//! ```no_run
//! use chrono::{Duration, Utc};
//! use libcadence::service::scheduler::ScheduleSingle;
//! use libcadence::service::CadenceService;
//!
//! # async fn example() -> libcadence::Result<()> {
//! let service = CadenceService::new().await?;
//!
//! let post = service
//!     .scheduler()
//!     .schedule_single(ScheduleSingle::new("content-1", "account-1", Utc::now() + Duration::hours(2)))
//!     .await?;
//! println!("{} is {}", post.id, post.status);
//! # Ok(())
//! # }
//! ```

pub mod analytics;
pub mod calendar;
pub mod events;
pub mod scheduler;
pub mod sync;

use std::sync::Arc;
use std::time::Duration;

use self::analytics::AnalyticsService;
use self::calendar::CalendarService;
use self::events::EventBus;
use self::scheduler::Scheduler;
use self::sync::SyncEngine;
use crate::config::{resolve_db_path, Config};
use crate::db::Database;
use crate::error::{ConfigError, Result};
use crate::publisher::http::HttpPublisher;
use crate::publisher::Publisher;

#[derive(Clone)]
pub struct CadenceService {
    db: Arc<Database>,
    config: Arc<Config>,
    scheduler: Scheduler,
    sync: SyncEngine,
    calendar: CalendarService,
    analytics: AnalyticsService,
    event_bus: EventBus,
}

impl CadenceService {
    /// Create a service from the configuration file at the default location
    pub async fn new() -> Result<Self> {
        let config = Config::load()?;
        Self::from_config(config).await
    }

    /// Create a service talking to the real publishing service
    pub async fn from_config(config: Config) -> Result<Self> {
        let publisher = HttpPublisher::from_config(&config.publisher)?;
        Self::with_publisher(config, Arc::new(publisher)).await
    }

    /// Create a service with a custom publisher, opening the configured database
    pub async fn with_publisher(config: Config, publisher: Arc<dyn Publisher>) -> Result<Self> {
        let db_path = resolve_db_path(&config.database.path);
        let db_path_str = db_path.to_str().ok_or_else(|| ConfigError::InvalidValue {
            field: "database.path".to_string(),
            reason: "path is not valid UTF-8".to_string(),
        })?;
        let db = Database::new(db_path_str).await?;

        Ok(Self::from_parts(config, db, publisher))
    }

    /// Assemble a service around an already opened database
    pub fn from_parts(config: Config, db: Database, publisher: Arc<dyn Publisher>) -> Self {
        let db = Arc::new(db);
        let timeout = Duration::from_secs(config.publisher.timeout_secs);
        let config = Arc::new(config);
        let event_bus = EventBus::new(100);

        let sync = SyncEngine::new(
            Arc::clone(&db),
            Arc::clone(&publisher),
            event_bus.clone(),
            timeout,
        );
        let scheduler = Scheduler::new(Arc::clone(&db), sync.clone(), event_bus.clone());
        let calendar = CalendarService::new(Arc::clone(&db), sync.clone(), event_bus.clone());
        let analytics = AnalyticsService::new(Arc::clone(&db), publisher, event_bus.clone(), timeout);

        Self {
            db,
            config,
            scheduler,
            sync,
            calendar,
            analytics,
            event_bus,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Batch coordinator
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Synchronization engine and retry sweep
    pub fn sync(&self) -> &SyncEngine {
        &self.sync
    }

    pub fn calendar(&self) -> &CalendarService {
        &self.calendar
    }

    pub fn analytics(&self) -> &AnalyticsService {
        &self.analytics
    }

    /// Receive every event emitted after this call
    pub fn subscribe(&self) -> events::EventReceiver {
        self.event_bus.subscribe()
    }
}
