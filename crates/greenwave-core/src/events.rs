//! Scheduler events and listeners
//!
//! Events go two ways: a `tokio::broadcast` channel for async subscribers,
//! and registered [`SchedulerListener`]s called synchronously on publish.
//! Slow broadcast subscribers miss events (lagged) rather than blocking the
//! publisher.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// Why an execution was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The previous execution was still running
    AlreadyRunning,
    /// The job's skip predicate asked to skip
    Predicate,
}

/// Events emitted by the scheduler
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchedulerEvent {
    /// A job was paused
    JobPaused {
        /// Job identity
        job_id: String,
    },
    /// A job was resumed
    JobResumed {
        /// Job identity
        job_id: String,
    },
    /// An invocation completed, either by running the body or by a skip
    ExecutionSucceeded {
        /// Job identity
        job_id: String,
        /// Execution identifier
        execution_id: Uuid,
        /// Instant the trigger fired for
        scheduled_at: DateTime<Utc>,
        /// Run time in milliseconds
        duration_ms: u64,
    },
    /// A job body failed
    ExecutionFailed {
        /// Job identity
        job_id: String,
        /// Execution identifier
        execution_id: Uuid,
        /// Instant the trigger fired for
        scheduled_at: DateTime<Utc>,
        /// Error description
        error: String,
    },
    /// An execution was skipped before the body ran
    ExecutionSkipped {
        /// Job identity
        job_id: String,
        /// Execution identifier
        execution_id: Uuid,
        /// Instant the trigger fired for
        scheduled_at: DateTime<Utc>,
        /// Why it was skipped
        reason: SkipReason,
    },
    /// All dispatching was paused
    SchedulerPaused,
    /// Dispatching was resumed
    SchedulerResumed,
}

impl SchedulerEvent {
    /// Job identity, for job-level events
    #[must_use]
    pub fn job_id(&self) -> Option<&str> {
        match self {
            Self::JobPaused { job_id }
            | Self::JobResumed { job_id }
            | Self::ExecutionSucceeded { job_id, .. }
            | Self::ExecutionFailed { job_id, .. }
            | Self::ExecutionSkipped { job_id, .. } => Some(job_id),
            Self::SchedulerPaused | Self::SchedulerResumed => None,
        }
    }
}

/// Observer of scheduler events
///
/// Called on the publishing task; implementations should return quickly.
pub trait SchedulerListener: Send + Sync {
    /// Handle one event
    fn on_event(&self, event: &SchedulerEvent);
}

impl<F> SchedulerListener for F
where
    F: Fn(&SchedulerEvent) + Send + Sync,
{
    fn on_event(&self, event: &SchedulerEvent) {
        self(event)
    }
}

/// Handle returned by listener registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Broadcast channel plus listener registry
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SchedulerEvent>,
    listeners: Arc<DashMap<ListenerId, Arc<dyn SchedulerListener>>>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            listeners: Arc::new(DashMap::new()),
        }
    }

    /// Subscribe to all future events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.sender.subscribe()
    }

    /// Register a listener
    pub fn add_listener(&self, listener: Arc<dyn SchedulerListener>) -> ListenerId {
        let id = ListenerId::new();
        self.listeners.insert(id, listener);
        debug!(listener_id = %id, "Listener added");
        id
    }

    /// Remove a listener; returns whether it was registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    /// Number of registered listeners
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Publish an event to listeners and subscribers
    ///
    /// Returns the number of broadcast subscribers that received it.
    pub fn publish(&self, event: SchedulerEvent) -> usize {
        // Collect first so no shard lock is held while listeners run.
        let listeners: Vec<Arc<dyn SchedulerListener>> =
            self.listeners.iter().map(|entry| entry.value().clone()).collect();
        for listener in listeners {
            listener.on_event(&event);
        }
        self.sender.send(event).unwrap_or(0)
    }

    /// Number of broadcast subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.sender.receiver_count())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
