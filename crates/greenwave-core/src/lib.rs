//! Greenwave Core - Carbon-Aware Scheduling Engine
//!
//! This crate decides when jobs run so that they land in the periods of
//! lowest grid carbon intensity, including:
//! - Intensity: Forecast model, slot scoring, caching and provider fallback
//! - Jobs: Declarative descriptors, expression parsing and validation
//! - Planning: Greenest start inside a fixed daily window or a successive gap
//! - Triggers: Interval, cron, fixed-window and successive firing rules
//! - Invokers: Skip predicates, overlap protection, instrumentation and status events
//! - Scheduler: Timer loop, worker pool, pause/resume and graceful shutdown

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod intensity;
pub mod invoker;
pub mod job;
pub mod planner;
pub mod scheduler;
pub mod trigger;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{CacheConfig, SchedulerConfig, StartMode};
pub use error::{Result, SchedulerError};
pub use events::{EventBus, ListenerId, SchedulerEvent, SchedulerListener, SkipReason};
pub use intensity::{
    CarbonIntensity, CarbonIntensityApi, CarbonIntensityCache, CarbonIntensityFetcher,
    CarbonIntensityPeriod, SingleJobStrategy, Timeslot, ZonedPeriod,
};
pub use invoker::{
    InvocationOutcome, Invoker, JobContext, JobInstrumenter, ScheduledExecution,
    TracingInstrumenter,
};
pub use job::{job_fn, ConcurrencyPolicy, JobDefinition, JobDescriptor, JobFn, SkipPredicate};
pub use planner::{FixedWindowPlanner, Planner, SuccessivePlanner};
pub use scheduler::{CarbonAwareScheduler, JobBuilder, ScheduledTask, TriggerSnapshot};
pub use trigger::{Trigger, TriggerKind};
