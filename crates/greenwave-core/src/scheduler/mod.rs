//! Scheduler: job registry, timer loop, worker pool and control surface
//!
//! ```text
//! tick ──▶ ScheduledTask::evaluate ──(fire)──▶ worker permit ──▶ invoker chain
//!                 │                                               │
//!              Trigger                                      SchedulerEvent
//! ```

mod builder;
mod engine;
mod task;

pub use builder::JobBuilder;
pub use engine::CarbonAwareScheduler;
pub use task::{ScheduledTask, TriggerSnapshot};
