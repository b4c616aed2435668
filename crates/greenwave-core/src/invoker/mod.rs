//! Invocation chain wrapped around a job body
//!
//! ```text
//! StatusEmitter ─▶ SkipConcurrent? ─▶ SkipPredicate? ─▶ Instrumented? ─▶ TaskInvoker
//! ```
//!
//! Optional layers are only present when configured. The chain is built once
//! per job at registration and never changes afterwards.

mod instrument;
mod skip;
mod status;

pub use instrument::{JobContext, JobInstrumenter, TracingInstrumenter};
pub use skip::{SkipConcurrentInvoker, SkipPredicateInvoker};
pub use status::StatusEmitter;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::events::EventBus;
use crate::job::{ConcurrencyPolicy, JobFn, SkipPredicate};

/// One scheduled run of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledExecution {
    /// Unique execution identifier
    pub execution_id: Uuid,
    /// Job identity
    pub job_id: String,
    /// Instant the trigger fired for
    pub scheduled_at: DateTime<Utc>,
}

impl ScheduledExecution {
    /// Create an execution with a fresh identifier
    pub fn new(job_id: impl Into<String>, scheduled_at: DateTime<Utc>) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            job_id: job_id.into(),
            scheduled_at,
        }
    }
}

/// How an invocation ended, when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// The job body ran to completion
    Completed,
    /// A layer short-circuited before the body ran
    Skipped,
}

/// One layer of the chain
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Run `execution` through this layer and everything below it
    async fn invoke(&self, execution: &ScheduledExecution) -> anyhow::Result<InvocationOutcome>;
}

/// Innermost layer: the job body itself
pub struct TaskInvoker {
    task: JobFn,
}

impl TaskInvoker {
    /// Wrap a job body
    pub fn new(task: JobFn) -> Self {
        Self { task }
    }
}

#[async_trait]
impl Invoker for TaskInvoker {
    async fn invoke(&self, _execution: &ScheduledExecution) -> anyhow::Result<InvocationOutcome> {
        (self.task)().await?;
        Ok(InvocationOutcome::Completed)
    }
}

/// Assemble the chain for one job
pub fn build_chain(
    task: JobFn,
    concurrency: ConcurrencyPolicy,
    skip_predicate: Option<Arc<dyn SkipPredicate>>,
    instrumenter: Option<Arc<dyn JobInstrumenter>>,
    events: EventBus,
) -> Arc<dyn Invoker> {
    let mut chain: Arc<dyn Invoker> = Arc::new(TaskInvoker::new(task));

    if let Some(instrumenter) = instrumenter {
        chain = Arc::new(instrument::Instrumented::new(chain, instrumenter));
    }
    if let Some(predicate) = skip_predicate {
        chain = Arc::new(SkipPredicateInvoker::new(chain, predicate, events.clone()));
    }
    if concurrency == ConcurrencyPolicy::Skip {
        chain = Arc::new(SkipConcurrentInvoker::new(chain, events.clone()));
    }

    Arc::new(StatusEmitter::new(chain, events))
}
