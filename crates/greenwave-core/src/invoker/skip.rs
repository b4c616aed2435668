//! Layers that short-circuit an invocation before the body runs

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use super::{InvocationOutcome, Invoker, ScheduledExecution};
use crate::events::{EventBus, SchedulerEvent, SkipReason};
use crate::job::SkipPredicate;

fn publish_skip(events: &EventBus, execution: &ScheduledExecution, reason: SkipReason) {
    info!(
        job_id = %execution.job_id,
        execution_id = %execution.execution_id,
        reason = ?reason,
        "Job execution skipped"
    );
    events.publish(SchedulerEvent::ExecutionSkipped {
        job_id: execution.job_id.clone(),
        execution_id: execution.execution_id,
        scheduled_at: execution.scheduled_at,
        reason,
    });
}

/// Skips an invocation while the previous one is still in flight
pub struct SkipConcurrentInvoker {
    inner: Arc<dyn Invoker>,
    running: AtomicBool,
    events: EventBus,
}

impl SkipConcurrentInvoker {
    /// Wrap `inner`
    pub fn new(inner: Arc<dyn Invoker>, events: EventBus) -> Self {
        Self {
            inner,
            running: AtomicBool::new(false),
            events,
        }
    }

    /// Whether an invocation is in flight
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Clears the in-flight flag on completion, failure or cancellation
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[async_trait]
impl Invoker for SkipConcurrentInvoker {
    async fn invoke(&self, execution: &ScheduledExecution) -> anyhow::Result<InvocationOutcome> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            publish_skip(&self.events, execution, SkipReason::AlreadyRunning);
            return Ok(InvocationOutcome::Skipped);
        }

        let _guard = RunningGuard(&self.running);
        self.inner.invoke(execution).await
    }
}

/// Skips an invocation when the job's predicate says so
pub struct SkipPredicateInvoker {
    inner: Arc<dyn Invoker>,
    predicate: Arc<dyn SkipPredicate>,
    events: EventBus,
}

impl SkipPredicateInvoker {
    /// Wrap `inner`
    pub fn new(
        inner: Arc<dyn Invoker>,
        predicate: Arc<dyn SkipPredicate>,
        events: EventBus,
    ) -> Self {
        Self {
            inner,
            predicate,
            events,
        }
    }
}

#[async_trait]
impl Invoker for SkipPredicateInvoker {
    async fn invoke(&self, execution: &ScheduledExecution) -> anyhow::Result<InvocationOutcome> {
        if self.predicate.should_skip(execution) {
            publish_skip(&self.events, execution, SkipReason::Predicate);
            return Ok(InvocationOutcome::Skipped);
        }
        self.inner.invoke(execution).await
    }
}
