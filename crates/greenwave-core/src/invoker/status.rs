//! Reports the result of every invocation

use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error};

use super::{InvocationOutcome, Invoker, ScheduledExecution};
use crate::events::{EventBus, SchedulerEvent};

/// Publishes success/failure events; never alters the result
///
/// A skipped invocation is a completed one and reports success.
pub struct StatusEmitter {
    inner: Arc<dyn Invoker>,
    events: EventBus,
}

impl StatusEmitter {
    /// Wrap `inner`
    pub fn new(inner: Arc<dyn Invoker>, events: EventBus) -> Self {
        Self { inner, events }
    }
}

#[async_trait]
impl Invoker for StatusEmitter {
    async fn invoke(&self, execution: &ScheduledExecution) -> anyhow::Result<InvocationOutcome> {
        let started = Instant::now();
        let result = self.inner.invoke(execution).await;

        match &result {
            Ok(outcome) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                debug!(
                    job_id = %execution.job_id,
                    execution_id = %execution.execution_id,
                    ?outcome,
                    duration_ms,
                    "Job execution succeeded"
                );
                self.events.publish(SchedulerEvent::ExecutionSucceeded {
                    job_id: execution.job_id.clone(),
                    execution_id: execution.execution_id,
                    scheduled_at: execution.scheduled_at,
                    duration_ms,
                });
            }
            Err(e) => {
                error!(
                    job_id = %execution.job_id,
                    execution_id = %execution.execution_id,
                    error = %e,
                    "Job execution failed"
                );
                self.events.publish(SchedulerEvent::ExecutionFailed {
                    job_id: execution.job_id.clone(),
                    execution_id: execution.execution_id,
                    scheduled_at: execution.scheduled_at,
                    error: format!("{:#}", e),
                });
            }
        }

        result
    }
}
