//! Instrumentation hook around job execution

use async_trait::async_trait;
use std::sync::Arc;
use tracing::Instrument;

use super::{InvocationOutcome, Invoker, ScheduledExecution};

/// What an instrumenter gets to wrap
pub struct JobContext<'a> {
    span_name: &'a str,
    execution: &'a ScheduledExecution,
    inner: &'a dyn Invoker,
}

impl<'a> JobContext<'a> {
    /// Name to give the span, the job identity
    #[must_use]
    pub fn span_name(&self) -> &str {
        self.span_name
    }

    /// The execution being run
    #[must_use]
    pub fn execution(&self) -> &ScheduledExecution {
        self.execution
    }

    /// Run the rest of the chain
    pub async fn execute_job(self) -> anyhow::Result<InvocationOutcome> {
        self.inner.invoke(self.execution).await
    }
}

/// Wraps job execution, typically in a span or a metric timer
#[async_trait]
pub trait JobInstrumenter: Send + Sync {
    /// Run `context.execute_job()` inside the instrumentation
    async fn instrument(&self, context: JobContext<'_>) -> anyhow::Result<InvocationOutcome>;
}

/// Runs each execution inside a `tracing` span named after the job
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingInstrumenter;

#[async_trait]
impl JobInstrumenter for TracingInstrumenter {
    async fn instrument(&self, context: JobContext<'_>) -> anyhow::Result<InvocationOutcome> {
        let span = tracing::info_span!(
            "job",
            job_id = %context.span_name(),
            execution_id = %context.execution().execution_id,
        );
        context.execute_job().instrument(span).await
    }
}

/// Chain layer delegating to a [`JobInstrumenter`]
pub(super) struct Instrumented {
    inner: Arc<dyn Invoker>,
    instrumenter: Arc<dyn JobInstrumenter>,
}

impl Instrumented {
    pub(super) fn new(inner: Arc<dyn Invoker>, instrumenter: Arc<dyn JobInstrumenter>) -> Self {
        Self {
            inner,
            instrumenter,
        }
    }
}

#[async_trait]
impl Invoker for Instrumented {
    async fn invoke(&self, execution: &ScheduledExecution) -> anyhow::Result<InvocationOutcome> {
        let context = JobContext {
            span_name: &execution.job_id,
            execution,
            inner: self.inner.as_ref(),
        };
        JobInstrumenter::instrument(&*self.instrumenter, context).await
    }
}
