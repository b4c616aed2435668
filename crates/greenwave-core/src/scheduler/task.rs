//! A trigger bound to its invoker chain

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::invoker::Invoker;
use crate::trigger::{Trigger, TriggerKind};

/// Point-in-time view of one job's trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerSnapshot {
    /// Job identity
    pub id: String,
    /// Trigger variant
    pub kind: TriggerKind,
    /// Start of the trigger, or of its current window
    pub start: DateTime<Utc>,
    /// Last fire instant
    pub last_fire_time: Option<DateTime<Utc>>,
    /// Next expected fire instant
    pub next_fire_time: Option<DateTime<Utc>>,
    /// Whether the job is paused
    pub paused: bool,
    /// Whether the next fire is past its grace period
    pub overdue: bool,
    /// Whether planning failed and the trigger runs on its fallback
    pub degraded: bool,
    /// Whether the job was registered from code
    pub programmatic: bool,
}

/// A registered job
///
/// The trigger lock is only held while evaluating; `paused` is separate so
/// pausing never waits on an evaluation in flight.
pub struct ScheduledTask {
    id: String,
    trigger: Mutex<Trigger>,
    invoker: Arc<dyn Invoker>,
    paused: AtomicBool,
    evaluating: AtomicBool,
    programmatic: bool,
}

impl ScheduledTask {
    /// Bind `trigger` to `invoker`
    pub fn new(
        id: impl Into<String>,
        trigger: Trigger,
        invoker: Arc<dyn Invoker>,
        programmatic: bool,
    ) -> Self {
        Self {
            id: id.into(),
            trigger: Mutex::new(trigger),
            invoker,
            paused: AtomicBool::new(false),
            evaluating: AtomicBool::new(false),
            programmatic,
        }
    }

    /// Job identity
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The invoker chain
    #[must_use]
    pub fn invoker(&self) -> Arc<dyn Invoker> {
        self.invoker.clone()
    }

    /// Whether the job was registered from code
    #[must_use]
    pub fn is_programmatic(&self) -> bool {
        self.programmatic
    }

    /// Whether the job is paused
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Set the paused flag; returns whether it changed
    pub fn set_paused(&self, paused: bool) -> bool {
        self.paused.swap(paused, Ordering::AcqRel) != paused
    }

    /// Claim the single evaluation slot
    pub(crate) fn try_begin_evaluation(self: &Arc<Self>) -> Option<EvaluationGuard> {
        self.evaluating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| EvaluationGuard(self.clone()))
    }

    /// Evaluate the trigger at `now`
    pub async fn evaluate(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.trigger.lock().await.evaluate(now).await
    }

    /// Snapshot of the trigger state
    pub async fn snapshot(&self, now: DateTime<Utc>) -> TriggerSnapshot {
        let trigger = self.trigger.lock().await;
        TriggerSnapshot {
            id: self.id.clone(),
            kind: trigger.kind(),
            start: trigger.start(),
            last_fire_time: trigger.last_fire_time(),
            next_fire_time: trigger.next_fire_time(),
            paused: self.is_paused(),
            overdue: trigger.is_overdue(now),
            degraded: trigger.is_degraded(),
            programmatic: self.programmatic,
        }
    }
}

impl std::fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("id", &self.id)
            .field("paused", &self.is_paused())
            .field("programmatic", &self.programmatic)
            .finish_non_exhaustive()
    }
}

/// Releases the evaluation slot when dropped, including on panic
pub(crate) struct EvaluationGuard(Arc<ScheduledTask>);

impl EvaluationGuard {
    pub(crate) fn task(&self) -> &Arc<ScheduledTask> {
        &self.0
    }
}

impl Drop for EvaluationGuard {
    fn drop(&mut self) {
        self.0.evaluating.store(false, Ordering::Release);
    }
}
