//! Scheduler execution engine
//!
//! A single timer ticks once per `tick_interval` (first tick aligned to the
//! next whole second). Each tick spawns one evaluation per unpaused job that
//! is not already being evaluated; a fire decision hands the job to the
//! worker pool. The timer task itself never awaits a trigger or a job.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use super::builder::JobBuilder;
use super::task::{ScheduledTask, TriggerSnapshot};
use crate::clock::Clock;
use crate::config::{SchedulerConfig, StartMode};
use crate::error::{Result, SchedulerError};
use crate::events::{EventBus, ListenerId, SchedulerEvent, SchedulerListener};
use crate::intensity::CarbonIntensityFetcher;
use crate::invoker::{build_chain, JobInstrumenter, ScheduledExecution};
use crate::job::{JobDefinition, JobDescriptor};
use crate::planner::{FixedWindowPlanner, SuccessivePlanner};
use crate::trigger::{FixedWindowPlannerRef, SuccessivePlannerRef, Trigger};

struct Inner {
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    tasks: DashMap<String, Arc<ScheduledTask>>,
    fixed_window_planner: FixedWindowPlannerRef,
    successive_planner: SuccessivePlannerRef,
    instrumenter: Option<Arc<dyn JobInstrumenter>>,
    events: EventBus,
    paused: AtomicBool,
    start_requested: AtomicBool,
    running: AtomicBool,
    shutting_down: AtomicBool,
    workers: Arc<Semaphore>,
    tracker: TaskTracker,
    stop: CancellationToken,
    interrupt: CancellationToken,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

/// Carbon-aware job scheduler
pub struct CarbonAwareScheduler {
    inner: Arc<Inner>,
}

impl CarbonAwareScheduler {
    /// Create a scheduler planning with intensity data from `fetcher`
    pub fn new(
        config: SchedulerConfig,
        fetcher: Arc<CarbonIntensityFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_planners(
            config,
            Arc::new(FixedWindowPlanner::new(fetcher.clone())),
            Arc::new(SuccessivePlanner::new(fetcher)),
            clock,
        )
    }

    /// Create a scheduler with explicit planners
    pub fn with_planners(
        config: SchedulerConfig,
        fixed_window_planner: FixedWindowPlannerRef,
        successive_planner: SuccessivePlannerRef,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let events = EventBus::new(config.event_capacity);
        let workers = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            inner: Arc::new(Inner {
                config,
                clock,
                tasks: DashMap::new(),
                fixed_window_planner,
                successive_planner,
                instrumenter: None,
                events,
                paused: AtomicBool::new(false),
                start_requested: AtomicBool::new(false),
                running: AtomicBool::new(false),
                shutting_down: AtomicBool::new(false),
                workers,
                tracker: TaskTracker::new(),
                stop: CancellationToken::new(),
                interrupt: CancellationToken::new(),
                loop_handle: Mutex::new(None),
            }),
        }
    }

    /// Instrument every job registered from now on
    ///
    /// Only takes effect before the scheduler is started.
    #[must_use]
    pub fn with_instrumenter(mut self, instrumenter: Arc<dyn JobInstrumenter>) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.instrumenter = Some(instrumenter),
            None => warn!("Scheduler already started, instrumenter ignored"),
        }
        self
    }

    /// Register a declarative job
    ///
    /// A job already registered under the same identity is replaced.
    pub fn register(&self, descriptor: JobDescriptor) -> Result<()> {
        let definition = descriptor.validate()?;
        self.insert(definition, false)
    }

    /// Start building a programmatic job
    pub fn job(&self, identity: impl Into<String>) -> JobBuilder<'_> {
        JobBuilder::new(self, identity.into())
    }

    pub(super) fn insert(&self, definition: JobDefinition, programmatic: bool) -> Result<()> {
        let inner = &self.inner;
        if inner.shutting_down.load(Ordering::Acquire) {
            return Err(SchedulerError::ShuttingDown);
        }

        let id = definition.identity.clone();
        if programmatic && inner.tasks.contains_key(&id) {
            return Err(SchedulerError::DuplicateJob(id));
        }

        let trigger = Trigger::for_definition(
            &definition,
            &inner.fixed_window_planner,
            &inner.successive_planner,
            inner.clock.now(),
        )?;
        let invoker = build_chain(
            definition.task,
            definition.concurrency,
            definition.skip_predicate,
            inner.instrumenter.clone(),
            inner.events.clone(),
        );
        let kind = trigger.kind();
        let task = Arc::new(ScheduledTask::new(id.clone(), trigger, invoker, programmatic));

        if programmatic {
            match inner.tasks.entry(id.clone()) {
                dashmap::mapref::entry::Entry::Occupied(_) => {
                    return Err(SchedulerError::DuplicateJob(id));
                }
                dashmap::mapref::entry::Entry::Vacant(slot) => {
                    slot.insert(task);
                }
            }
        } else if inner.tasks.insert(id.clone(), task).is_some() {
            warn!(job_id = %id, "Job redefined, previous definition replaced");
        }

        info!(job_id = %id, kind = %kind, programmatic, "Job scheduled");

        if inner.start_requested.load(Ordering::Acquire) {
            self.start_loop();
        }
        Ok(())
    }

    /// Remove a programmatic job; declarative and unknown identities are ignored
    pub fn unschedule(&self, id: &str) -> bool {
        let removed = self
            .inner
            .tasks
            .remove_if(id, |_, task| task.is_programmatic())
            .is_some();
        if removed {
            info!(job_id = %id, "Job unscheduled");
        }
        removed
    }

    /// Start according to the configured start mode
    pub fn start(&self) {
        match self.inner.config.start_mode {
            StartMode::Normal if self.inner.tasks.is_empty() => {
                info!("No jobs registered, scheduler will start with the first job");
                self.inner.start_requested.store(true, Ordering::Release);
            }
            StartMode::Normal | StartMode::Forced => self.start_loop(),
            StartMode::Halted => {
                self.inner.paused.store(true, Ordering::Release);
                info!("Scheduler starting halted");
                self.start_loop();
            }
        }
    }

    /// Start the loop regardless of the start mode
    pub fn force_start(&self) {
        self.start_loop();
    }

    fn start_loop(&self) {
        if self.inner.shutting_down.load(Ordering::Acquire)
            || self.inner.running.swap(true, Ordering::AcqRel)
        {
            return;
        }
        self.inner.start_requested.store(false, Ordering::Release);

        let inner = self.inner.clone();
        let handle = tokio::spawn(async move { inner.run_loop().await });
        *self
            .inner
            .loop_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// Whether the timer loop is running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Run one check cycle now; returns how many evaluations were spawned
    pub fn tick(&self) -> usize {
        self.inner.tick()
    }

    /// Stop dispatching all jobs
    pub fn pause(&self) {
        if !self.inner.paused.swap(true, Ordering::AcqRel) {
            info!("Scheduler paused");
            self.inner.events.publish(SchedulerEvent::SchedulerPaused);
        }
    }

    /// Resume dispatching
    pub fn resume(&self) {
        if self.inner.paused.swap(false, Ordering::AcqRel) {
            info!("Scheduler resumed");
            self.inner.events.publish(SchedulerEvent::SchedulerResumed);
        }
    }

    /// Whether the scheduler as a whole is paused
    #[must_use]
    pub fn is_scheduler_paused(&self) -> bool {
        self.inner.paused.load(Ordering::Acquire)
    }

    /// Pause one job
    pub fn pause_job(&self, id: &str) -> Result<()> {
        let task = self.task(id)?;
        if task.set_paused(true) {
            info!(job_id = %id, "Job paused");
            self.inner.events.publish(SchedulerEvent::JobPaused {
                job_id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Resume one job
    pub fn resume_job(&self, id: &str) -> Result<()> {
        let task = self.task(id)?;
        if task.set_paused(false) {
            info!(job_id = %id, "Job resumed");
            self.inner.events.publish(SchedulerEvent::JobResumed {
                job_id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Whether one job is paused
    pub fn is_paused(&self, id: &str) -> Result<bool> {
        Ok(self.task(id)?.is_paused())
    }

    fn task(&self, id: &str) -> Result<Arc<ScheduledTask>> {
        self.inner
            .tasks
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SchedulerError::JobNotFound(id.to_string()))
    }

    /// Snapshots of every trigger, ordered by identity
    pub async fn triggers(&self) -> Vec<TriggerSnapshot> {
        let now = self.inner.clock.now();
        let mut snapshots = Vec::new();
        for task in self.inner.task_list() {
            snapshots.push(task.snapshot(now).await);
        }
        snapshots.sort_by(|a, b| a.id.cmp(&b.id));
        snapshots
    }

    /// Snapshot of one trigger
    pub async fn trigger(&self, id: &str) -> Option<TriggerSnapshot> {
        let task = self.task(id).ok()?;
        Some(task.snapshot(self.inner.clock.now()).await)
    }

    /// Number of registered jobs
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.inner.tasks.len()
    }

    /// Register an event listener
    pub fn add_listener(&self, listener: Arc<dyn SchedulerListener>) -> ListenerId {
        self.inner.events.add_listener(listener)
    }

    /// Remove an event listener; returns whether it was registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.events.remove_listener(id)
    }

    /// Subscribe to the event broadcast
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.inner.events.subscribe()
    }

    /// Stop the loop, drain in-flight work for the grace period, then interrupt
    pub async fn shutdown(&self) {
        let inner = &self.inner;
        if inner.shutting_down.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("Scheduler shutting down");

        inner.stop.cancel();
        let handle = inner
            .loop_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Scheduler loop ended abnormally");
            }
        }
        inner.running.store(false, Ordering::Release);

        inner.tracker.close();
        let grace = inner.config.shutdown_grace();
        if tokio::time::timeout(grace, inner.tracker.wait()).await.is_err() {
            warn!(
                in_flight = inner.tracker.len(),
                grace_secs = grace.as_secs(),
                "Grace period elapsed, interrupting remaining jobs"
            );
            inner.interrupt.cancel();
            inner.tracker.wait().await;
        }

        info!("Scheduler stopped");
    }
}

impl Inner {
    async fn run_loop(self: Arc<Self>) {
        let period = self.config.tick_interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + self.until_next_second(), period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            jobs = self.tasks.len(),
            tick_ms = period.as_millis() as u64,
            "Scheduler loop started"
        );

        loop {
            tokio::select! {
                _ = self.stop.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick();
                }
            }
        }

        debug!("Scheduler loop stopped");
    }

    fn until_next_second(&self) -> Duration {
        let nanos = u64::from(self.clock.now().timestamp_subsec_nanos()) % 1_000_000_000;
        if nanos == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(1_000_000_000 - nanos)
        }
    }

    fn task_list(&self) -> Vec<Arc<ScheduledTask>> {
        self.tasks.iter().map(|entry| entry.value().clone()).collect()
    }

    fn tick(self: &Arc<Self>) -> usize {
        if self.paused.load(Ordering::Acquire) || self.shutting_down.load(Ordering::Acquire) {
            return 0;
        }

        let now = self.clock.now();
        let mut spawned = 0;
        for task in self.task_list() {
            if task.is_paused() {
                continue;
            }
            let Some(guard) = task.try_begin_evaluation() else {
                debug!(job_id = %task.id(), "Previous evaluation still running");
                continue;
            };

            let inner = self.clone();
            self.tracker.spawn(async move {
                let evaluation = AssertUnwindSafe(guard.task().evaluate(now)).catch_unwind();
                tokio::select! {
                    _ = inner.interrupt.cancelled() => {}
                    fired = evaluation => match fired {
                        Ok(Some(at)) => inner.dispatch(guard.task(), at),
                        Ok(None) => {}
                        Err(panic) => error!(
                            job_id = %guard.task().id(),
                            panic = panic_message(panic.as_ref()),
                            "Trigger evaluation panicked"
                        ),
                    },
                }
                drop(guard);
            });
            spawned += 1;
        }
        spawned
    }

    fn dispatch(&self, task: &Arc<ScheduledTask>, scheduled_at: DateTime<Utc>) {
        let execution = ScheduledExecution::new(task.id(), scheduled_at);
        info!(
            job_id = %execution.job_id,
            execution_id = %execution.execution_id,
            scheduled_at = %scheduled_at,
            "Job fired"
        );

        let invoker = task.invoker();
        let workers = self.workers.clone();
        let interrupt = self.interrupt.clone();
        self.tracker.spawn(async move {
            let run = async {
                let Ok(_permit) = workers.acquire_owned().await else {
                    return;
                };
                // Failures are reported by the status layer.
                let _ = invoker.invoke(&execution).await;
            };
            tokio::select! {
                _ = interrupt.cancelled() => {
                    warn!(job_id = %execution.job_id, "Job interrupted by shutdown");
                }
                _ = run => {}
            }
        });
    }
}

impl std::fmt::Debug for CarbonAwareScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CarbonAwareScheduler")
            .field("jobs", &self.inner.tasks.len())
            .field("running", &self.is_running())
            .field("paused", &self.is_scheduler_paused())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
