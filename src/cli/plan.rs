//! `greenwave plan`

use anyhow::Result;
use chrono::{DateTime, Utc};
use greenwave_core::job::ScheduleKind;
use greenwave_core::planner::{FixedWindowConstraints, SuccessiveConstraints};
use greenwave_core::{
    Clock, FixedWindowPlanner, JobDefinition, Planner, SuccessivePlanner, SystemClock,
};
use std::sync::Arc;

use crate::server::{build_fetcher, job_descriptors, load_config};

pub async fn run() -> Result<()> {
    let config = load_config()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let fetcher = build_fetcher(&config, clock.clone()).await?;
    let fixed_window = FixedWindowPlanner::new(fetcher.clone());
    let successive = SuccessivePlanner::new(fetcher);
    let now = clock.now();

    for descriptor in job_descriptors(&config)? {
        let definition = descriptor.validate()?;
        match next_run(&definition, &fixed_window, &successive, now).await {
            Ok(at) => println!("{:<24} {}", definition.identity, at.with_timezone(&definition.time_zone)),
            Err(e) => println!("{:<24} no plan: {}", definition.identity, e),
        }
    }
    Ok(())
}

async fn next_run(
    definition: &JobDefinition,
    fixed_window: &FixedWindowPlanner,
    successive: &SuccessivePlanner,
    now: DateTime<Utc>,
) -> greenwave_core::Result<DateTime<Utc>> {
    match &definition.schedule {
        ScheduleKind::FixedWindow { window, cron } => {
            let constraints = FixedWindowConstraints::new(
                definition.identity.clone(),
                definition.zone.clone(),
                definition.duration,
                *window,
                cron.as_deref(),
                definition.time_zone,
                now,
            )?;
            fixed_window.next_execution_time(&constraints).await
        }
        ScheduleKind::Successive(expr) => {
            let constraints = SuccessiveConstraints::new(
                definition.identity.clone(),
                definition.zone.clone(),
                definition.duration,
                *expr,
                now,
            );
            successive.next_execution_time(&constraints).await
        }
    }
}
