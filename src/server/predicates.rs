//! Built-in skip predicates selectable by name from configuration

use anyhow::{bail, Result};
use chrono::{Datelike, Weekday};
use greenwave_core::{ScheduledExecution, SkipPredicate};
use std::sync::Arc;

/// Names accepted in a job's `skip_predicate`
pub const PREDICATE_NAMES: &[&str] = &["weekends", "never"];

/// Skips executions scheduled on Saturday or Sunday (UTC)
#[derive(Debug, Clone, Copy)]
struct Weekends;

impl SkipPredicate for Weekends {
    fn should_skip(&self, execution: &ScheduledExecution) -> bool {
        matches!(execution.scheduled_at.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

/// Never skips
#[derive(Debug, Clone, Copy)]
struct Never;

impl SkipPredicate for Never {
    fn should_skip(&self, _: &ScheduledExecution) -> bool {
        false
    }
}

/// Resolve a predicate by name; unknown names are a configuration error
pub fn by_name(name: &str) -> Result<Arc<dyn SkipPredicate>> {
    match name.trim() {
        "weekends" => Ok(Arc::new(Weekends)),
        "never" => Ok(Arc::new(Never)),
        other => bail!(
            "unknown skip predicate '{}' (expected one of: {})",
            other,
            PREDICATE_NAMES.join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_weekends() {
        let predicate = by_name("weekends").unwrap();
        let saturday = Utc.with_ymd_and_hms(2024, 8, 31, 3, 0, 0).unwrap();
        let tuesday = Utc.with_ymd_and_hms(2024, 8, 27, 3, 0, 0).unwrap();

        assert!(predicate.should_skip(&ScheduledExecution::new("job", saturday)));
        assert!(!predicate.should_skip(&ScheduledExecution::new("job", tuesday)));
    }

    #[test]
    fn test_never() {
        let predicate = by_name(" never ").unwrap();
        assert!(!predicate.should_skip(&ScheduledExecution::new("job", Utc::now())));
    }

    #[test]
    fn test_unknown_name_is_an_error() {
        let err = by_name("holidays").err().unwrap();
        assert!(err.to_string().contains("holidays"));
    }
}
