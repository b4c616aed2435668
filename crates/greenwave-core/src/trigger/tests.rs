    use super::*;
    use crate::error::SchedulerError;
    use crate::job::{job_fn, JobDescriptor};
    use crate::planner::Planner;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use chrono_tz::Tz;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    type PlanFn<C> = Box<dyn Fn(&C) -> crate::error::Result<DateTime<Utc>> + Send + Sync>;

    /// Planner answering from a closure and counting calls
    struct FnPlanner<C> {
        plan: PlanFn<C>,
        calls: AtomicUsize,
    }

    impl<C> FnPlanner<C> {
        fn new(
            plan: impl Fn(&C) -> crate::error::Result<DateTime<Utc>> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                plan: Box::new(plan),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl<C: Send + Sync + 'static> Planner for FnPlanner<C> {
        type Constraints = C;

        async fn next_execution_time(&self, c: &C) -> crate::error::Result<DateTime<Utc>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.plan)(c)
        }
    }

    fn no_data<C>(_: &C) -> crate::error::Result<DateTime<Utc>> {
        Err(SchedulerError::Api("no data".to_string()))
    }

    fn utc(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, day, hour, minute, 0).unwrap()
    }

    fn window_constraints(expr: &str, now: DateTime<Utc>) -> FixedWindowConstraints {
        FixedWindowConstraints::new(
            "report",
            "nl",
            Duration::hours(1),
            expr.parse().unwrap(),
            None,
            Tz::UTC,
            now,
        )
        .unwrap()
    }

    fn successive_constraints(now: DateTime<Utc>) -> SuccessiveConstraints {
        SuccessiveConstraints::new(
            "backup",
            "de",
            Duration::minutes(30),
            "1h 6h 12h".parse().unwrap(),
            now,
        )
    }

    /// Evaluate every minute in `[from, to]`, collecting fires
    async fn run_minutes(
        trigger: &mut Trigger,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        let mut fires = Vec::new();
        let mut now = from;
        while now <= to {
            if let Some(at) = trigger.evaluate(now).await {
                fires.push((now, at));
            }
            now += Duration::minutes(1);
        }
        fires
    }

    #[test]
    fn test_interval_fires_on_first_call_after_start() {
        let mut trigger = IntervalTrigger::new(utc(27, 0, 0), Duration::hours(1));

        assert_eq!(trigger.evaluate(utc(26, 23, 59)), None);
        assert_eq!(trigger.evaluate(utc(27, 0, 5)), Some(utc(27, 0, 5)));
        assert_eq!(trigger.evaluate(utc(27, 0, 30)), None);
        assert_eq!(trigger.evaluate(utc(27, 1, 4)), None);
        assert_eq!(trigger.evaluate(utc(27, 1, 5)), Some(utc(27, 1, 5)));
        assert_eq!(trigger.last_fire_time(), Some(utc(27, 1, 5)));
    }

    #[test]
    fn test_interval_overdue() {
        let mut trigger =
            IntervalTrigger::new(utc(27, 0, 0), Duration::hours(1)).with_grace(Duration::minutes(5));
        trigger.evaluate(utc(27, 0, 0));

        assert_eq!(trigger.next_fire_time(), Some(utc(27, 1, 0)));
        assert!(!trigger.is_overdue(utc(27, 1, 5)));
        assert!(trigger.is_overdue(utc(27, 1, 6)));
    }

    #[test]
    fn test_cron_fires_once_per_occurrence() {
        let schedule = cron::Schedule::from_str("0 0 * * * *").unwrap();
        let mut trigger = CronTrigger::new(utc(27, 0, 30), schedule, Tz::UTC);

        assert_eq!(trigger.next_fire_time(), Some(utc(27, 1, 0)));
        assert_eq!(trigger.evaluate(utc(27, 0, 59)), None);
        assert_eq!(trigger.evaluate(utc(27, 1, 0)), Some(utc(27, 1, 0)));
        assert_eq!(trigger.evaluate(utc(27, 1, 0)), None);
        assert_eq!(trigger.next_fire_time(), Some(utc(27, 2, 0)));
    }

    #[test]
    fn test_cron_collapses_missed_occurrences() {
        let schedule = cron::Schedule::from_str("0 0 * * * *").unwrap();
        let mut trigger = CronTrigger::new(utc(27, 0, 30), schedule, Tz::UTC);

        assert_eq!(trigger.evaluate(utc(27, 5, 30)), Some(utc(27, 1, 0)));
        assert_eq!(trigger.evaluate(utc(27, 5, 40)), None);
        assert_eq!(trigger.next_fire_time(), Some(utc(27, 6, 0)));
        assert!(trigger.is_overdue(utc(27, 6, 1)));
    }

    #[test]
    fn test_cron_uses_time_zone() {
        let schedule = cron::Schedule::from_str("0 0 6 * * *").unwrap();
        let trigger = CronTrigger::new(utc(27, 0, 0), schedule, chrono_tz::Europe::Amsterdam);
        assert_eq!(trigger.next_fire_time(), Some(utc(27, 4, 0)));
    }

    #[tokio::test]
    async fn test_fixed_window_fires_once_and_rolls_one_day() {
        let planner =
            FnPlanner::new(|c: &FixedWindowConstraints| Ok(c.start + Duration::hours(2)));
        let constraints = window_constraints("05:15 08:15", utc(27, 4, 0));
        let mut trigger = Trigger::FixedWindow(FixedWindowTrigger::new(
            constraints,
            planner.clone(),
            Duration::zero(),
        ));

        let fires = run_minutes(&mut trigger, utc(27, 4, 0), utc(27, 23, 59)).await;

        assert_eq!(fires, vec![(utc(27, 7, 15), utc(27, 7, 15))]);
        assert_eq!(planner.calls(), 1);
        match &trigger {
            Trigger::FixedWindow(t) => {
                assert_eq!(t.constraints().start, utc(28, 5, 15));
                assert_eq!(t.constraints().end, utc(28, 8, 15));
            }
            other => panic!("unexpected trigger {:?}", other),
        }
        assert!(!trigger.is_overdue(utc(28, 12, 0)));
    }

    #[tokio::test]
    async fn test_fixed_window_next_day_fires_again() {
        let planner = FnPlanner::new(|c: &FixedWindowConstraints| Ok(c.start + Duration::hours(1)));
        let mut trigger = Trigger::FixedWindow(FixedWindowTrigger::new(
            window_constraints("05:15 08:15", utc(27, 4, 0)),
            planner.clone(),
            Duration::zero(),
        ));

        let fires = run_minutes(&mut trigger, utc(27, 4, 0), utc(28, 23, 0)).await;
        let instants: Vec<_> = fires.iter().map(|(_, at)| *at).collect();
        assert_eq!(instants, vec![utc(27, 6, 15), utc(28, 6, 15)]);
        assert_eq!(planner.calls(), 2);
    }

    #[tokio::test]
    async fn test_fixed_window_degrades_to_fallback_cron() {
        let planner = FnPlanner::new(no_data::<FixedWindowConstraints>);
        let mut trigger = Trigger::FixedWindow(FixedWindowTrigger::new(
            window_constraints("05:15 08:15", utc(27, 4, 0)),
            planner.clone(),
            Duration::zero(),
        ));

        assert_eq!(trigger.evaluate(utc(27, 5, 14)).await, None);
        assert_eq!(trigger.evaluate(utc(27, 5, 15)).await, Some(utc(27, 5, 15)));
        assert_eq!(planner.calls(), 1);
        // The next window plans afresh instead of staying degraded.
        assert!(!trigger.is_degraded());
        assert_eq!(trigger.start(), utc(28, 5, 15));

        let fires = run_minutes(&mut trigger, utc(27, 5, 16), utc(28, 5, 15)).await;
        assert_eq!(fires, vec![(utc(28, 5, 15), utc(28, 5, 15))]);
        assert_eq!(planner.calls(), 2);
    }

    #[tokio::test]
    async fn test_fixed_window_missed_window_is_skipped() {
        let planner = FnPlanner::new(|c: &FixedWindowConstraints| Ok(c.start));
        let mut trigger = Trigger::FixedWindow(FixedWindowTrigger::new(
            window_constraints("05:15 08:15", utc(27, 4, 0)),
            planner.clone(),
            Duration::minutes(10),
        ));

        // Still inside the grace period: fires late for today's window.
        assert_eq!(trigger.evaluate(utc(27, 8, 20)).await, Some(utc(27, 5, 15)));

        let mut later = Trigger::FixedWindow(FixedWindowTrigger::new(
            window_constraints("05:15 08:15", utc(27, 4, 0)),
            planner.clone(),
            Duration::minutes(10),
        ));
        assert_eq!(later.evaluate(utc(27, 8, 30)).await, None);
        assert_eq!(later.start(), utc(28, 5, 15));
    }

    #[tokio::test]
    async fn test_fixed_window_fallback_fires_in_current_window_after_gap() {
        let planner = FnPlanner::new(no_data::<FixedWindowConstraints>);
        let mut trigger = Trigger::FixedWindow(FixedWindowTrigger::new(
            window_constraints("05:15 08:15", utc(27, 4, 0)),
            planner.clone(),
            Duration::zero(),
        ));

        assert_eq!(trigger.evaluate(utc(27, 5, 15)).await, Some(utc(27, 5, 15)));

        // Not evaluated for two days, e.g. while the job was paused.
        assert_eq!(trigger.evaluate(utc(30, 6, 0)).await, Some(utc(30, 5, 15)));
        assert_eq!(trigger.last_fire_time(), Some(utc(30, 6, 0)));
        assert_eq!(trigger.start(), utc(31, 5, 15));
    }

    #[tokio::test]
    async fn test_overnight_window() {
        let planner =
            FnPlanner::new(|c: &FixedWindowConstraints| Ok(c.start + Duration::hours(3)));
        let mut trigger = Trigger::FixedWindow(FixedWindowTrigger::new(
            window_constraints("22:00 02:00", utc(27, 12, 0)),
            planner,
            Duration::zero(),
        ));

        let fires = run_minutes(&mut trigger, utc(27, 12, 0), utc(28, 12, 0)).await;
        assert_eq!(fires, vec![(utc(28, 1, 0), utc(28, 1, 0))]);
        assert_eq!(trigger.start(), utc(28, 22, 0));
    }

    #[tokio::test]
    async fn test_successive_fires_at_candidates() {
        let planner = FnPlanner::new(|c: &SuccessiveConstraints| {
            let (start, _) = c.search_window();
            Ok(start + Duration::minutes(30) + Duration::milliseconds(250))
        });
        let mut trigger = Trigger::Successive(SuccessiveTrigger::new(
            successive_constraints(utc(27, 0, 0)),
            planner.clone(),
            Duration::zero(),
        ));

        let fires = run_minutes(&mut trigger, utc(27, 0, 0), utc(27, 12, 0)).await;
        let instants: Vec<_> = fires.iter().map(|(_, at)| *at).collect();
        // First run inside the initial delay, the second six and a half hours later.
        assert_eq!(instants, vec![utc(27, 0, 30), utc(27, 7, 0)]);
        assert_eq!(planner.calls(), 2);
        assert_eq!(trigger.last_fire_time(), Some(utc(27, 7, 0)));
    }

    #[tokio::test]
    async fn test_successive_does_not_replan_before_minimum_gap() {
        let planner = FnPlanner::new(|c: &SuccessiveConstraints| Ok(c.search_window().0));
        let mut trigger = Trigger::Successive(SuccessiveTrigger::new(
            successive_constraints(utc(27, 0, 0)),
            planner.clone(),
            Duration::zero(),
        ));

        assert_eq!(trigger.evaluate(utc(27, 0, 0)).await, Some(utc(27, 0, 0)));
        run_minutes(&mut trigger, utc(27, 0, 1), utc(27, 5, 58)).await;
        assert_eq!(planner.calls(), 1);

        // Planning resumes one second before the minimum gap elapses.
        let almost = utc(27, 6, 0) - Duration::seconds(1);
        assert_eq!(trigger.evaluate(almost).await, None);
        assert_eq!(planner.calls(), 2);
        assert_eq!(trigger.evaluate(utc(27, 6, 0)).await, Some(utc(27, 6, 0)));
    }

    #[tokio::test]
    async fn test_successive_zero_minimum_gap_keeps_firing() {
        let planner = FnPlanner::new(|c: &SuccessiveConstraints| Ok(c.search_window().0));
        let constraints = SuccessiveConstraints::new(
            "backup",
            "de",
            Duration::minutes(30),
            "1h 0m 2h".parse().unwrap(),
            utc(27, 0, 0),
        );
        let mut trigger = Trigger::Successive(SuccessiveTrigger::new(
            constraints,
            planner.clone(),
            Duration::zero(),
        ));

        let fires = run_minutes(&mut trigger, utc(27, 0, 0), utc(27, 12, 0)).await;
        // Each window opens one second after the previous run, so every tick fires.
        assert_eq!(fires.len(), 721);
        assert_eq!(planner.calls(), 721);
        assert_eq!(fires[1].1, utc(27, 0, 0) + Duration::seconds(1));
        assert!(fires.windows(2).all(|pair| pair[1].1 > pair[0].1));
        assert_eq!(trigger.last_fire_time(), Some(utc(27, 12, 0)));
    }

    #[tokio::test]
    async fn test_successive_huge_maximum_gap_does_not_panic() {
        let planner = FnPlanner::new(|c: &SuccessiveConstraints| Ok(c.search_window().0));
        let constraints = SuccessiveConstraints::new(
            "backup",
            "de",
            Duration::minutes(30),
            "1m 1m 99999999d".parse().unwrap(),
            utc(27, 0, 0),
        );
        let mut trigger = Trigger::Successive(SuccessiveTrigger::new(
            constraints,
            planner.clone(),
            Duration::zero(),
        ));

        assert_eq!(trigger.evaluate(utc(27, 0, 0)).await, Some(utc(27, 0, 0)));
        assert_eq!(trigger.evaluate(utc(27, 0, 1)).await, Some(utc(27, 0, 1)));
        assert_eq!(planner.calls(), 2);
    }

    #[tokio::test]
    async fn test_successive_degrades_to_interval() {
        let planner = FnPlanner::new(no_data::<SuccessiveConstraints>);
        let mut trigger = Trigger::Successive(SuccessiveTrigger::new(
            successive_constraints(utc(27, 0, 0)),
            planner.clone(),
            Duration::zero(),
        ));

        // Bootstrap fire of the interval fallback.
        assert_eq!(trigger.evaluate(utc(27, 0, 0)).await, Some(utc(27, 0, 0)));
        assert_eq!(planner.calls(), 1);

        let fires = run_minutes(&mut trigger, utc(27, 0, 1), utc(27, 12, 0)).await;
        let instants: Vec<_> = fires.iter().map(|(_, at)| *at).collect();
        // Planning is retried after the minimum gap, then the 9h interval applies.
        assert_eq!(instants, vec![utc(27, 9, 0)]);
        assert_eq!(planner.calls(), 2);
    }

    #[test]
    fn test_for_definition_builds_carbon_aware_variants() {
        let fixed: FixedWindowPlannerRef = FnPlanner::new(no_data::<FixedWindowConstraints>);
        let successive: SuccessivePlannerRef = FnPlanner::new(no_data::<SuccessiveConstraints>);
        let now = utc(27, 4, 0);

        let window = JobDescriptor::new("w", job_fn(|| async { Ok(()) }))
            .with_fixed_window("05:15 08:15")
            .with_zone("nl")
            .with_duration("1h")
            .validate()
            .unwrap();
        let trigger = Trigger::for_definition(&window, &fixed, &successive, now).unwrap();
        assert_eq!(trigger.kind(), TriggerKind::FixedWindow);
        assert_eq!(trigger.start(), utc(27, 5, 15));
        assert_eq!(trigger.next_fire_time(), Some(utc(27, 5, 15)));

        let gap = JobDescriptor::new("s", job_fn(|| async { Ok(()) }))
            .with_successive("1h 6h 12h")
            .with_zone("de")
            .validate()
            .unwrap();
        let trigger = Trigger::for_definition(&gap, &fixed, &successive, now).unwrap();
        assert_eq!(trigger.kind(), TriggerKind::Successive);
        assert_eq!(trigger.next_fire_time(), Some(now));
        assert_eq!(trigger.last_fire_time(), None);
    }
