    use super::*;
    use chrono::TimeZone;

    fn utc(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, day, hour, minute, 0).unwrap()
    }

    fn window(expr: &str) -> FixedWindowExpr {
        expr.parse().unwrap()
    }

    fn constraints(expr: &str, cron: Option<&str>, tz: Tz, now: DateTime<Utc>) -> FixedWindowConstraints {
        FixedWindowConstraints::new("job", "nl", Duration::hours(1), window(expr), cron, tz, now)
            .unwrap()
    }

    #[test]
    fn test_window_today_before_start() {
        let c = constraints("05:15 08:15", None, Tz::UTC, utc(27, 4, 16));
        assert_eq!(c.start, utc(27, 5, 15));
        assert_eq!(c.end, utc(27, 8, 15));
    }

    #[test]
    fn test_window_today_while_open() {
        let c = constraints("05:15 08:15", None, Tz::UTC, utc(27, 7, 0));
        assert_eq!(c.start, utc(27, 5, 15));
    }

    #[test]
    fn test_window_tomorrow_after_end() {
        let c = constraints("05:15 08:15", None, Tz::UTC, utc(27, 9, 0));
        assert_eq!(c.start, utc(28, 5, 15));
        assert_eq!(c.end, utc(28, 8, 15));
    }

    #[test]
    fn test_window_in_local_time_zone() {
        // Amsterdam is UTC+2 in summer.
        let c = constraints(
            "05:15 08:15",
            None,
            chrono_tz::Europe::Amsterdam,
            utc(27, 2, 16),
        );
        assert_eq!(c.start, utc(27, 3, 15));
        assert_eq!(c.end, utc(27, 6, 15));
    }

    #[test]
    fn test_overnight_window_ends_next_day() {
        let c = constraints("22:00 02:00", None, Tz::UTC, utc(27, 12, 0));
        assert_eq!(c.start, utc(27, 22, 0));
        assert_eq!(c.end, utc(28, 2, 0));
    }

    #[test]
    fn test_roll_advances_one_day() {
        let mut c = constraints("05:15 08:15", None, Tz::UTC, utc(27, 4, 0));
        c.roll().unwrap();
        assert_eq!(c.start, utc(28, 5, 15));
        assert_eq!(c.end, utc(28, 8, 15));
    }

    #[test]
    fn test_cron_selects_window_days() {
        // 2024-08-30 is a Friday; the next weekday window is Monday 2024-09-02.
        let mut c = constraints(
            "05:15 08:15",
            Some("0 0 6 * * Mon-Fri"),
            Tz::UTC,
            utc(30, 4, 0),
        );
        assert_eq!(c.start, utc(30, 5, 15));
        c.roll().unwrap();
        assert_eq!(c.start, Utc.with_ymd_and_hms(2024, 9, 2, 5, 15, 0).unwrap());
    }

    #[test]
    fn test_roll_until_open_skips_missed_windows() {
        let mut c = constraints("05:15 08:15", None, Tz::UTC, utc(27, 4, 0));
        let rolled = c.roll_until_open(utc(29, 9, 0), Duration::zero()).unwrap();
        assert_eq!(rolled, 3);
        assert_eq!(c.start, utc(30, 5, 15));

        let none = c.roll_until_open(utc(30, 8, 20), Duration::minutes(10)).unwrap();
        assert_eq!(none, 0);
    }

    #[test]
    fn test_last_slot_start() {
        let c = constraints("05:15 08:15", None, Tz::UTC, utc(27, 4, 0));
        assert_eq!(c.last_slot_start(), utc(27, 7, 15));

        let short = FixedWindowConstraints::new(
            "job",
            "nl",
            Duration::hours(5),
            window("05:15 08:15"),
            None,
            Tz::UTC,
            utc(27, 4, 0),
        )
        .unwrap();
        assert_eq!(short.last_slot_start(), short.start);
    }

    #[test]
    fn test_successive_search_window() {
        let expr: SuccessiveExpr = "1h 6h 12h".parse().unwrap();
        let mut c = SuccessiveConstraints::new("job", "de", Duration::minutes(30), expr, utc(27, 0, 0));

        assert_eq!(c.reference(), utc(27, 0, 0));
        assert_eq!(c.search_window(), (utc(27, 0, 0), utc(27, 1, 0)));

        c.last_execution_time = Some(utc(27, 10, 0));
        assert_eq!(c.reference(), utc(27, 16, 0));
        assert_eq!(c.search_window(), (utc(27, 16, 0), utc(27, 22, 0)));
        assert_eq!(c.fallback_interval(), Duration::hours(9));
    }

    #[test]
    fn test_successive_zero_minimum_gap_opens_after_last_run() {
        let expr: SuccessiveExpr = "1h 0m 2h".parse().unwrap();
        let mut c = SuccessiveConstraints::new("job", "de", Duration::minutes(30), expr, utc(27, 0, 0));
        c.last_execution_time = Some(utc(27, 10, 0));

        let opens = utc(27, 10, 0) + Duration::seconds(1);
        assert_eq!(c.effective_minimum_gap(), Duration::seconds(1));
        assert_eq!(c.reference(), opens);
        assert_eq!(c.search_window(), (opens, utc(27, 12, 0)));
    }

    #[test]
    fn test_successive_huge_gap_saturates() {
        let expr: SuccessiveExpr = "1m 1m 99999999d".parse().unwrap();
        let mut c = SuccessiveConstraints::new("job", "de", Duration::minutes(30), expr, utc(27, 0, 0));
        c.last_execution_time = Some(utc(27, 0, 0));

        let (start, end) = c.search_window();
        assert_eq!(start, utc(27, 0, 1));
        assert_eq!(end, DateTime::<Utc>::MAX_UTC);
        assert!(c.fallback_interval() > Duration::zero());
    }
