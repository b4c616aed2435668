    use super::*;
    use crate::clock::FakeClock;
    use crate::config::CacheConfig;
    use crate::intensity::api::MockCarbonIntensityApi;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 27, hour, minute, 0).unwrap()
    }

    fn cache() -> Arc<CarbonIntensityCache> {
        Arc::new(CarbonIntensityCache::new(
            &CacheConfig::default(),
            Arc::new(FakeClock::new(at(0, 0))),
        ))
    }

    fn series_from(start: DateTime<Utc>) -> CarbonIntensity {
        CarbonIntensity::new("de", start, Duration::hours(1), vec![10.0, 20.0, 30.0])
    }

    fn enabled_mock() -> MockCarbonIntensityApi {
        let mut mock = MockCarbonIntensityApi::new();
        mock.expect_is_enabled().return_const(true);
        mock
    }

    #[tokio::test]
    async fn test_second_fetch_hits_cache() {
        let mut primary = enabled_mock();
        primary
            .expect_carbon_intensity()
            .times(1)
            .returning(|period| Ok(series_from(period.start)));

        let fetcher = CarbonIntensityFetcher::new(Arc::new(primary), None, cache());
        let period = ZonedPeriod::new(at(1, 0), at(4, 0), "DE");

        let first = fetcher.fetch(&period).await.unwrap();
        let second = fetcher
            .fetch(&ZonedPeriod::new(at(1, 45), at(4, 0), "de"))
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_primary_failure_uses_fallback() {
        let mut primary = enabled_mock();
        primary
            .expect_carbon_intensity()
            .times(1)
            .returning(|_| Err(SchedulerError::Api("503".to_string())));

        let mut fallback = enabled_mock();
        fallback
            .expect_carbon_intensity()
            .times(1)
            .returning(|period| Ok(series_from(period.start)));

        let fetcher =
            CarbonIntensityFetcher::new(Arc::new(primary), Some(Arc::new(fallback)), cache());
        let data = fetcher
            .fetch(&ZonedPeriod::new(at(1, 0), at(4, 0), "de"))
            .await
            .unwrap();

        assert_eq!(data.values, vec![10.0, 20.0, 30.0]);
        assert_eq!(fetcher.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_fallback_failure_propagates() {
        let mut primary = enabled_mock();
        primary
            .expect_carbon_intensity()
            .returning(|_| Err(SchedulerError::Api("timeout".to_string())));

        let mut fallback = enabled_mock();
        fallback
            .expect_carbon_intensity()
            .returning(|_| Err(SchedulerError::Api("missing file".to_string())));

        let fetcher =
            CarbonIntensityFetcher::new(Arc::new(primary), Some(Arc::new(fallback)), cache());
        let err = fetcher
            .fetch(&ZonedPeriod::new(at(1, 0), at(4, 0), "de"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("missing file"));
        assert!(fetcher.cache().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_primary_is_replaced_by_fallback() {
        let mut primary = MockCarbonIntensityApi::new();
        primary.expect_is_enabled().return_const(false);
        primary.expect_carbon_intensity().never();

        let mut fallback = enabled_mock();
        fallback
            .expect_carbon_intensity()
            .times(1)
            .returning(|period| Ok(series_from(period.start)));

        let fetcher =
            CarbonIntensityFetcher::new(Arc::new(primary), Some(Arc::new(fallback)), cache());
        assert!(fetcher
            .fetch(&ZonedPeriod::new(at(1, 0), at(4, 0), "de"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_data_is_cached_under_reported_start() {
        // The source answers with data anchored two hours before the request.
        let mut primary = enabled_mock();
        primary
            .expect_carbon_intensity()
            .times(2)
            .returning(|period| Ok(series_from(period.start - Duration::hours(2))));

        let fetcher = CarbonIntensityFetcher::new(Arc::new(primary), None, cache());
        let period = ZonedPeriod::new(at(5, 0), at(8, 0), "de");

        fetcher.fetch(&period).await.unwrap();
        // The original instant keeps missing; the reported start is what was stored.
        fetcher.fetch(&period).await.unwrap();
        assert!(fetcher.cache().get(&CacheKey::new(at(3, 0), "de")).is_some());
        assert!(fetcher.cache().get(&CacheKey::new(at(5, 0), "de")).is_none());
    }
