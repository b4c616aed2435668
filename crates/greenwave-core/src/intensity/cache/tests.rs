    use super::*;
    use crate::clock::FakeClock;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 27, hour, minute, second).unwrap()
    }

    fn cache_at(start: DateTime<Utc>) -> (CarbonIntensityCache, FakeClock) {
        let clock = FakeClock::new(start);
        let cache = CarbonIntensityCache::new(&CacheConfig::default(), Arc::new(clock.clone()));
        (cache, clock)
    }

    fn six_hours() -> CarbonIntensity {
        CarbonIntensity::new("de", at(0, 0, 0), Duration::hours(1), vec![1.0; 6])
    }

    #[test]
    fn test_key_truncates_to_hour_and_normalizes_zone() {
        let a = CacheKey::new(at(5, 1, 2), " DE ");
        let b = CacheKey::new(at(5, 59, 59), "de");

        assert_eq!(a, b);
        assert_eq!(a.hour(), at(5, 0, 0));
        assert_eq!(a.zone(), "de");
        assert_ne!(a, CacheKey::new(at(6, 0, 0), "de"));
    }

    #[test]
    fn test_put_then_get_returns_value() {
        let (cache, _clock) = cache_at(at(0, 0, 0));
        let key = CacheKey::new(at(0, 0, 0), "de");

        cache.put(key.clone(), six_hours());
        assert_eq!(cache.get(&key).unwrap().as_ref(), &six_hours());
    }

    #[test]
    fn test_non_empty_entry_lives_until_coverage_end() {
        let (cache, clock) = cache_at(at(0, 0, 0));
        let key = CacheKey::new(at(0, 0, 0), "de");
        cache.put(key.clone(), six_hours());

        clock.set(at(6, 0, 0));
        assert!(cache.get(&key).is_some());

        clock.set(at(6, 0, 1));
        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_empty_entry_uses_short_ttl() {
        let (cache, clock) = cache_at(at(0, 0, 0));
        let key = CacheKey::new(at(0, 0, 0), "de");
        cache.put(key.clone(), CarbonIntensity::empty("de", at(0, 0, 0), at(23, 0, 0)));

        clock.set(at(0, 59, 59));
        assert!(cache.get(&key).is_some());

        clock.set(at(1, 0, 0));
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn test_update_does_not_extend_expiry() {
        let (cache, clock) = cache_at(at(0, 0, 0));
        let key = CacheKey::new(at(0, 0, 0), "de");
        cache.put(key.clone(), CarbonIntensity::empty("de", at(0, 0, 0), at(1, 0, 0)));

        clock.set(at(0, 30, 0));
        cache.put(key.clone(), six_hours());
        assert_eq!(cache.get(&key).unwrap().len(), 6);

        clock.set(at(1, 0, 0));
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn test_purge_expired() {
        let (cache, clock) = cache_at(at(0, 0, 0));
        cache.put(CacheKey::new(at(0, 0, 0), "de"), six_hours());
        cache.put(
            CacheKey::new(at(0, 0, 0), "nl"),
            CarbonIntensity::empty("nl", at(0, 0, 0), at(1, 0, 0)),
        );

        clock.set(at(2, 0, 0));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_access() {
        let (cache, _clock) = cache_at(at(0, 0, 0));
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    let key = CacheKey::new(at(i, 0, 0), "de");
                    cache.put(key.clone(), six_hours());
                    cache.get(&key).is_some()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(cache.len(), 8);
    }
