    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    const DATA: &str = r#"{
        "DE": {
            "start": "2024-08-27T00:00:00Z",
            "resolution_minutes": 60,
            "values": [300.0, 280.0, 150.0, 120.0, 200.0, 310.0]
        }
    }"#;

    fn utc(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 27, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_serves_overlapping_slice() {
        let provider = JsonFileProvider::from_json(DATA).unwrap();

        let intensity = provider
            .carbon_intensity(&ZonedPeriod::new(utc(2), utc(4), "de"))
            .await
            .unwrap();

        assert_eq!(intensity.start, utc(2));
        assert_eq!(intensity.values, vec![150.0, 120.0]);
        assert_eq!(intensity.resolution, Duration::hours(1));
    }

    #[tokio::test]
    async fn test_unknown_zone_is_empty() {
        let provider = JsonFileProvider::from_json(DATA).unwrap();

        let intensity = provider
            .carbon_intensity(&ZonedPeriod::new(utc(0), utc(6), "fr"))
            .await
            .unwrap();

        assert!(intensity.is_empty());
        assert_eq!(intensity.zone, "fr");
    }

    #[tokio::test]
    async fn test_period_outside_series_is_empty() {
        let provider = JsonFileProvider::from_json(DATA).unwrap();

        let later = Utc.with_ymd_and_hms(2024, 8, 29, 0, 0, 0).unwrap();
        let intensity = provider
            .carbon_intensity(&ZonedPeriod::new(later, later + Duration::hours(3), "de"))
            .await
            .unwrap();

        assert!(intensity.is_empty());
    }

    #[test]
    fn test_rejects_bad_resolution() {
        let err = JsonFileProvider::from_json(
            r#"{ "nl": { "start": "2024-08-27T00:00:00Z", "resolution_minutes": 0, "values": [1.0] } }"#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("resolution_minutes"));

        let huge = JsonFileProvider::from_json(
            r#"{ "nl": { "start": "2024-08-27T00:00:00Z", "resolution_minutes": 9223372036854775807, "values": [1.0] } }"#,
        )
        .unwrap_err();
        assert!(huge.to_string().contains("resolution_minutes"));
    }

    #[tokio::test]
    async fn test_open_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DATA.as_bytes()).unwrap();

        let provider = JsonFileProvider::open(file.path()).await.unwrap();

        assert!(provider.is_enabled());
        assert_eq!(provider.zones().collect::<Vec<_>>(), vec!["de"]);
    }

    #[tokio::test]
    async fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();

        let err = JsonFileProvider::open(dir.path().join("absent.json"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Io(_)));
    }
