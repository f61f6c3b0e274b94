//! Integration tests for Retail Insights

use std::io::Write;

use chrono::NaiveDate;
use retail_insights::ingest::{self, export_customers, read_csv, read_csv_file, Schema};
use retail_insights::{
    filter, load, rolling_mean, segment, synthesize, Aisle, AnalyticsError, CustomerRecord, DataSource, OperationalSignals,
    Pipeline, PipelineConfig, RecordSet, RecordStore, SegmentationCache, Thresholds, TrafficSample,
};
use tempfile::NamedTempFile;

/// Create a test customer CSV file with sample data
fn create_customer_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "CustomerID,DwellTime,PurchaseAmount,VisitFrequency").unwrap();

    // Two browsers and one big spender
    writeln!(file, "1,10,50,2").unwrap();
    writeln!(file, "2,25,180,8").unwrap();
    writeln!(file, "3,12,55,3").unwrap();

    file
}

fn create_traffic_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Time,Aisle,Traffic,Sales").unwrap();
    writeln!(file, "2023-11-15 06:00:00,A1,80,150").unwrap();
    writeln!(file, "2023-11-15 09:00:00,A2,190,420").unwrap();
    writeln!(file, "2023-11-15 14:00:00,B1,150,310").unwrap();
    writeln!(file, "2023-11-15 20:00:00,B2,60,120").unwrap();
    file
}

fn ingested_store() -> RecordStore {
    let customers = read_csv_file(create_customer_csv().path()).unwrap();
    let traffic = read_csv_file(create_traffic_csv().path()).unwrap();
    load(DataSource::Tables { customers, traffic }).unwrap()
}

#[test]
fn test_end_to_end_pipeline() {
    let store = ingested_store();
    assert_eq!(store.customers.len(), 3);
    assert_eq!(store.traffic.len(), 4);

    // Business hours only
    let windowed = filter(&store.traffic, 8, 18).unwrap();
    let hours: Vec<u32> = windowed.iter().map(TrafficSample::hour).collect();
    assert_eq!(hours, vec![9, 14]);

    // Customers 1 and 3 behave alike
    let segmentation = segment(&store.customers, 2, 0).unwrap();
    let labels = segmentation.labels();
    assert_eq!(labels[0], labels[2]);
    assert_ne!(labels[0], labels[1]);

    let signals = OperationalSignals::from_samples(&store.traffic);
    let thresholds = Thresholds { high_spend: 150.0, low_visit_frequency: 2.5, ..Default::default() };
    let recommendations = synthesize(&segmentation.profiles(), &signals, &thresholds);

    // One loyalty offer for the big spender and one coupon for the browsers; peak at 9 AM
    let messages: Vec<&str> = recommendations.iter().map(|r| r.message.as_str()).collect();
    assert_eq!(recommendations.len(), 3, "{messages:?}");
    assert!(messages[0].starts_with("Peak hours"));
    assert!(messages.iter().any(|m| m.contains("loyalty program")));
    assert!(messages.iter().any(|m| m.contains("discount coupons")));
}

#[test]
fn test_ingested_store_substitutes_for_synthetic() {
    let synthetic = load(DataSource::Synthetic(Default::default())).unwrap();
    let ingested = ingested_store();

    for store in [synthetic, ingested] {
        let mut pipeline = Pipeline::new(PipelineConfig::default(), store);
        pipeline.config.segmentation.k = 2;
        let (segmentation, _) = pipeline.recommend().unwrap();
        assert!(segmentation.labeled.iter().all(|c| c.segment.0 < 2));
        assert!(pipeline.purchase_trend().is_ok());
        assert!(pipeline.windowed_traffic().is_ok());
    }
}

#[test]
fn test_ingest_export_ingest_round_trip() {
    let table = read_csv_file(create_customer_csv().path()).unwrap();
    let first = ingest::ingest(&table, Schema::Customer).unwrap();
    let RecordSet::Customers(customers) = &first else {
        panic!("expected customers");
    };

    let mut buf = Vec::new();
    export_customers(customers, &mut buf).unwrap();
    let second = ingest::ingest(&read_csv(buf.as_slice()).unwrap(), Schema::Customer).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_traffic_round_trip_through_file() {
    let table = read_csv_file(create_traffic_csv().path()).unwrap();
    let first = ingest::ingest(&table, Schema::Traffic).unwrap();
    let RecordSet::Traffic(samples) = &first else {
        panic!("expected traffic");
    };

    let out = NamedTempFile::new().unwrap();
    ingest::export_traffic(samples, out.reopen().unwrap()).unwrap();
    let second = ingest::ingest(&read_csv_file(out.path()).unwrap(), Schema::Traffic).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_error_handling_invalid_inputs() {
    let store = ingested_store();

    assert!(matches!(segment(&store.customers, 4, 0), Err(AnalyticsError::InvalidParameter { .. })));
    assert!(matches!(filter(&store.traffic, 18, 8), Err(AnalyticsError::Range { .. })));
    assert!(matches!(rolling_mean(&[1.0], 0), Err(AnalyticsError::Range { .. })));

    let wrong_schema = read_csv_file(create_traffic_csv().path()).unwrap();
    let err = ingest::ingest(&wrong_schema, Schema::Customer).unwrap_err();
    assert!(matches!(err, AnalyticsError::Schema { ref violations } if violations.len() == 8));

    // A failed run leaves later runs unaffected
    assert!(segment(&store.customers, 2, 0).is_ok());
}

#[test]
fn test_segmentation_is_reproducible_with_cache() {
    let store = load(DataSource::Synthetic(Default::default())).unwrap();
    let mut cached = Pipeline::new(PipelineConfig::default(), store.clone()).with_cache(SegmentationCache::default());

    let a = cached.segment().unwrap();
    let b = cached.segment().unwrap();
    let c = segment(&store.customers, 3, 42).unwrap();

    assert_eq!(a, b);
    assert_eq!(a.labels(), c.labels());
    assert_eq!(cached.cache().map(|cache| cache.hits), Some(1));
}

#[test]
fn test_rolling_mean_properties() {
    let series: Vec<f64> = (0..20).map(|i| f64::from(i * 7 % 11)).collect();

    for window in 1..=6 {
        let out = rolling_mean(&series, window).unwrap();
        assert_eq!(out.len(), series.len());
        assert!(out[..window - 1].iter().all(Option::is_none));
        assert!(out[window - 1..].iter().all(Option::is_some));
    }

    let identity = rolling_mean(&series, 1).unwrap();
    assert!(identity.iter().zip(&series).all(|(a, b)| *a == Some(*b)));
}

#[test]
fn test_window_preserves_order_for_every_range() {
    let samples: Vec<TrafficSample> = [23u32, 2, 13, 8, 8, 17, 0]
        .into_iter()
        .enumerate()
        .map(|(i, hour)| TrafficSample {
            timestamp: NaiveDate::from_ymd_opt(2023, 11, 15 + i as u32)
                .unwrap()
                .and_hms_opt(hour, 30, 0)
                .unwrap(),
            aisle: Aisle::A1,
            traffic: i as u32,
            sales: 1.0,
        })
        .collect();

    assert_eq!(filter(&samples, 0, 24).unwrap(), samples);

    for start in 0..=24 {
        for end in start..=24 {
            let out = filter(&samples, start, end).unwrap();
            assert!(out.iter().all(|s| (start..=end).contains(&s.hour())));
            assert!(out.windows(2).all(|w| w[0].traffic < w[1].traffic));
        }
    }
}

#[test]
fn test_every_label_in_range_for_many_k() {
    let customers: Vec<CustomerRecord> = (1..=30)
        .map(|id| CustomerRecord {
            id,
            dwell_time: f64::from((id * 3 % 25) as u32 + 5),
            purchase_amount: f64::from((id * 37 % 190) as u32 + 10),
            visit_frequency: (id % 9) as u32 + 1,
        })
        .collect();

    for k in 1..=6 {
        let first = segment(&customers, k, 5).unwrap();
        let second = segment(&customers, k, 5).unwrap();
        assert!(first.labeled.iter().all(|c| c.segment.0 < k));
        assert_eq!(first.labels(), second.labels());
    }
}
