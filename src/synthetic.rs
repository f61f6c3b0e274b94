//! Seeded mock data for demos and tests

use chrono::{Duration, NaiveDate, NaiveDateTime};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data::{Aisle, CustomerRecord, TrafficSample};

/// Aisles that receive synthetic traffic
const TRAFFIC_AISLES: [Aisle; 4] = [Aisle::A1, Aisle::A2, Aisle::B1, Aisle::B2];

/// Parameters for synthetic dataset generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticParams {
    pub seed: u64,
    /// Number of customers to generate
    pub customers: usize,
    /// Number of hourly traffic samples to generate
    pub samples: usize,
    /// Timestamp of the first traffic sample
    pub start: NaiveDateTime,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            seed: 42,
            customers: 100,
            samples: 10,
            start: NaiveDate::from_ymd_opt(2023, 11, 15)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap_or_default(),
        }
    }
}

/// Generate customers with ids `1..=params.customers`
pub fn customers(params: &SyntheticParams) -> Vec<CustomerRecord> {
    let mut rng = StdRng::seed_from_u64(params.seed);
    (1..=params.customers as i64)
        .map(|id| CustomerRecord {
            id,
            dwell_time: f64::from(rng.gen_range(5u32..30)),
            purchase_amount: f64::from(rng.gen_range(10u32..200)),
            visit_frequency: rng.gen_range(1..10),
        })
        .collect()
}

/// Generate one traffic sample per hour starting at `params.start`
pub fn traffic(params: &SyntheticParams) -> Vec<TrafficSample> {
    let mut rng = StdRng::seed_from_u64(params.seed);
    (0..params.samples)
        .map(|i| TrafficSample {
            timestamp: params.start + Duration::hours(i as i64),
            aisle: TRAFFIC_AISLES[rng.gen_range(0..TRAFFIC_AISLES.len())],
            traffic: rng.gen_range(50..200),
            sales: f64::from(rng.gen_range(100u32..500)),
        })
        .collect()
}

/// Store traffic heatmap: rows are sections, columns are aisles
pub fn traffic_heatmap(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((rows, cols), |_| rng.gen_range(0.0..100.0))
}
