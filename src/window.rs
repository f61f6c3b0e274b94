//! Time-window filtering and traffic aggregation over traffic samples

use std::collections::BTreeMap;

use tracing::debug;

use crate::data::{Aisle, TrafficSample};
use crate::error::AnalyticsError;

/// Last valid hour bound; `end_hour = 24` admits every hour of the day
pub const MAX_HOUR: u32 = 24;

/// Select samples whose hour-of-day lies in `[start_hour, end_hour]`
///
/// Relative order is preserved and an empty result is not an error.
pub fn filter(samples: &[TrafficSample], start_hour: u32, end_hour: u32) -> crate::Result<Vec<TrafficSample>> {
    validate_hours(start_hour, end_hour)?;

    let selected: Vec<TrafficSample> = samples
        .iter()
        .filter(|sample| (start_hour..=end_hour).contains(&sample.hour()))
        .copied()
        .collect();

    debug!(start_hour, end_hour, total = samples.len(), selected = selected.len(), "time window applied");
    Ok(selected)
}

fn validate_hours(start_hour: u32, end_hour: u32) -> crate::Result<()> {
    if start_hour > MAX_HOUR {
        return Err(AnalyticsError::Range {
            parameter: "start_hour",
            reason: format!("{start_hour} is outside [0, {MAX_HOUR}]"),
        });
    }
    if end_hour > MAX_HOUR {
        return Err(AnalyticsError::Range {
            parameter: "end_hour",
            reason: format!("{end_hour} is outside [0, {MAX_HOUR}]"),
        });
    }
    if start_hour > end_hour {
        return Err(AnalyticsError::Range {
            parameter: "start_hour",
            reason: format!("start hour {start_hour} is after end hour {end_hour}"),
        });
    }
    Ok(())
}

/// Total traffic per aisle, in aisle code order
pub fn traffic_by_aisle(samples: &[TrafficSample]) -> BTreeMap<Aisle, u64> {
    let mut totals = BTreeMap::new();
    for sample in samples {
        *totals.entry(sample.aisle).or_insert(0) += u64::from(sample.traffic);
    }
    totals
}

/// Total traffic per hour of day, in hour order
pub fn traffic_by_hour(samples: &[TrafficSample]) -> BTreeMap<u32, u64> {
    let mut totals = BTreeMap::new();
    for sample in samples {
        *totals.entry(sample.hour()).or_insert(0) += u64::from(sample.traffic);
    }
    totals
}
