//! Rolling trend statistics over ordered numeric series

use ndarray::ArrayView1;
use serde::Serialize;

use crate::data::CustomerRecord;
use crate::error::AnalyticsError;

/// One point of the customer purchase trend
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TrendPoint {
    pub customer_id: i64,
    pub purchase_amount: f64,
    /// `None` until `window` values of history exist
    pub rolling_avg: Option<f64>,
}

/// Fixed-width rolling mean, same length as `series`
///
/// Position `i` holds the mean of `series[i + 1 - window..=i]` once enough
/// history exists and `None` before that. Missing history is never
/// reported as zero.
pub fn rolling_mean(series: &[f64], window: usize) -> crate::Result<Vec<Option<f64>>> {
    if window == 0 {
        return Err(AnalyticsError::Range {
            parameter: "window",
            reason: "rolling window must be at least 1".to_owned(),
        });
    }

    let mut output = vec![None; series.len()];
    if series.len() < window {
        return Ok(output);
    }

    let view = ArrayView1::from(series);
    for (offset, values) in view.windows(window).into_iter().enumerate() {
        output[offset + window - 1] = values.mean();
    }
    Ok(output)
}

/// Rolling average of purchase amounts in customer order
pub fn purchase_trend(customers: &[CustomerRecord], window: usize) -> crate::Result<Vec<TrendPoint>> {
    let series: Vec<f64> = customers.iter().map(|c| c.purchase_amount).collect();
    let averages = rolling_mean(&series, window)?;

    Ok(customers
        .iter()
        .zip(averages)
        .map(|(customer, rolling_avg)| TrendPoint {
            customer_id: customer.id,
            purchase_amount: customer.purchase_amount,
            rolling_avg,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_mean_window_three() {
        let out = rolling_mean(&[1.0, 2.0, 3.0, 4.0, 8.0], 3).unwrap();
        assert_eq!(out, vec![None, None, Some(2.0), Some(3.0), Some(5.0)]);
    }

    #[test]
    fn test_window_one_is_identity() {
        let series = [0.1, 7.25, 0.0, 199.0];
        let out = rolling_mean(&series, 1).unwrap();
        let expected: Vec<Option<f64>> = series.iter().copied().map(Some).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_zero_values_are_defined_not_missing() {
        let out = rolling_mean(&[0.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(out, vec![None, Some(0.0), Some(0.0)]);
    }

    #[test]
    fn test_short_series_is_all_undefined() {
        let out = rolling_mean(&[5.0, 6.0], 5).unwrap();
        assert_eq!(out, vec![None, None]);
        assert!(rolling_mean(&[], 3).unwrap().is_empty());
    }

    #[test]
    fn test_zero_window_rejected() {
        assert!(matches!(rolling_mean(&[1.0], 0), Err(AnalyticsError::Range { parameter: "window", .. })));
    }

    #[test]
    fn test_order_sensitive() {
        let forward = rolling_mean(&[1.0, 1.0, 10.0], 2).unwrap();
        let reversed = rolling_mean(&[10.0, 1.0, 1.0], 2).unwrap();
        assert_ne!(forward, reversed);
    }

    #[test]
    fn test_purchase_trend() {
        let customers: Vec<CustomerRecord> = [50.0, 180.0, 55.0]
            .into_iter()
            .enumerate()
            .map(|(i, amount)| CustomerRecord {
                id: i as i64 + 1,
                dwell_time: 10.0,
                purchase_amount: amount,
                visit_frequency: 1,
            })
            .collect();

        let trend = purchase_trend(&customers, 2).unwrap();
        assert_eq!(trend.len(), 3);
        assert_eq!(trend[0].rolling_avg, None);
        assert_eq!(trend[1].rolling_avg, Some(115.0));
        assert_eq!(trend[2].customer_id, 3);
        assert_eq!(trend[2].rolling_avg, Some(117.5));
    }
}
