//! Headline KPIs for the executive summary view

use serde::Serialize;

use crate::data::{Aisle, RecordStore};
use crate::window;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExecutiveSummary {
    pub total_customers: usize,
    pub average_dwell_time: Option<f64>,
    pub average_purchase: Option<f64>,
    pub total_customer_spend: f64,
    pub total_traffic: u64,
    pub total_sales: f64,
    /// Aisle with the most traffic; ties go to the lowest aisle code
    pub busiest_aisle: Option<Aisle>,
}

impl ExecutiveSummary {
    pub fn compute(store: &RecordStore) -> Self {
        let n = store.customers.len();
        let total_dwell: f64 = store.customers.iter().map(|c| c.dwell_time).sum();
        let total_customer_spend: f64 = store.customers.iter().map(|c| c.purchase_amount).sum();
        let average = |total: f64| (n > 0).then(|| total / n as f64);

        let by_aisle = window::traffic_by_aisle(&store.traffic);
        let busiest_aisle = by_aisle
            .iter()
            .fold(None, |best: Option<(Aisle, u64)>, (&aisle, &traffic)| match best {
                Some((_, top)) if top >= traffic => best,
                _ => Some((aisle, traffic)),
            })
            .map(|(aisle, _)| aisle);

        Self {
            total_customers: n,
            average_dwell_time: average(total_dwell),
            average_purchase: average(total_customer_spend),
            total_customer_spend,
            total_traffic: by_aisle.values().sum(),
            total_sales: store.traffic.iter().map(|s| s.sales).sum(),
            busiest_aisle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CustomerRecord, TrafficSample};
    use chrono::NaiveDate;

    #[test]
    fn test_summary_over_small_store() {
        let at = |hour| NaiveDate::from_ymd_opt(2023, 11, 15).unwrap().and_hms_opt(hour, 0, 0).unwrap();
        let store = RecordStore {
            customers: vec![
                CustomerRecord { id: 1, dwell_time: 10.0, purchase_amount: 50.0, visit_frequency: 2 },
                CustomerRecord { id: 2, dwell_time: 20.0, purchase_amount: 150.0, visit_frequency: 4 },
            ],
            traffic: vec![
                TrafficSample { timestamp: at(8), aisle: Aisle::B1, traffic: 100, sales: 200.0 },
                TrafficSample { timestamp: at(9), aisle: Aisle::A1, traffic: 100, sales: 300.0 },
                TrafficSample { timestamp: at(10), aisle: Aisle::B2, traffic: 60, sales: 50.0 },
            ],
        };

        let summary = ExecutiveSummary::compute(&store);
        assert_eq!(summary.total_customers, 2);
        assert_eq!(summary.average_dwell_time, Some(15.0));
        assert_eq!(summary.average_purchase, Some(100.0));
        assert_eq!(summary.total_customer_spend, 200.0);
        assert_eq!(summary.total_traffic, 260);
        assert_eq!(summary.total_sales, 550.0);
        assert_eq!(summary.busiest_aisle, Some(Aisle::A1));
    }

    #[test]
    fn test_empty_store_has_no_averages() {
        let summary = ExecutiveSummary::compute(&RecordStore::default());
        assert_eq!(summary.total_customers, 0);
        assert_eq!(summary.average_dwell_time, None);
        assert_eq!(summary.busiest_aisle, None);
        assert_eq!(summary.total_sales, 0.0);
    }
}
