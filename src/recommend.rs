//! Rule-based recommendations from segment profiles and operational signals

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{Aisle, TrafficSample};
use crate::segmentation::{Segment, SegmentProfile};
use crate::window;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Inventory,
    Staffing,
    Engagement,
}

/// Segment feature a rule looked at
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Feature {
    DwellTime,
    PurchaseAmount,
    VisitFrequency,
}

/// The signal that made a rule fire
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum TriggeringSignal {
    StockLevel { aisle: Aisle, item: String, units: u32 },
    DemandForecast { aisle: Aisle, item: String, expected_increase_pct: f64 },
    AisleTraffic { aisle: Aisle, traffic: u64 },
    PeakHours { start_hour: u32, end_hour: u32, peak_traffic: u64 },
    Segment { segment: Segment, feature: Feature, value: f64 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommendation {
    pub category: Category,
    pub message: String,
    pub signal: TriggeringSignal,
}

/// Current on-shelf units of an item
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockLevel {
    pub aisle: Aisle,
    pub item: String,
    pub units: u32,
}

/// Expected demand change for an item
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DemandForecast {
    pub aisle: Aisle,
    pub item: String,
    pub expected_increase_pct: f64,
}

/// Externally supplied operational metrics
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OperationalSignals {
    pub stock: Vec<StockLevel>,
    pub demand: Vec<DemandForecast>,
    pub aisle_traffic: BTreeMap<Aisle, u64>,
    pub hourly_traffic: BTreeMap<u32, u64>,
}

impl OperationalSignals {
    /// Traffic signals aggregated from samples, without stock or demand data
    pub fn from_samples(samples: &[TrafficSample]) -> Self {
        Self {
            aisle_traffic: window::traffic_by_aisle(samples),
            hourly_traffic: window::traffic_by_hour(samples),
            ..Default::default()
        }
    }

    pub fn with_stock(mut self, stock: Vec<StockLevel>) -> Self {
        self.stock = stock;
        self
    }

    pub fn with_demand(mut self, demand: Vec<DemandForecast>) -> Self {
        self.demand = demand;
        self
    }
}

/// Trigger levels for every rule
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Stock strictly below this many units triggers a restock
    pub low_stock: u32,
    /// Expected demand growth (percent) at or above this triggers more stock
    pub demand_growth_pct: f64,
    /// Aisle traffic at or above this triggers extra aisle staff
    pub high_traffic: u64,
    /// Hourly traffic at or above this marks a peak hour
    pub peak_hour_traffic: u64,
    /// Segment mean purchase at or above this earns loyalty rewards
    pub high_spend: f64,
    /// Segment mean visits at or below this earns discount coupons
    pub low_visit_frequency: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            low_stock: 20,
            demand_growth_pct: 15.0,
            high_traffic: 300,
            peak_hour_traffic: 180,
            high_spend: 120.0,
            low_visit_frequency: 3.0,
        }
    }
}

/// Evaluate every rule: inventory first, then staffing, then engagement
///
/// Rules are independent, so any number may fire; the output order is
/// fixed for identical inputs.
pub fn synthesize(profiles: &[SegmentProfile], signals: &OperationalSignals, thresholds: &Thresholds) -> Vec<Recommendation> {
    let mut recommendations = inventory(signals, thresholds);
    recommendations.extend(staffing(signals, thresholds));
    recommendations.extend(engagement(profiles, thresholds));

    debug!(count = recommendations.len(), "recommendations synthesized");
    recommendations
}

fn inventory(signals: &OperationalSignals, thresholds: &Thresholds) -> Vec<Recommendation> {
    let low_stock = signals
        .stock
        .iter()
        .filter(|level| level.units < thresholds.low_stock)
        .map(|level| Recommendation {
            category: Category::Inventory,
            message: format!(
                "Low-stock alert: restock {} in Aisle {} (current level: {} units).",
                level.item, level.aisle, level.units
            ),
            signal: TriggeringSignal::StockLevel {
                aisle: level.aisle,
                item: level.item.clone(),
                units: level.units,
            },
        });

    let high_demand = signals
        .demand
        .iter()
        .filter(|forecast| forecast.expected_increase_pct >= thresholds.demand_growth_pct)
        .map(|forecast| Recommendation {
            category: Category::Inventory,
            message: format!(
                "High demand prediction: increase stock of {} for Aisle {} (expected {}% increase).",
                forecast.item, forecast.aisle, forecast.expected_increase_pct
            ),
            signal: TriggeringSignal::DemandForecast {
                aisle: forecast.aisle,
                item: forecast.item.clone(),
                expected_increase_pct: forecast.expected_increase_pct,
            },
        });

    low_stock.chain(high_demand).collect()
}

fn staffing(signals: &OperationalSignals, thresholds: &Thresholds) -> Vec<Recommendation> {
    let mut recommendations: Vec<Recommendation> = signals
        .aisle_traffic
        .iter()
        .filter(|(_, &traffic)| traffic >= thresholds.high_traffic)
        .map(|(&aisle, &traffic)| Recommendation {
            category: Category::Staffing,
            message: format!("High traffic: assign additional staff to Aisle {aisle} ({traffic} shoppers)."),
            signal: TriggeringSignal::AisleTraffic { aisle, traffic },
        })
        .collect();

    for (start_hour, end_hour, peak_traffic) in peak_hour_runs(&signals.hourly_traffic, thresholds.peak_hour_traffic) {
        recommendations.push(Recommendation {
            category: Category::Staffing,
            message: format!(
                "Peak hours: assign additional staff between {} and {} (up to {peak_traffic} shoppers per hour).",
                clock(start_hour),
                clock(end_hour + 1)
            ),
            signal: TriggeringSignal::PeakHours { start_hour, end_hour, peak_traffic },
        });
    }

    recommendations
}

/// Contiguous runs of hours at or above `threshold` as `(first, last, max)`
fn peak_hour_runs(hourly: &BTreeMap<u32, u64>, threshold: u64) -> Vec<(u32, u32, u64)> {
    let mut runs: Vec<(u32, u32, u64)> = Vec::new();
    for (&hour, &traffic) in hourly.iter().filter(|(_, &traffic)| traffic >= threshold) {
        match runs.last_mut() {
            Some((_, last, peak)) if *last + 1 == hour => {
                *last = hour;
                *peak = (*peak).max(traffic);
            }
            _ => runs.push((hour, hour, traffic)),
        }
    }
    runs
}

fn clock(hour: u32) -> String {
    match hour % 24 {
        0 => "12 AM".to_owned(),
        12 => "12 PM".to_owned(),
        h if h < 12 => format!("{h} AM"),
        h => format!("{} PM", h - 12),
    }
}

fn engagement(profiles: &[SegmentProfile], thresholds: &Thresholds) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    for profile in profiles {
        if profile.mean_purchase_amount >= thresholds.high_spend {
            recommendations.push(Recommendation {
                category: Category::Engagement,
                message: format!(
                    "Segment {}: offer loyalty program rewards at checkout (average spend ${:.2}).",
                    profile.segment, profile.mean_purchase_amount
                ),
                signal: TriggeringSignal::Segment {
                    segment: profile.segment,
                    feature: Feature::PurchaseAmount,
                    value: profile.mean_purchase_amount,
                },
            });
        }
        if profile.mean_visit_frequency <= thresholds.low_visit_frequency {
            recommendations.push(Recommendation {
                category: Category::Engagement,
                message: format!(
                    "Segment {}: send 10% discount coupons via email (average {:.1} visits per month).",
                    profile.segment, profile.mean_visit_frequency
                ),
                signal: TriggeringSignal::Segment {
                    segment: profile.segment,
                    feature: Feature::VisitFrequency,
                    value: profile.mean_visit_frequency,
                },
            });
        }
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(label: usize, purchase: f64, visits: f64) -> SegmentProfile {
        SegmentProfile {
            segment: Segment(label),
            size: 10,
            mean_dwell_time: 15.0,
            mean_purchase_amount: purchase,
            mean_visit_frequency: visits,
        }
    }

    fn signals() -> OperationalSignals {
        OperationalSignals {
            stock: vec![
                StockLevel { aisle: Aisle::A3, item: "beverages".to_owned(), units: 10 },
                StockLevel { aisle: Aisle::A1, item: "bread".to_owned(), units: 40 },
            ],
            demand: vec![DemandForecast {
                aisle: Aisle::B1,
                item: "snacks".to_owned(),
                expected_increase_pct: 20.0,
            }],
            aisle_traffic: BTreeMap::from([(Aisle::A1, 320), (Aisle::B2, 90)]),
            hourly_traffic: BTreeMap::from([(15, 100), (16, 190), (17, 210), (20, 185)]),
        }
    }

    #[test]
    fn test_fixed_category_order() {
        let profiles = [profile(0, 150.0, 2.0), profile(1, 60.0, 6.0)];
        let recs = synthesize(&profiles, &signals(), &Thresholds::default());

        let categories: Vec<Category> = recs.iter().map(|r| r.category).collect();
        assert_eq!(
            categories,
            vec![
                Category::Inventory,
                Category::Inventory,
                Category::Staffing,
                Category::Staffing,
                Category::Staffing,
                Category::Engagement,
                Category::Engagement,
            ]
        );
        assert_eq!(
            recs[0].message,
            "Low-stock alert: restock beverages in Aisle A3 (current level: 10 units)."
        );
        assert_eq!(
            recs[1].message,
            "High demand prediction: increase stock of snacks for Aisle B1 (expected 20% increase)."
        );
    }

    #[test]
    fn test_nothing_fires_below_thresholds() {
        let quiet = OperationalSignals {
            stock: vec![StockLevel { aisle: Aisle::A1, item: "milk".to_owned(), units: 20 }],
            demand: vec![DemandForecast { aisle: Aisle::A2, item: "tea".to_owned(), expected_increase_pct: 5.0 }],
            aisle_traffic: BTreeMap::from([(Aisle::A1, 299)]),
            hourly_traffic: BTreeMap::from([(9, 179)]),
        };
        let recs = synthesize(&[profile(0, 119.99, 3.5)], &quiet, &Thresholds::default());
        assert!(recs.is_empty());
    }

    #[test]
    fn test_peak_hours_are_merged() {
        let recs = staffing(&signals(), &Thresholds::default());
        let peaks: Vec<&TriggeringSignal> = recs
            .iter()
            .map(|r| &r.signal)
            .filter(|s| matches!(s, TriggeringSignal::PeakHours { .. }))
            .collect();

        assert_eq!(
            peaks,
            vec![
                &TriggeringSignal::PeakHours { start_hour: 16, end_hour: 17, peak_traffic: 210 },
                &TriggeringSignal::PeakHours { start_hour: 20, end_hour: 20, peak_traffic: 185 },
            ]
        );
        assert!(recs.iter().any(|r| r.message.contains("between 4 PM and 6 PM")));
    }

    #[test]
    fn test_segment_can_fire_both_engagement_rules() {
        let recs = engagement(&[profile(2, 200.0, 1.0)], &Thresholds::default());
        assert_eq!(recs.len(), 2);
        assert!(matches!(
            recs[0].signal,
            TriggeringSignal::Segment { segment: Segment(2), feature: Feature::PurchaseAmount, .. }
        ));
        assert!(matches!(
            recs[1].signal,
            TriggeringSignal::Segment { feature: Feature::VisitFrequency, .. }
        ));
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let strict = Thresholds { low_stock: 5, high_traffic: 1_000, peak_hour_traffic: 1_000, demand_growth_pct: 50.0, ..Default::default() };
        let recs = synthesize(&[], &signals(), &strict);
        assert!(recs.is_empty());
    }

    #[test]
    fn test_signals_from_samples() {
        use chrono::NaiveDate;
        let at = |hour| NaiveDate::from_ymd_opt(2023, 11, 15).unwrap().and_hms_opt(hour, 0, 0).unwrap();
        let samples = vec![
            TrafficSample { timestamp: at(9), aisle: Aisle::A1, traffic: 100, sales: 10.0 },
            TrafficSample { timestamp: at(9), aisle: Aisle::B1, traffic: 50, sales: 10.0 },
            TrafficSample { timestamp: at(10), aisle: Aisle::A1, traffic: 70, sales: 10.0 },
        ];

        let signals = OperationalSignals::from_samples(&samples);
        assert_eq!(signals.aisle_traffic.get(&Aisle::A1), Some(&170));
        assert_eq!(signals.hourly_traffic.get(&9), Some(&150));
        assert!(signals.stock.is_empty());
    }
}
