//! Plain-text rendering of pipeline results for the console

use ndarray::Array2;

use crate::data::TrafficSample;
use crate::recommend::{Category, Recommendation};
use crate::segmentation::Segmentation;
use crate::summary::ExecutiveSummary;
use crate::trend::TrendPoint;

/// Customers sampled for the silhouette diagnostic
const SILHOUETTE_SAMPLE: usize = 100;

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

fn or_dash(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "-".to_owned(), |v| format!("{v:.decimals$}"))
}

pub fn render_summary(summary: &ExecutiveSummary) -> String {
    let mut out = String::new();
    push_line(&mut out, "=== Executive Summary ===");
    push_line(&mut out, &format!("Total customers:       {}", summary.total_customers));
    push_line(&mut out, &format!("Average dwell time:    {} minutes", or_dash(summary.average_dwell_time, 1)));
    push_line(&mut out, &format!("Average purchase:      ${}", or_dash(summary.average_purchase, 2)));
    push_line(&mut out, &format!("Total customer spend:  ${:.2}", summary.total_customer_spend));
    push_line(&mut out, &format!("Total traffic:         {}", summary.total_traffic));
    push_line(&mut out, &format!("Total sales:           ${:.2}", summary.total_sales));
    let busiest = summary.busiest_aisle.map_or_else(|| "-".to_owned(), |a| a.to_string());
    push_line(&mut out, &format!("Busiest aisle:         {busiest}"));
    out
}

pub fn render_traffic(samples: &[TrafficSample], start_hour: u32, end_hour: u32) -> String {
    let mut out = String::new();
    push_line(&mut out, &format!("=== Traffic {start_hour:02}:00-{end_hour:02}:00 ({} samples) ===", samples.len()));
    push_line(&mut out, "  Time                | Aisle | Traffic |    Sales");
    push_line(&mut out, "  --------------------|-------|---------|---------");
    for sample in samples {
        push_line(&mut out, &format!(
            "  {} | {:5} | {:7} | {:8.2}",
            sample.timestamp.format("%Y-%m-%d %H:%M:%S"),
            sample.aisle.code(),
            sample.traffic,
            sample.sales
        ));
    }
    out
}

pub fn render_trend(points: &[TrendPoint], window: usize) -> String {
    let mut out = String::new();
    push_line(&mut out, &format!("=== Purchase Trend (rolling mean, window {window}) ==="));
    push_line(&mut out, "  Customer | Purchase | Rolling avg");
    push_line(&mut out, "  ---------|----------|------------");
    for point in points {
        push_line(&mut out, &format!(
            "  {:8} | {:8.2} | {:>11}",
            point.customer_id,
            point.purchase_amount,
            or_dash(point.rolling_avg, 2)
        ));
    }
    out
}

pub fn render_segmentation(segmentation: &Segmentation) -> String {
    let mut out = String::new();
    let total = segmentation.labeled.len();

    push_line(&mut out, "=== Cluster Statistics ===");
    push_line(&mut out, &format!("Number of segments: {}", segmentation.k));
    push_line(&mut out, &format!("Total customers: {total}"));
    push_line(&mut out, &format!("Within-cluster sum of squares (Inertia): {:.2}", segmentation.inertia));
    push_line(&mut out, &format!(
        "Silhouette score (sample): {:.3}",
        segmentation.silhouette_sample(SILHOUETTE_SAMPLE)
    ));

    push_line(&mut out, "\nSegment profiles:");
    push_line(&mut out, "  Segment |  Size |  Share | Dwell (min) | Purchase ($) | Visits/month");
    push_line(&mut out, "  --------|-------|--------|-------------|--------------|-------------");
    for profile in segmentation.profiles() {
        let share = profile.size as f64 / total.max(1) as f64 * 100.0;
        push_line(&mut out, &format!(
            "  {:7} | {:5} | {:5.1}% | {:11.2} | {:12.2} | {:12.2}",
            profile.segment,
            profile.size,
            share,
            profile.mean_dwell_time,
            profile.mean_purchase_amount,
            profile.mean_visit_frequency
        ));
    }
    out
}

pub fn render_recommendations(recommendations: &[Recommendation]) -> String {
    let mut out = String::new();
    push_line(&mut out, "=== Actionable Recommendations ===");
    if recommendations.is_empty() {
        push_line(&mut out, "No thresholds crossed; nothing to recommend.");
        return out;
    }

    let mut current = None;
    for recommendation in recommendations {
        if current != Some(recommendation.category) {
            current = Some(recommendation.category);
            let heading = match recommendation.category {
                Category::Inventory => "Inventory Optimization",
                Category::Staffing => "Staff Allocation",
                Category::Engagement => "Customer Engagement",
            };
            push_line(&mut out, &format!("\n{heading}"));
        }
        push_line(&mut out, &format!("  - {}", recommendation.message));
    }
    out
}

pub fn render_heatmap(grid: &Array2<f64>) -> String {
    let mut out = String::new();
    push_line(&mut out, "=== Store Traffic Heatmap (rows: sections, columns: aisles) ===");
    for row in grid.outer_iter() {
        let cells: Vec<String> = row.iter().map(|v| format!("{v:5.1}")).collect();
        push_line(&mut out, &format!("  {}", cells.join(" ")));
    }
    out
}
