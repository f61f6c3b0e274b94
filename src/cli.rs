//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::data::FEATURE_COUNT;

/// Retail analytics: traffic windows, purchase trends, customer segments and recommendations
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// TOML configuration file; defaults are used when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Customer CSV (CustomerID,DwellTime,PurchaseAmount,VisitFrequency) replacing synthetic customers
    #[arg(long, global = true)]
    pub customers: Option<PathBuf>,

    /// Traffic CSV (Time,Aisle,Traffic,Sales) replacing synthetic traffic
    #[arg(long, global = true)]
    pub traffic: Option<PathBuf>,

    /// Seed for synthetic data generation
    #[arg(long, global = true)]
    pub data_seed: Option<u64>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Headline KPIs for the loaded data
    Summary,

    /// Traffic samples within an hour-of-day range
    Window {
        /// First hour to include (0-24)
        #[arg(long)]
        start: Option<u32>,
        /// Last hour to include (0-24)
        #[arg(long)]
        end: Option<u32>,
    },

    /// Rolling mean of customer purchase amounts
    Trend {
        /// Rolling window width
        #[arg(short, long)]
        window: Option<usize>,
    },

    /// K-Means customer segmentation
    Segment {
        /// Number of segments
        #[arg(short = 'k', long)]
        clusters: Option<usize>,

        /// Seed for centroid initialisation
        #[arg(long)]
        seed: Option<u64>,

        /// Maximum iterations for K-Means
        #[arg(long)]
        max_iters: Option<u64>,

        /// Tolerance for K-Means convergence
        #[arg(long)]
        tolerance: Option<f64>,

        /// Predict the segment of one customer: "dwell,purchase,visits"
        /// Example: --predict "12,60,3"
        #[arg(short, long)]
        predict: Option<String>,
    },

    /// Segment customers and print rule-based recommendations
    Recommend {
        /// Number of segments
        #[arg(short = 'k', long)]
        clusters: Option<usize>,

        /// Seed for centroid initialisation
        #[arg(long)]
        seed: Option<u64>,

        /// Emit recommendations as JSON
        #[arg(long)]
        json: bool,
    },

    /// Synthetic store traffic heatmap
    Heatmap {
        #[arg(long, default_value = "10")]
        rows: usize,
        #[arg(long, default_value = "10")]
        cols: usize,
    },

    /// Write customers.csv and traffic.csv to a directory
    Export {
        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

/// Parse "dwell,purchase,visits" into a raw feature vector
pub fn parse_customer_features(input: &str) -> crate::Result<[f64; FEATURE_COUNT]> {
    let parts: Vec<&str> = input.split(',').collect();
    if parts.len() != FEATURE_COUNT {
        return Err(crate::AnalyticsError::InvalidParameter {
            parameter: "predict",
            reason: "expected format 'dwell,purchase,visits'".to_owned(),
        });
    }

    let mut features = [0.0; FEATURE_COUNT];
    for (slot, part) in features.iter_mut().zip(&parts) {
        *slot = part.trim().parse().map_err(|_| crate::AnalyticsError::InvalidParameter {
            parameter: "predict",
            reason: format!("invalid value: {part}"),
        })?;
    }
    Ok(features)
}
