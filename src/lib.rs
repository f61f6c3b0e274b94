//! Retail Insights: analytics over customer behavior and aisle traffic
//!
//! The pipeline turns raw customer and traffic records into time-windowed
//! traffic snapshots, rolling purchase trends, K-Means customer segments
//! and rule-based recommendations. Every stage is a pure function over
//! caller-owned data.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod recommend;
pub mod report;
pub mod segmentation;
pub mod summary;
pub mod synthetic;
pub mod trend;
pub mod window;

// Re-export public items for easier access
pub use cli::Args;
pub use config::{ConfigError, PipelineConfig};
pub use data::{load, Aisle, CustomerRecord, DataSource, RecordSet, RecordStore, TrafficSample};
pub use error::{AnalyticsError, SchemaViolation};
pub use ingest::{ingest, Schema};
pub use pipeline::{Pipeline, SegmentationCache};
pub use recommend::{synthesize, OperationalSignals, Recommendation, Thresholds};
pub use segmentation::{segment, LabeledCustomer, Segment, Segmentation, SegmentationParams};
pub use summary::ExecutiveSummary;
pub use trend::rolling_mean;
pub use window::filter;

/// Common result type used throughout the library
pub type Result<T, E = AnalyticsError> = std::result::Result<T, E>;
