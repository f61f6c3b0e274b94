//! Pipeline configuration loaded from TOML

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::Aisle;
use crate::recommend::{DemandForecast, StockLevel, Thresholds};
use crate::segmentation::SegmentationParams;
use crate::synthetic::SyntheticParams;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub synthetic: SyntheticParams,
    pub window: WindowConfig,
    pub trend: TrendConfig,
    pub segmentation: SegmentationParams,
    pub thresholds: Thresholds,
    pub signals: SignalsConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { start_hour: 8, end_hour: 18 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Rolling mean width in data points
    pub window: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self { window: 5 }
    }
}

/// Stock and demand signals supplied by the deployment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalsConfig {
    pub stock: Vec<StockLevel>,
    pub demand: Vec<DemandForecast>,
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            stock: vec![StockLevel { aisle: Aisle::A3, item: "beverages".to_owned(), units: 10 }],
            demand: vec![DemandForecast {
                aisle: Aisle::B1,
                item: "snacks".to_owned(),
                expected_increase_pct: 20.0,
            }],
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl PipelineConfig {
    /// Load from a TOML file; absent fields take their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|source| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.thresholds;
        for (name, value) in [
            ("thresholds.demand_growth_pct", t.demand_growth_pct),
            ("thresholds.high_spend", t.high_spend),
            ("thresholds.low_visit_frequency", t.low_visit_frequency),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Validation(format!("{name} must be a non-negative number, got {value}")));
            }
        }
        if self.trend.window == 0 {
            return Err(ConfigError::Validation("trend.window must be at least 1".to_owned()));
        }
        if self.window.start_hour > self.window.end_hour || self.window.end_hour > 24 {
            return Err(ConfigError::Validation(format!(
                "window must satisfy 0 <= start_hour <= end_hour <= 24, got {}..{}",
                self.window.start_hour, self.window.end_hour
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{body}").unwrap();
        file
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(
            r#"
[segmentation]
k = 4
seed = 7

[thresholds]
high_spend = 150.0

[[signals.stock]]
aisle = "B2"
item = "dairy"
units = 3
"#,
        );

        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.segmentation.k, 4);
        assert_eq!(config.segmentation.seed, 7);
        assert_eq!(config.segmentation.max_iterations, 300);
        assert_eq!(config.thresholds.high_spend, 150.0);
        assert_eq!(config.thresholds.low_stock, 20);
        assert_eq!(config.signals.stock.len(), 1);
        assert_eq!(config.signals.stock[0].aisle, Aisle::B2);
        assert_eq!(config.signals.demand.len(), 1);
        assert_eq!(config.trend.window, 5);
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let raw = include_str!("../config.example.toml");
        let config: PipelineConfig = toml::from_str(raw).unwrap();
        config.validate().unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_unknown_section_rejected() {
        let file = write_config("[branding]\nname = \"x\"\n");
        assert!(matches!(PipelineConfig::load(file.path()), Err(ConfigError::ParseFile { .. })));
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let file = write_config("[thresholds]\nhigh_spend = -1.0\n");
        assert!(matches!(PipelineConfig::load(file.path()), Err(ConfigError::Validation(_))));

        let file = write_config("[window]\nstart_hour = 20\nend_hour = 10\n");
        assert!(matches!(PipelineConfig::load(file.path()), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = PipelineConfig::load("/definitely/not/here.toml");
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
        assert_eq!(PipelineConfig::load_or_default(None).unwrap(), PipelineConfig::default());
    }
}
