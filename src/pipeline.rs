//! Pipeline runs over one record store, with an optional segmentation cache

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::config::PipelineConfig;
use crate::data::{CustomerRecord, RecordStore, TrafficSample};
use crate::recommend::{self, OperationalSignals, Recommendation};
use crate::segmentation::{self, Segmentation, SegmentationParams};
use crate::summary::ExecutiveSummary;
use crate::trend::{self, TrendPoint};
use crate::window;

const DEFAULT_CACHE_CAPACITY: usize = 16;

/// Exact-input key: parameter values and record bit patterns
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct SegmentationKey {
    k: usize,
    seed: u64,
    max_iterations: u64,
    tolerance: u64,
    n_runs: usize,
    records: Vec<(i64, u64, u64, u32)>,
}

impl SegmentationKey {
    fn new(records: &[CustomerRecord], params: &SegmentationParams) -> Self {
        Self {
            k: params.k,
            seed: params.seed,
            max_iterations: params.max_iterations,
            tolerance: params.tolerance.to_bits(),
            n_runs: params.n_runs,
            records: records
                .iter()
                .map(|r| (r.id, r.dwell_time.to_bits(), r.purchase_amount.to_bits(), r.visit_frequency))
                .collect(),
        }
    }
}

/// Read-through memo of segmentation results
///
/// Only successful fits are stored. Entries are evicted oldest-first once
/// `capacity` is reached.
#[derive(Debug)]
pub struct SegmentationCache {
    entries: HashMap<SegmentationKey, Segmentation>,
    order: VecDeque<SegmentationKey>,
    capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

impl Default for SegmentationCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl SegmentationCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
            hits: 0,
            misses: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_or_fit(&mut self, records: &[CustomerRecord], params: &SegmentationParams) -> crate::Result<Segmentation> {
        let key = SegmentationKey::new(records, params);
        if let Some(hit) = self.entries.get(&key) {
            self.hits += 1;
            debug!(k = params.k, seed = params.seed, "segmentation cache hit");
            return Ok(hit.clone());
        }

        self.misses += 1;
        let fitted = segmentation::segment_with(records, params)?;

        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, fitted.clone());
        Ok(fitted)
    }
}

/// One analytics run: a record store, its configuration and an optional cache
#[derive(Debug)]
pub struct Pipeline {
    pub config: PipelineConfig,
    pub store: RecordStore,
    cache: Option<SegmentationCache>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, store: RecordStore) -> Self {
        Self { config, store, cache: None }
    }

    pub fn with_cache(mut self, cache: SegmentationCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&SegmentationCache> {
        self.cache.as_ref()
    }

    pub fn summary(&self) -> ExecutiveSummary {
        ExecutiveSummary::compute(&self.store)
    }

    /// Traffic samples inside the configured hour window
    pub fn windowed_traffic(&self) -> crate::Result<Vec<TrafficSample>> {
        let w = &self.config.window;
        window::filter(&self.store.traffic, w.start_hour, w.end_hour)
    }

    pub fn purchase_trend(&self) -> crate::Result<Vec<TrendPoint>> {
        trend::purchase_trend(&self.store.customers, self.config.trend.window)
    }

    pub fn segment(&mut self) -> crate::Result<Segmentation> {
        let params = self.config.segmentation.clone();
        match self.cache.as_mut() {
            Some(cache) => cache.get_or_fit(&self.store.customers, &params),
            None => segmentation::segment_with(&self.store.customers, &params),
        }
    }

    /// Operational signals: configured stock and demand plus observed traffic
    pub fn signals(&self) -> OperationalSignals {
        OperationalSignals::from_samples(&self.store.traffic)
            .with_stock(self.config.signals.stock.clone())
            .with_demand(self.config.signals.demand.clone())
    }

    /// Segment customers and synthesize recommendations from the result
    pub fn recommend(&mut self) -> crate::Result<(Segmentation, Vec<Recommendation>)> {
        let segmentation = self.segment()?;
        let recommendations = recommend::synthesize(&segmentation.profiles(), &self.signals(), &self.config.thresholds);
        Ok((segmentation, recommendations))
    }
}
