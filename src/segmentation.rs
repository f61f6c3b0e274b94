//! Customer segmentation with seeded K-Means over raw behavioral features
//!
//! Features are clustered in their raw scale (minutes, dollars, visits), so
//! the purchase amount dominates the Euclidean distance. Scale the inputs
//! before calling if balanced features are wanted.

use std::collections::HashSet;
use std::fmt;

use linfa::prelude::*;
use linfa_clustering::KMeans;
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::{feature_matrix, CustomerRecord, FEATURE_COUNT};
use crate::error::AnalyticsError;

/// Partition label in `[0, k)`; carries no meaning across runs
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Segment(pub usize);

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A customer record with its assigned segment
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LabeledCustomer {
    pub record: CustomerRecord,
    pub segment: Segment,
}

/// K-Means parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationParams {
    /// Number of segments
    pub k: usize,
    /// Seeds centroid initialisation and every randomized choice
    pub seed: u64,
    /// Iteration cap per run
    pub max_iterations: u64,
    /// Convergence tolerance on centroid movement
    pub tolerance: f64,
    /// Independent initialisations; the lowest inertia wins
    pub n_runs: usize,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            k: 3,
            seed: 42,
            max_iterations: 300,
            tolerance: 1e-4,
            n_runs: 10,
        }
    }
}

impl SegmentationParams {
    pub fn new(k: usize, seed: u64) -> Self {
        Self { k, seed, ..Default::default() }
    }
}

/// Mean behavior of one segment
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SegmentProfile {
    pub segment: Segment,
    pub size: usize,
    pub mean_dwell_time: f64,
    pub mean_purchase_amount: f64,
    pub mean_visit_frequency: f64,
}

/// Fitted segmentation with assignments and diagnostics
#[derive(Clone, Debug)]
pub struct Segmentation {
    /// Records in input order with their labels
    pub labeled: Vec<LabeledCustomer>,
    /// Number of segments requested
    pub k: usize,
    /// Cluster centroids in raw feature scale, one row per segment
    pub centroids: Array2<f64>,
    /// Within-cluster sum of squares
    pub inertia: f64,
    features: Array2<f64>,
}

impl PartialEq for Segmentation {
    fn eq(&self, other: &Self) -> bool {
        self.labeled == other.labeled
            && self.k == other.k
            && self.centroids == other.centroids
            && self.inertia.to_bits() == other.inertia.to_bits()
    }
}

impl Segmentation {
    pub fn labels(&self) -> Vec<Segment> {
        self.labeled.iter().map(|c| c.segment).collect()
    }

    /// Get cluster sizes
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k];
        for customer in &self.labeled {
            if customer.segment.0 < self.k {
                sizes[customer.segment.0] += 1;
            }
        }
        sizes
    }

    /// Per-segment feature means, in label order; empty segments are skipped
    pub fn profiles(&self) -> Vec<SegmentProfile> {
        let mut sums = vec![[0.0; FEATURE_COUNT]; self.k];
        let sizes = self.cluster_sizes();

        for customer in &self.labeled {
            let Some(slot) = sums.get_mut(customer.segment.0) else {
                continue;
            };
            for (acc, value) in slot.iter_mut().zip(customer.record.features()) {
                *acc += value;
            }
        }

        sums.into_iter()
            .zip(sizes)
            .enumerate()
            .filter(|(_, (_, size))| *size > 0)
            .map(|(label, (sum, size))| {
                let n = size as f64;
                SegmentProfile {
                    segment: Segment(label),
                    size,
                    mean_dwell_time: sum[0] / n,
                    mean_purchase_amount: sum[1] / n,
                    mean_visit_frequency: sum[2] / n,
                }
            })
            .collect()
    }

    /// Nearest-centroid segment for a new customer's raw features
    pub fn predict(&self, features: &[f64; FEATURE_COUNT]) -> crate::Result<Segment> {
        if let Some(value) = features.iter().find(|v| !v.is_finite()) {
            return Err(AnalyticsError::InvalidParameter {
                parameter: "features",
                reason: format!("{value} is not a finite feature value"),
            });
        }

        let point = ArrayView1::from(features);
        let mut min_distance = f64::INFINITY;
        let mut closest = None;

        for (label, centroid) in self.centroids.outer_iter().enumerate() {
            let distance = euclidean_distance(&point, &centroid);
            if distance < min_distance {
                min_distance = distance;
                closest = Some(label);
            }
        }

        closest.map(Segment).ok_or_else(|| AnalyticsError::Clustering("no usable centroid".to_owned()))
    }

    /// Mean silhouette coefficient over the first `sample_size` customers
    pub fn silhouette_sample(&self, sample_size: usize) -> f64 {
        let n_samples = self.features.nrows().min(sample_size);
        if n_samples < 2 {
            return 0.0;
        }

        let labels = self.labels();
        let mut silhouette_sum = 0.0;

        for i in 0..n_samples {
            let point = self.features.row(i);
            let own = labels[i].0;

            let mut same_cluster = Vec::new();
            let mut other_clusters: Vec<Vec<f64>> = vec![Vec::new(); self.k];

            for j in 0..n_samples {
                if i == j {
                    continue;
                }
                let distance = euclidean_distance(&point, &self.features.row(j));
                let other = labels[j].0;
                if other == own {
                    same_cluster.push(distance);
                } else if other < self.k {
                    other_clusters[other].push(distance);
                }
            }

            // a(i): mean distance within the own cluster
            let a_i = mean(&same_cluster).unwrap_or(0.0);
            // b(i): smallest mean distance to another cluster
            let b_i = other_clusters
                .iter()
                .filter_map(|distances| mean(distances))
                .fold(f64::INFINITY, f64::min);

            silhouette_sum += if b_i.is_infinite() || (a_i == 0.0 && b_i == 0.0) {
                0.0
            } else {
                (b_i - a_i) / a_i.max(b_i)
            };
        }

        silhouette_sum / n_samples as f64
    }
}

/// Segment customers into `k` groups, seeded for reproducibility
pub fn segment(records: &[CustomerRecord], k: usize, seed: u64) -> crate::Result<Segmentation> {
    segment_with(records, &SegmentationParams::new(k, seed))
}

/// Segment customers with explicit K-Means parameters
///
/// Identical records and parameters produce bit-identical results.
pub fn segment_with(records: &[CustomerRecord], params: &SegmentationParams) -> crate::Result<Segmentation> {
    validate(records, params)?;

    let features = feature_matrix(records);
    let n_samples = features.nrows();
    debug!(n_samples, k = params.k, seed = params.seed, "fitting k-means");

    // Dummy targets for unsupervised learning
    let dataset = Dataset::new(features.clone(), Array1::<usize>::zeros(n_samples));
    let rng = StdRng::seed_from_u64(params.seed);

    let model = KMeans::params_with(params.k, rng, L2Dist)
        .max_n_iterations(params.max_iterations)
        .tolerance(params.tolerance)
        .n_runs(params.n_runs)
        .fit(&dataset)?;

    let labels: Array1<usize> = model.predict(&dataset);
    let centroids = member_means(&features, &labels, model.centroids());
    let inertia = compute_inertia(&features, &labels, &centroids);

    let labeled = records
        .iter()
        .zip(labels.iter())
        .map(|(record, &label)| LabeledCustomer {
            record: *record,
            segment: Segment(label),
        })
        .collect();

    info!(k = params.k, inertia, "segmentation complete");
    Ok(Segmentation {
        labeled,
        k: params.k,
        centroids,
        inertia,
        features,
    })
}

fn validate(records: &[CustomerRecord], params: &SegmentationParams) -> crate::Result<()> {
    let invalid = |parameter: &'static str, reason: String| AnalyticsError::InvalidParameter { parameter, reason };

    if params.k == 0 {
        return Err(invalid("k", "at least one segment is required".to_owned()));
    }
    if params.k > records.len() {
        return Err(invalid(
            "k",
            format!("{} segments requested for {} customers", params.k, records.len()),
        ));
    }

    let distinct = distinct_feature_vectors(records);
    if params.k > distinct {
        return Err(invalid(
            "k",
            format!("{} segments requested but only {distinct} distinct customers", params.k),
        ));
    }

    if params.max_iterations == 0 {
        return Err(invalid("max_iterations", "must be at least 1".to_owned()));
    }
    if params.n_runs == 0 {
        return Err(invalid("n_runs", "must be at least 1".to_owned()));
    }
    if !(params.tolerance.is_finite() && params.tolerance > 0.0) {
        return Err(invalid("tolerance", format!("{} is not a positive tolerance", params.tolerance)));
    }
    Ok(())
}

fn distinct_feature_vectors(records: &[CustomerRecord]) -> usize {
    records
        .iter()
        // adding 0.0 folds -0.0 into 0.0
        .map(|record| record.features().map(|v| (v + 0.0).to_bits()))
        .collect::<HashSet<_>>()
        .len()
}

/// Centroids as the exact feature means of each label's members
///
/// linfa stops once centroid movement drops under the tolerance, so its
/// centroids can sit slightly off the final partition. Labels with no
/// members keep the fitted centroid.
fn member_means(features: &Array2<f64>, labels: &Array1<usize>, fitted: &Array2<f64>) -> Array2<f64> {
    let mut centroids = fitted.clone();
    let mut counts = vec![0usize; fitted.nrows()];
    let mut sums = Array2::<f64>::zeros(fitted.dim());

    for (row, &label) in features.outer_iter().zip(labels.iter()) {
        if label < counts.len() {
            counts[label] += 1;
            let mut sum = sums.row_mut(label);
            sum += &row;
        }
    }

    for (label, &count) in counts.iter().enumerate() {
        if count > 0 {
            let mean = &sums.row(label) / count as f64;
            centroids.row_mut(label).assign(&mean);
        }
    }
    centroids
}

/// Compute within-cluster sum of squares (inertia)
fn compute_inertia(features: &Array2<f64>, labels: &Array1<usize>, centroids: &Array2<f64>) -> f64 {
    let mut inertia = 0.0;

    for (i, &cluster) in labels.iter().enumerate() {
        if cluster < centroids.nrows() {
            inertia += features
                .row(i)
                .iter()
                .zip(centroids.row(cluster).iter())
                .map(|(x, y)| (x - y).powi(2))
                .sum::<f64>();
        }
    }

    inertia
}

fn euclidean_distance(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
