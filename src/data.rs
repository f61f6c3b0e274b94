//! Record store: typed customer and traffic datasets

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, Timelike};
use ndarray::Array2;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ingest::{self, Schema};
use crate::synthetic::{self, SyntheticParams};

/// Number of behavioral features per customer
pub const FEATURE_COUNT: usize = 3;

/// Per-customer behavior record
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: i64,
    /// Minutes spent in store
    pub dwell_time: f64,
    /// Spend per visit in dollars
    pub purchase_amount: f64,
    /// Visits per month
    pub visit_frequency: u32,
}

impl CustomerRecord {
    /// Raw-scale feature vector: dwell time, purchase amount, visit frequency
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.dwell_time,
            self.purchase_amount,
            f64::from(self.visit_frequency),
        ]
    }
}

/// Aisle codes known to the store layout
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Aisle {
    A1,
    A2,
    A3,
    B1,
    B2,
    B3,
}

impl Aisle {
    pub const ALL: [Aisle; 6] = [Aisle::A1, Aisle::A2, Aisle::A3, Aisle::B1, Aisle::B2, Aisle::B3];

    pub fn code(self) -> &'static str {
        match self {
            Aisle::A1 => "A1",
            Aisle::A2 => "A2",
            Aisle::A3 => "A3",
            Aisle::B1 => "B1",
            Aisle::B2 => "B2",
            Aisle::B3 => "B3",
        }
    }
}

impl fmt::Display for Aisle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Aisle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Aisle::ALL
            .into_iter()
            .find(|aisle| aisle.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| format!("unknown aisle code `{code}`"))
    }
}

/// Timestamped aisle traffic and sales sample
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrafficSample {
    pub timestamp: NaiveDateTime,
    pub aisle: Aisle,
    pub traffic: u32,
    pub sales: f64,
}

impl TrafficSample {
    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }
}

/// Output of a single ingestion: one schema's worth of records
#[derive(Clone, Debug, PartialEq)]
pub enum RecordSet {
    Customers(Vec<CustomerRecord>),
    Traffic(Vec<TrafficSample>),
}

impl RecordSet {
    pub fn len(&self) -> usize {
        match self {
            RecordSet::Customers(records) => records.len(),
            RecordSet::Traffic(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where a record store comes from
#[derive(Clone, Debug)]
pub enum DataSource {
    Synthetic(SyntheticParams),
    Tables {
        customers: DataFrame,
        traffic: DataFrame,
    },
}

/// Customer and traffic datasets for one pipeline run
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordStore {
    pub customers: Vec<CustomerRecord>,
    pub traffic: Vec<TrafficSample>,
}

impl RecordStore {
    /// Substitute one half of the store with an ingested record set
    pub fn replace(&mut self, records: RecordSet) {
        match records {
            RecordSet::Customers(customers) => self.customers = customers,
            RecordSet::Traffic(traffic) => self.traffic = traffic,
        }
    }

    /// Customer features as a `(n_customers, 3)` matrix in raw scale
    pub fn feature_matrix(&self) -> Array2<f64> {
        feature_matrix(&self.customers)
    }

    /// Purchase amounts in customer order
    pub fn purchase_series(&self) -> Vec<f64> {
        self.customers.iter().map(|c| c.purchase_amount).collect()
    }
}

/// Build a raw-scale feature matrix from customer records
pub fn feature_matrix(records: &[CustomerRecord]) -> Array2<f64> {
    let mut matrix = Array2::zeros((records.len(), FEATURE_COUNT));
    for (mut row, record) in matrix.outer_iter_mut().zip(records) {
        for (slot, value) in row.iter_mut().zip(record.features()) {
            *slot = value;
        }
    }
    matrix
}

/// Load a record store from synthetic parameters or caller-supplied tables
///
/// Table sources are validated against both schemas before anything is
/// returned.
pub fn load(source: DataSource) -> crate::Result<RecordStore> {
    let store = match source {
        DataSource::Synthetic(params) => {
            debug!(seed = params.seed, customers = params.customers, samples = params.samples, "generating synthetic data");
            RecordStore {
                customers: synthetic::customers(&params),
                traffic: synthetic::traffic(&params),
            }
        }
        DataSource::Tables { customers, traffic } => {
            let mut store = RecordStore::default();
            store.replace(ingest::ingest(&customers, Schema::Customer)?);
            store.replace(ingest::ingest(&traffic, Schema::Traffic)?);
            store
        }
    };

    info!(
        customers = store.customers.len(),
        traffic = store.traffic.len(),
        "record store loaded"
    );
    Ok(store)
}

impl From<RecordSet> for RecordStore {
    fn from(records: RecordSet) -> Self {
        let mut store = RecordStore::default();
        store.replace(records);
        store
    }
}
