//! Custom data ingestion: CSV reading, schema validation and export

use std::collections::HashSet;
use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use chrono::NaiveDateTime;
use polars::prelude::*;
use tracing::{debug, warn};

use crate::data::{Aisle, CustomerRecord, RecordSet, TrafficSample};
use crate::error::{AnalyticsError, SchemaViolation};

pub const CUSTOMER_ID: &str = "CustomerID";
pub const DWELL_TIME: &str = "DwellTime";
pub const PURCHASE_AMOUNT: &str = "PurchaseAmount";
pub const VISIT_FREQUENCY: &str = "VisitFrequency";

pub const TIME: &str = "Time";
pub const AISLE: &str = "Aisle";
pub const TRAFFIC: &str = "Traffic";
pub const SALES: &str = "Sales";

/// Format used when exporting timestamps; fractional seconds only when non-zero
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const ACCEPTED_TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Which record schema a table is validated against
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schema {
    Customer,
    Traffic,
}

impl Schema {
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Schema::Customer => &[CUSTOMER_ID, DWELL_TIME, PURCHASE_AMOUNT, VISIT_FREQUENCY],
            Schema::Traffic => &[TIME, AISLE, TRAFFIC, SALES],
        }
    }
}

/// Read a CSV document with a header row into a DataFrame
///
/// Every field is read as text; numeric coercion happens in [`ingest`] so
/// bad values are reported with their column and row.
pub fn read_csv<R: Read>(mut reader: R) -> crate::Result<DataFrame> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;

    debug!(rows = df.height(), columns = df.width(), "csv table read");
    Ok(df)
}

/// Read a CSV file from disk into a DataFrame
pub fn read_csv_file(path: impl AsRef<Path>) -> crate::Result<DataFrame> {
    let file = File::open(path.as_ref())?;
    read_csv(file)
}

/// Validate and normalize a raw table into a record set
///
/// Nothing is produced unless every row passes. Row numbers in `Type`
/// errors are zero-based data rows (the header is not counted).
pub fn ingest(table: &DataFrame, schema: Schema) -> crate::Result<RecordSet> {
    check_columns(table, schema)?;

    let records = match schema {
        Schema::Customer => RecordSet::Customers(ingest_customers(table)?),
        Schema::Traffic => RecordSet::Traffic(ingest_traffic(table)?),
    };

    debug!(?schema, records = records.len(), "table ingested");
    Ok(records)
}

fn check_columns(table: &DataFrame, schema: Schema) -> crate::Result<()> {
    let present: Vec<String> = table
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let expected = schema.columns();

    let mut violations: Vec<SchemaViolation> = expected
        .iter()
        .filter(|column| !present.iter().any(|name| name == *column))
        .map(|column| SchemaViolation::MissingColumn((*column).to_owned()))
        .collect();
    violations.extend(
        present
            .iter()
            .filter(|name| !expected.contains(&name.as_str()))
            .map(|name| SchemaViolation::UnexpectedColumn(name.clone())),
    );

    if violations.is_empty() {
        Ok(())
    } else {
        Err(AnalyticsError::schema(violations))
    }
}

fn ingest_customers(table: &DataFrame) -> crate::Result<Vec<CustomerRecord>> {
    let ids = integral_column(table, CUSTOMER_ID)?;
    let dwell = float_column(table, DWELL_TIME)?;
    let purchase = float_column(table, PURCHASE_AMOUNT)?;
    let visits = integral_column(table, VISIT_FREQUENCY)?;

    let mut seen = HashSet::with_capacity(ids.len());
    let mut duplicates = Vec::new();
    let mut records = Vec::with_capacity(ids.len());

    for row in 0..table.height() {
        let id = ids[row];
        if id < 1 {
            return Err(AnalyticsError::type_error(CUSTOMER_ID, row, format!("id must be >= 1, got {id}")));
        }
        if !seen.insert(id) {
            duplicates.push(SchemaViolation::DuplicateKey {
                column: CUSTOMER_ID.to_owned(),
                value: id.to_string(),
            });
        }
        if dwell[row] <= 0.0 {
            return Err(AnalyticsError::type_error(DWELL_TIME, row, format!("dwell time must be positive, got {}", dwell[row])));
        }
        if purchase[row] < 0.0 {
            return Err(AnalyticsError::type_error(PURCHASE_AMOUNT, row, format!("purchase amount must be non-negative, got {}", purchase[row])));
        }

        records.push(CustomerRecord {
            id,
            dwell_time: dwell[row],
            purchase_amount: purchase[row],
            visit_frequency: to_u32(VISIT_FREQUENCY, row, visits[row])?,
        });
    }

    if !duplicates.is_empty() {
        return Err(AnalyticsError::schema(duplicates));
    }
    Ok(records)
}

fn ingest_traffic(table: &DataFrame) -> crate::Result<Vec<TrafficSample>> {
    let timestamps = timestamp_column(table, TIME)?;
    let aisles = aisle_column(table, AISLE)?;
    let traffic = integral_column(table, TRAFFIC)?;
    let sales = float_column(table, SALES)?;

    let mut samples = Vec::with_capacity(table.height());
    for row in 0..table.height() {
        if sales[row] < 0.0 {
            return Err(AnalyticsError::type_error(SALES, row, format!("sales must be non-negative, got {}", sales[row])));
        }
        samples.push(TrafficSample {
            timestamp: timestamps[row],
            aisle: aisles[row],
            traffic: to_u32(TRAFFIC, row, traffic[row])?,
            sales: sales[row],
        });
    }

    if !samples.windows(2).all(|w| w[0].timestamp <= w[1].timestamp) {
        warn!(samples = samples.len(), "traffic samples out of order, sorting by timestamp");
        samples.sort_by_key(|sample| sample.timestamp);
    }
    Ok(samples)
}

/// Coerce a column to finite f64 values, accepting numeric strings
fn float_column(table: &DataFrame, name: &str) -> crate::Result<Vec<f64>> {
    let series = table.column(name)?.as_materialized_series();

    let values: Vec<Option<f64>> = match series.dtype() {
        DataType::String => series
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| match value.map(str::trim) {
                None | Some("") => Ok(None),
                Some(text) => text
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|_| AnalyticsError::type_error(name, row, format!("`{text}` is not a number"))),
            })
            .collect::<crate::Result<_>>()?,
        DataType::Float64
        | DataType::Float32
        | DataType::Int64
        | DataType::Int32
        | DataType::UInt64
        | DataType::UInt32 => series.cast(&DataType::Float64)?.f64()?.into_iter().collect(),
        other => {
            return Err(AnalyticsError::type_error(name, 0, format!("expected a numeric column, found {other}")));
        }
    };

    values
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(v) if v.is_finite() => Ok(v),
            Some(v) => Err(AnalyticsError::type_error(name, row, format!("{v} is not finite"))),
            None => Err(AnalyticsError::type_error(name, row, "missing value")),
        })
        .collect()
}

/// Coerce a column to whole numbers; `2.0` is accepted, `2.5` is not
fn integral_column(table: &DataFrame, name: &str) -> crate::Result<Vec<i64>> {
    float_column(table, name)?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
                Ok(value as i64)
            } else {
                Err(AnalyticsError::type_error(name, row, format!("{value} is not a whole number")))
            }
        })
        .collect()
}

fn to_u32(column: &str, row: usize, value: i64) -> crate::Result<u32> {
    u32::try_from(value)
        .map_err(|_| AnalyticsError::type_error(column, row, format!("{value} is not a non-negative count")))
}

fn string_values(table: &DataFrame, name: &str) -> crate::Result<Vec<String>> {
    let series = table.column(name)?.as_materialized_series().cast(&DataType::String)?;
    series
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value
                .map(|text| text.trim().to_owned())
                .ok_or_else(|| AnalyticsError::type_error(name, row, "missing value"))
        })
        .collect()
}

fn timestamp_column(table: &DataFrame, name: &str) -> crate::Result<Vec<NaiveDateTime>> {
    string_values(table, name)?
        .into_iter()
        .enumerate()
        .map(|(row, text)| {
            parse_timestamp(&text)
                .ok_or_else(|| AnalyticsError::type_error(name, row, format!("`{text}` is not a timestamp")))
        })
        .collect()
}

fn aisle_column(table: &DataFrame, name: &str) -> crate::Result<Vec<Aisle>> {
    string_values(table, name)?
        .into_iter()
        .enumerate()
        .map(|(row, text)| text.parse::<Aisle>().map_err(|reason| AnalyticsError::type_error(name, row, reason)))
        .collect()
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    ACCEPTED_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

/// Customer records as a DataFrame with the canonical column names
pub fn customer_frame(records: &[CustomerRecord]) -> crate::Result<DataFrame> {
    let df = df!(
        CUSTOMER_ID => records.iter().map(|r| r.id).collect::<Vec<i64>>(),
        DWELL_TIME => records.iter().map(|r| r.dwell_time).collect::<Vec<f64>>(),
        PURCHASE_AMOUNT => records.iter().map(|r| r.purchase_amount).collect::<Vec<f64>>(),
        VISIT_FREQUENCY => records.iter().map(|r| i64::from(r.visit_frequency)).collect::<Vec<i64>>()
    )?;
    Ok(df)
}

/// Traffic samples as a DataFrame with the canonical column names
pub fn traffic_frame(samples: &[TrafficSample]) -> crate::Result<DataFrame> {
    let df = df!(
        TIME => samples
            .iter()
            .map(|s| s.timestamp.format(TIMESTAMP_FORMAT).to_string())
            .collect::<Vec<String>>(),
        AISLE => samples.iter().map(|s| s.aisle.code().to_owned()).collect::<Vec<String>>(),
        TRAFFIC => samples.iter().map(|s| i64::from(s.traffic)).collect::<Vec<i64>>(),
        SALES => samples.iter().map(|s| s.sales).collect::<Vec<f64>>()
    )?;
    Ok(df)
}

/// Write customer records as CSV
pub fn export_customers<W: Write>(records: &[CustomerRecord], writer: W) -> crate::Result<()> {
    let mut df = customer_frame(records)?;
    write_csv(&mut df, writer)
}

/// Write traffic samples as CSV
pub fn export_traffic<W: Write>(samples: &[TrafficSample], writer: W) -> crate::Result<()> {
    let mut df = traffic_frame(samples)?;
    write_csv(&mut df, writer)
}

fn write_csv<W: Write>(df: &mut DataFrame, mut writer: W) -> crate::Result<()> {
    CsvWriter::new(&mut writer).include_header(true).finish(df)?;
    writer.flush()?;
    Ok(())
}
