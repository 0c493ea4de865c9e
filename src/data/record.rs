//! Per-sample input records and the sample table loader.

use crate::data::diagnostics::{Exclusion, MalformedReason};
use crate::error::{BilrError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Columns every input table must carry.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "sample_id",
    "bioproject",
    "host_disease",
    "host_age",
    "total_reads",
    "gene_reads",
];

/// Host age in days, as recorded in sample metadata.
///
/// Ages are frequently missing or free text in public metadata, so the raw
/// value is kept rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HostAge {
    /// A finite numeric age in days.
    Days(f64),
    /// A value that did not parse as a number.
    Unparsed(String),
    /// No value recorded.
    Missing,
}

impl HostAge {
    /// Interpret a raw metadata value.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "NA" || trimmed == "na" {
            return HostAge::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => HostAge::Days(v),
            _ => HostAge::Unparsed(trimmed.to_string()),
        }
    }

    /// Numeric age in days, if available.
    pub fn days(&self) -> Option<f64> {
        match self {
            HostAge::Days(d) => Some(*d),
            _ => None,
        }
    }

    /// Check if no value was recorded.
    pub fn is_missing(&self) -> bool {
        matches!(self, HostAge::Missing)
    }
}

impl From<Option<f64>> for HostAge {
    fn from(days: Option<f64>) -> Self {
        match days {
            Some(d) if d.is_finite() => HostAge::Days(d),
            Some(d) => HostAge::Unparsed(d.to_string()),
            None => HostAge::Missing,
        }
    }
}

/// One row of the input table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Unique sample identifier.
    pub sample_id: String,
    /// Study the sample belongs to.
    pub bioproject: String,
    /// Host disease category (`infant`, `healthy`, `CD`, `UC`, ...).
    pub host_disease: String,
    /// Host age in days.
    pub host_age: HostAge,
    /// Total reads sequenced for the sample.
    pub total_reads: u64,
    /// Reads mapped to the gene of interest.
    pub gene_reads: u64,
}

impl SampleRecord {
    /// Create a record without an age.
    pub fn new(
        sample_id: &str,
        bioproject: &str,
        host_disease: &str,
        total_reads: u64,
        gene_reads: u64,
    ) -> Self {
        Self {
            sample_id: sample_id.to_string(),
            bioproject: bioproject.to_string(),
            host_disease: host_disease.to_string(),
            host_age: HostAge::Missing,
            total_reads,
            gene_reads,
        }
    }

    /// Set the host age.
    pub fn with_age(mut self, host_age: HostAge) -> Self {
        self.host_age = host_age;
        self
    }

    /// Set the host age in days.
    pub fn with_age_days(self, days: f64) -> Self {
        self.with_age(HostAge::Days(days))
    }
}

/// A raw row as read from a delimited file, before count validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSampleRow {
    #[serde(default)]
    pub sample_id: Option<String>,
    #[serde(default)]
    pub bioproject: Option<String>,
    #[serde(default)]
    pub host_disease: Option<String>,
    #[serde(default)]
    pub host_age: Option<String>,
    #[serde(default)]
    pub total_reads: Option<String>,
    #[serde(default)]
    pub gene_reads: Option<String>,
}

impl RawSampleRow {
    /// Validate the row into a [`SampleRecord`].
    ///
    /// Count columns must be non-negative integers; anything else is reported
    /// as a [`MalformedReason`].
    pub fn into_record(self) -> std::result::Result<SampleRecord, (String, MalformedReason)> {
        let sample_id = self
            .sample_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| (String::new(), MalformedReason::MissingSampleId))?;

        let total_reads = parse_count("total_reads", self.total_reads.as_deref())
            .map_err(|r| (sample_id.clone(), r))?;
        let gene_reads = parse_count("gene_reads", self.gene_reads.as_deref())
            .map_err(|r| (sample_id.clone(), r))?;

        Ok(SampleRecord {
            sample_id,
            bioproject: self.bioproject.unwrap_or_default().trim().to_string(),
            host_disease: self.host_disease.unwrap_or_default().trim().to_string(),
            host_age: self
                .host_age
                .as_deref()
                .map(HostAge::parse)
                .unwrap_or(HostAge::Missing),
            total_reads,
            gene_reads,
        })
    }
}

/// Parse a read count, accepting integral floats such as `2000000.0`.
fn parse_count(column: &str, raw: Option<&str>) -> std::result::Result<u64, MalformedReason> {
    let value = match raw.map(str::trim) {
        None | Some("") | Some("NA") | Some("na") => {
            return Err(MalformedReason::MissingCount {
                column: column.to_string(),
            })
        }
        Some(v) => v,
    };

    if let Ok(n) = value.parse::<u64>() {
        return Ok(n);
    }

    match value.parse::<f64>() {
        Ok(v) if v.is_finite() && v < 0.0 => Err(MalformedReason::NegativeCount {
            column: column.to_string(),
            value: value.to_string(),
        }),
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v <= u64::MAX as f64 => Ok(v as u64),
        _ => Err(MalformedReason::NonNumericCount {
            column: column.to_string(),
            value: value.to_string(),
        }),
    }
}

/// The validated input table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SampleTable {
    records: Vec<SampleRecord>,
    exclusions: Vec<Exclusion>,
}

impl SampleTable {
    /// Build a table from already-validated records.
    ///
    /// Duplicate sample IDs keep the first occurrence.
    pub fn from_records(records: Vec<SampleRecord>) -> Self {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(records.len());
        let mut exclusions = Vec::new();

        for record in records {
            if seen.insert(record.sample_id.clone()) {
                kept.push(record);
            } else {
                exclusions.push(Exclusion::malformed(
                    &record.sample_id,
                    MalformedReason::DuplicateSampleId,
                ));
            }
        }

        Self {
            records: kept,
            exclusions,
        }
    }

    /// Build a table from raw rows, tallying malformed ones.
    pub fn from_rows<I: IntoIterator<Item = RawSampleRow>>(rows: I) -> Self {
        let mut records = Vec::new();
        let mut exclusions = Vec::new();

        for row in rows {
            match row.into_record() {
                Ok(record) => records.push(record),
                Err((sample_id, reason)) => {
                    exclusions.push(Exclusion::malformed(&sample_id, reason));
                }
            }
        }

        let mut table = Self::from_records(records);
        exclusions.append(&mut table.exclusions);
        table.exclusions = exclusions;
        table
    }

    /// Load from a delimited reader with a header row.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(BilrError::MissingColumn(column.to_string()));
            }
        }

        let mut rows = Vec::new();
        let mut undecodable = Vec::new();
        for (i, row) in rdr.deserialize::<RawSampleRow>().enumerate() {
            match row {
                Ok(row) => rows.push(row),
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    // Header is line 1
                    let line = e.position().map_or(i as u64 + 2, |p| p.line());
                    tracing::warn!(line, error = %e, "skipping undecodable row");
                    undecodable.push(Exclusion::malformed(
                        &format!("line {}", line),
                        MalformedReason::UndecodableRow {
                            message: e.to_string(),
                        },
                    ));
                }
            }
        }

        if rows.is_empty() && undecodable.is_empty() {
            return Err(BilrError::EmptyData("No samples in table".to_string()));
        }

        let mut table = Self::from_rows(rows);
        undecodable.append(&mut table.exclusions);
        table.exclusions = undecodable;
        Ok(table)
    }

    /// Load from a TSV file.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(File::open(path)?, b'\t')
    }

    /// Load from a CSV file.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(File::open(path)?, b',')
    }

    /// Validated records, in input order.
    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    /// Rows rejected while loading.
    pub fn exclusions(&self) -> &[Exclusion] {
        &self.exclusions
    }

    /// Number of validated records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no records survived validation.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
