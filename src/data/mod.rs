//! Observation table loaded once at startup.
//!
//! The CSV header is a hard contract: every column in [`REQUIRED_COLUMNS`] must be present or
//! loading fails. Individual rows that do not parse are dropped and reported in the manifest.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::logging;

pub const REQUIRED_COLUMNS: [&str; 7] = [
    "target",
    "target_chemblid",
    "year",
    "cumsum",
    "best_phase",
    "peak_to_current",
    "r_difference",
];

/// One (target, entity, year) observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub target_name: String,
    pub entity_id: String,
    pub year: i32,
    pub cumulative_value: f64,
    pub best_phase: f64,
    pub peak_to_current_ratio: f64,
    pub relative_difference: f64,
}

/// Open interval on `peak_to_current_ratio`. Both bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioRange {
    pub min: f64,
    pub max: f64,
}

impl RatioRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, ratio: f64) -> bool {
        self.min < ratio && ratio < self.max
    }
}

impl Default for RatioRange {
    /// Initial position of the attention-score slider.
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaReport {
    pub columns: Vec<String>,
    pub missing: Vec<String>,
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub path: String,
    pub hash_sha256: String,
    pub row_count: u64,
    pub bad_rows: u64,
    pub targets: usize,
    pub entities: usize,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    pub columns: Vec<String>,
    pub warnings: Vec<String>,
    pub loaded_at: String,
}

/// Read-only dataset handle shared by every handler.
#[derive(Debug, Clone)]
pub struct Dataset {
    rows: Vec<Observation>,
    manifest: DatasetManifest,
}

impl Dataset {
    /// Build a dataset from rows already in memory (no file, empty hash).
    pub fn from_rows(rows: Vec<Observation>) -> Self {
        let manifest = summarize("<memory>", String::new(), Vec::new(), &rows, 0, Vec::new());
        Self { rows, manifest }
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn manifest(&self) -> &DatasetManifest {
        &self.manifest
    }

    /// Rows whose attention score lies strictly inside `range`.
    pub fn within_ratio(&self, range: RatioRange) -> Vec<&Observation> {
        self.rows
            .iter()
            .filter(|row| range.contains(row.peak_to_current_ratio))
            .collect()
    }

    /// Distinct target names, sorted, for the category dropdown.
    pub fn target_names(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.target_name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Check the header of `path` against [`REQUIRED_COLUMNS`]. Extra columns are allowed.
pub fn validate_schema(path: &Path) -> Result<SchemaReport> {
    let mut reader = csv_reader(path)?;
    let columns: Vec<String> = reader
        .headers()
        .with_context(|| format!("reading header of {}", path.display()))?
        .iter()
        .map(|s| s.to_string())
        .collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| !columns.iter().any(|c| c == *name))
        .map(|s| s.to_string())
        .collect();
    let ok = missing.is_empty();
    let message = if ok {
        "schema ok".to_string()
    } else {
        format!("schema mismatch: missing {:?} in {:?}", missing, columns)
    };
    Ok(SchemaReport { columns, missing, ok, message })
}

/// Load the observation table. Fails on I/O errors and schema mismatch; drops unparsable rows.
pub fn load_csv(path: &Path) -> Result<Dataset> {
    let schema = validate_schema(path)?;
    if !schema.ok {
        bail!("{}: {}", path.display(), schema.message);
    }
    let hash = file_sha256(path)?;
    let idx = ColumnIndex::resolve(&schema.columns)?;

    let mut reader = csv_reader(path)?;
    let mut rows = Vec::new();
    let mut warnings = Vec::new();
    let mut bad_rows = 0u64;

    for (n, record) in reader.records().enumerate() {
        // header is line 1
        let line = n as u64 + 2;
        let parsed = record
            .map_err(|e| e.to_string())
            .and_then(|rec| idx.parse(&rec));
        match parsed {
            Ok(row) => rows.push(row),
            Err(err) => {
                bad_rows += 1;
                let diag = format!("bad_row: line {}: {}", line, err);
                logging::log_row_rejected(line, &err);
                warnings.push(diag);
            }
        }
    }

    let manifest = summarize(
        &path.display().to_string(),
        hash,
        schema.columns,
        &rows,
        bad_rows,
        warnings,
    );
    logging::log_dataset_loaded(&manifest);
    Ok(Dataset { rows, manifest })
}

pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn csv_reader(path: &Path) -> Result<csv::Reader<File>> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))
}

struct ColumnIndex {
    target: usize,
    entity: usize,
    year: usize,
    cumsum: usize,
    best_phase: usize,
    peak_to_current: usize,
    r_difference: usize,
}

impl ColumnIndex {
    fn resolve(columns: &[String]) -> Result<Self> {
        let find = |name: &str| {
            columns
                .iter()
                .position(|c| c == name)
                .with_context(|| format!("missing column {}", name))
        };
        Ok(Self {
            target: find("target")?,
            entity: find("target_chemblid")?,
            year: find("year")?,
            cumsum: find("cumsum")?,
            best_phase: find("best_phase")?,
            peak_to_current: find("peak_to_current")?,
            r_difference: find("r_difference")?,
        })
    }

    fn parse(&self, rec: &csv::StringRecord) -> Result<Observation, String> {
        Ok(Observation {
            target_name: text_field(rec, self.target, "target")?,
            entity_id: text_field(rec, self.entity, "target_chemblid")?,
            year: year_field(rec, self.year)?,
            cumulative_value: num_field(rec, self.cumsum, "cumsum")?,
            best_phase: num_field(rec, self.best_phase, "best_phase")?,
            peak_to_current_ratio: num_field(rec, self.peak_to_current, "peak_to_current")?,
            relative_difference: num_field(rec, self.r_difference, "r_difference")?,
        })
    }
}

fn raw_field<'r>(rec: &'r csv::StringRecord, idx: usize, name: &str) -> Result<&'r str, String> {
    match rec.get(idx) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(format!("empty {}", name)),
    }
}

fn text_field(rec: &csv::StringRecord, idx: usize, name: &str) -> Result<String, String> {
    raw_field(rec, idx, name).map(|s| s.to_string())
}

fn num_field(rec: &csv::StringRecord, idx: usize, name: &str) -> Result<f64, String> {
    let raw = raw_field(rec, idx, name)?;
    let v = raw
        .parse::<f64>()
        .map_err(|e| format!("bad {} {:?}: {}", name, raw, e))?;
    if !v.is_finite() {
        return Err(format!("non-finite {}: {}", name, raw));
    }
    Ok(v)
}

/// Years may be written as `1995` or `1995.0` depending on the exporter.
fn year_field(rec: &csv::StringRecord, idx: usize) -> Result<i32, String> {
    let raw = raw_field(rec, idx, "year")?;
    if let Ok(y) = raw.parse::<i32>() {
        return Ok(y);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v >= i32::MIN as f64 && v <= i32::MAX as f64 => Ok(v as i32),
        _ => Err(format!("bad year {:?}", raw)),
    }
}

fn summarize(
    path: &str,
    hash: String,
    columns: Vec<String>,
    rows: &[Observation],
    bad_rows: u64,
    warnings: Vec<String>,
) -> DatasetManifest {
    let targets = rows.iter().map(|r| r.target_name.as_str()).collect::<BTreeSet<_>>();
    let entities = rows.iter().map(|r| r.entity_id.as_str()).collect::<BTreeSet<_>>();
    DatasetManifest {
        path: path.to_string(),
        hash_sha256: hash,
        row_count: rows.len() as u64,
        bad_rows,
        targets: targets.len(),
        entities: entities.len(),
        year_min: rows.iter().map(|r| r.year).min(),
        year_max: rows.iter().map(|r| r.year).max(),
        columns,
        warnings,
        loaded_at: logging::ts_now(),
    }
}
