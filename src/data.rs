//! Snapshot loading and management
//!
//! Handles parsing of simulation time ranges and loading recorded order-book
//! snapshots from CSV files or prebuilt in-memory streams.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::types::{BookLevel, SimError, Snapshot, Timestamp, MAX_DEPTH};
use crate::Symbol;

/// Time string format accepted by [`TimeRange::parse`], e.g. `250120.000000`
pub const TIME_FORMAT: &str = "%y%m%d.%H%M%S";

/// Half-open simulation interval `[start, end)` in nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeRange {
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, SimError> {
        if start >= end {
            return Err(SimError::EmptyTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse a `[start, end]` pair of `%y%m%d.%H%M%S` strings
    pub fn parse(times: &[String; 2]) -> Result<Self, SimError> {
        let start = parse_time(&times[0])?;
        let end = parse_time(&times[1])?;
        Self::new(start, end)
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.start && ts < self.end
    }
}

/// Parse one `%y%m%d.%H%M%S` string into nanoseconds since epoch (UTC)
pub fn parse_time(input: &str) -> Result<Timestamp, SimError> {
    let parsed = NaiveDateTime::parse_from_str(input, TIME_FORMAT).map_err(|_| {
        SimError::BadTimeFormat {
            input: input.to_string(),
            format: TIME_FORMAT,
        }
    })?;
    parsed
        .and_utc()
        .timestamp_nanos_opt()
        .ok_or_else(|| SimError::BadTimeFormat {
            input: input.to_string(),
            format: TIME_FORMAT,
        })
}

/// Source of recorded book snapshots, one ordered stream per symbol
///
/// The engine only needs this trait; where the rows come from (CSV capture,
/// research store, synthetic generator) is the caller's concern.
pub trait SnapshotSource {
    /// Load all snapshots for `symbol` inside `range`, at most `depth`
    /// levels per side, sorted by `ts`. An empty vector is not an error.
    fn load_book(&self, symbol: &Symbol, range: &TimeRange, depth: usize)
        -> Result<Vec<Snapshot>>;
}

/// Prebuilt per-symbol snapshot streams
///
/// The workhorse for tests and for research code that synthesizes books.
#[derive(Debug, Default)]
pub struct MemorySource {
    data: HashMap<Symbol, Vec<Snapshot>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: Symbol, mut snapshots: Vec<Snapshot>) {
        snapshots.sort_by_key(|s| s.ts);
        self.data.insert(symbol, snapshots);
    }

    pub fn with_stream(mut self, symbol: Symbol, snapshots: Vec<Snapshot>) -> Self {
        self.insert(symbol, snapshots);
        self
    }
}

impl SnapshotSource for MemorySource {
    fn load_book(
        &self,
        symbol: &Symbol,
        range: &TimeRange,
        depth: usize,
    ) -> Result<Vec<Snapshot>> {
        let depth = depth.min(MAX_DEPTH);
        let Some(snapshots) = self.data.get(symbol) else {
            return Ok(Vec::new());
        };

        Ok(snapshots
            .iter()
            .filter(|s| range.contains(s.ts))
            .map(|s| {
                let mut s = s.clone();
                s.bids.truncate(depth);
                s.asks.truncate(depth);
                s
            })
            .collect())
    }
}

/// CSV-backed snapshot source
///
/// Reads the flat capture schema: `ts`, `bids[i].price` / `bids[i].amount`
/// and `asks[i].price` / `asks[i].amount` for i = 0..24, plus an optional
/// `ts_local` column. One file per symbol, `<data_dir>/<SYMBOL>.csv`.
pub struct CsvSource {
    data_dir: PathBuf,
}

impl CsvSource {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, symbol: &Symbol) -> PathBuf {
        self.data_dir.join(format!("{}.csv", symbol.as_str()))
    }
}

impl SnapshotSource for CsvSource {
    fn load_book(
        &self,
        symbol: &Symbol,
        range: &TimeRange,
        depth: usize,
    ) -> Result<Vec<Snapshot>> {
        let path = self.path_for(symbol);
        if !path.exists() {
            warn!("Snapshot file not found: {}", path.display());
            return Ok(Vec::new());
        }

        let snapshots = load_csv(&path, depth)
            .with_context(|| format!("Failed to load snapshots for {}", symbol))?;

        let in_range: Vec<Snapshot> = snapshots
            .into_iter()
            .filter(|s| range.contains(s.ts))
            .collect();

        info!("Loaded {} snapshots for {}", in_range.len(), symbol);
        Ok(in_range)
    }
}

/// Load book snapshots from a flat CSV capture file
pub fn load_csv(path: impl AsRef<Path>, depth: usize) -> Result<Vec<Snapshot>> {
    let depth = depth.min(MAX_DEPTH);
    let mut reader = csv::Reader::from_path(path.as_ref()).context("Failed to open CSV file")?;

    let columns: HashMap<String, usize> = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .enumerate()
        .map(|(i, name)| (name.to_string(), i))
        .collect();

    let ts_col = *columns.get("ts").context("Missing ts column")?;
    let ts_local_col = columns.get("ts_local").copied();

    let mut snapshots = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;

        let ts: Timestamp = record
            .get(ts_col)
            .context("Missing ts value")?
            .parse()
            .with_context(|| format!("Failed to parse ts at row {}", row_idx + 1))?;

        let ts_local = ts_local_col
            .and_then(|col| record.get(col))
            .and_then(|v| v.parse::<Timestamp>().ok());

        let bids = parse_side(&record, &columns, "bids", depth);
        let asks = parse_side(&record, &columns, "asks", depth);

        snapshots.push(Snapshot::new_unchecked(ts, bids, asks, ts_local));
    }

    snapshots.sort_by_key(|s| s.ts);
    Ok(snapshots)
}

/// Pull `<side>[i].price` / `<side>[i].amount` pairs until a level is absent
fn parse_side(
    record: &csv::StringRecord,
    columns: &HashMap<String, usize>,
    side: &str,
    depth: usize,
) -> Vec<BookLevel> {
    let mut levels = Vec::new();

    for i in 0..depth {
        let price_key = format!("{}[{}].price", side, i);
        let amount_key = format!("{}[{}].amount", side, i);

        let price = columns
            .get(&price_key)
            .and_then(|&col| record.get(col))
            .and_then(|v| v.parse::<f64>().ok());
        let amount = columns
            .get(&amount_key)
            .and_then(|&col| record.get(col))
            .and_then(|v| v.parse::<f64>().ok());

        match (price, amount) {
            (Some(price), Some(amount)) if price.is_finite() => {
                levels.push(BookLevel::new(price, amount));
            }
            _ => break,
        }
    }

    levels
}

/// Validate a loaded snapshot stream for consistency
pub fn validate_snapshots(snapshots: &[Snapshot]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if snapshots.is_empty() {
        warnings.push("No snapshots provided".to_string());
        return ValidationResult { errors, warnings };
    }

    for (i, snapshot) in snapshots.iter().enumerate() {
        if let Err(e) = snapshot.validate() {
            errors.push(format!("Snapshot {}: {}", i, e));
        }

        if i > 0 && snapshot.ts < snapshots[i - 1].ts {
            errors.push(format!(
                "Snapshot {}: not chronological ({} < {})",
                i,
                snapshot.ts,
                snapshots[i - 1].ts
            ));
        }

        if snapshot.bids.is_empty() && snapshot.asks.is_empty() {
            warnings.push(format!("Snapshot {}: both sides empty", i));
        }
    }

    ValidationResult { errors, warnings }
}

/// Result of snapshot stream validation
#[derive(Debug)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn log(&self) {
        for error in &self.errors {
            tracing::error!("Snapshot validation error: {}", error);
        }
        for warning in &self.warnings {
            tracing::warn!("Snapshot validation warning: {}", warning);
        }
    }
}
