//! Candle loading for the runner.
//!
//! Each `[[data]]` entry resolves to one timeframe's candles:
//! 1. If the entry has a CSV path and the file parses → use it
//! 2. If the file is missing or has no usable rows and `synthetic` is on →
//!    generate synthetic candles (tagged)
//! 3. If the entry has no path and `synthetic` is on → generate synthetic candles
//! 4. Otherwise → fail with the loader error
//!
//! CSV headers are matched case-insensitively: `timestamp`/`unix`/`date`,
//! `open`, `high`, `low`, `close`, and the first column whose name starts with
//! `volume` (so `Volume ETH` works). Exchange exports often carry a one-field
//! banner line above the header; it is skipped.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use smclab_core::{Candle, CandleStore, DataError, Timeframe};

use crate::config::{DataSpec, RunSettings};

/// Unix timestamps above this are treated as milliseconds.
const MILLIS_THRESHOLD: u64 = 100_000_000_000;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{} is missing required column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{} contains no usable candle rows", path.display())]
    NoRows { path: PathBuf },

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Where a timeframe's candles came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Csv,
    Synthetic,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Csv => f.write_str("csv"),
            DataSource::Synthetic => f.write_str("synthetic"),
        }
    }
}

/// Options controlling how candles are loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Generate synthetic candles when real data is unavailable.
    pub synthetic: bool,
    /// Length of each synthetic series.
    pub synthetic_candles: usize,
}

impl From<&RunSettings> for LoadOptions {
    fn from(run: &RunSettings) -> Self {
        Self {
            synthetic: run.synthetic,
            synthetic_candles: run.synthetic_candles,
        }
    }
}

/// Candles parsed from one CSV file.
#[derive(Debug, Clone)]
pub struct CsvCandles {
    /// Parsed candles in file order.
    pub candles: Vec<Candle>,
    /// Rows dropped for an unparsable timestamp or price.
    pub skipped: usize,
}

/// Result of loading every configured series, including provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub store: CandleStore,
    pub sources: BTreeMap<Timeframe, DataSource>,
    /// Skipped CSV rows per timeframe (synthetic series report zero).
    pub skipped_rows: BTreeMap<Timeframe, usize>,
    /// BLAKE3 over all candles in timeframe order.
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

impl LoadedData {
    pub fn source(&self, timeframe: Timeframe) -> Option<DataSource> {
        self.sources.get(&timeframe).copied()
    }
}

/// Load every entry in `specs` into one [`CandleStore`].
pub fn load_candles(specs: &[DataSpec], opts: &LoadOptions) -> Result<LoadedData, LoadError> {
    let mut store = CandleStore::new();
    let mut sources = BTreeMap::new();
    let mut skipped_rows = BTreeMap::new();

    for spec in specs {
        let tf = spec.timeframe;

        let (candles, source, skipped) = match &spec.path {
            Some(path) => match read_csv_candles(path) {
                Ok(parsed) => (parsed.candles, DataSource::Csv, parsed.skipped),
                Err(e @ (LoadError::Io { .. } | LoadError::NoRows { .. })) if opts.synthetic => {
                    warn!(
                        timeframe = %tf,
                        error = %e,
                        "falling back to synthetic candles, results will be tagged as synthetic"
                    );
                    let candles = generate_synthetic_candles(tf, opts.synthetic_candles);
                    (candles, DataSource::Synthetic, 0)
                }
                Err(e) => return Err(e),
            },
            None if opts.synthetic => {
                warn!(
                    timeframe = %tf,
                    "generating synthetic candles, results will be tagged as synthetic"
                );
                let candles = generate_synthetic_candles(tf, opts.synthetic_candles);
                (candles, DataSource::Synthetic, 0)
            }
            None => return Err(DataError::NoData { timeframe: tf }.into()),
        };

        info!(timeframe = %tf, %source, candles = candles.len(), skipped, "loaded candles");
        store.add_candles(tf, candles);
        sources.insert(tf, source);
        skipped_rows.insert(tf, skipped);
    }

    let dataset_hash = compute_dataset_hash(&store);
    let has_synthetic = sources.values().any(|s| *s == DataSource::Synthetic);

    Ok(LoadedData {
        store,
        sources,
        skipped_rows,
        dataset_hash,
        has_synthetic,
    })
}

/// Read candles from a CSV file.
pub fn read_csv_candles(path: &Path) -> Result<CsvCandles, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_csv_candles(file, path)
}

/// Parse candles from CSV text. `path` is only used for error context.
pub fn parse_csv_candles<R: Read>(reader: R, path: &Path) -> Result<CsvCandles, LoadError> {
    let csv_err = |source: csv::Error| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut columns: Option<Columns> = None;
    let mut candles = Vec::new();
    let mut skipped = 0usize;

    for (line, record) in rdr.records().enumerate() {
        let record = record.map_err(csv_err)?;

        let cols = match columns {
            Some(cols) => cols,
            None => {
                // banner lines have a single field
                if record.len() > 1 {
                    columns = Some(Columns::from_header(&record, path)?);
                }
                continue;
            }
        };

        match cols.parse_row(&record) {
            Some(candle) => candles.push(candle),
            None => {
                debug!(path = %path.display(), line = line + 1, "skipping unparsable row");
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!(path = %path.display(), skipped, "skipped unparsable CSV rows");
    }
    if candles.is_empty() {
        return Err(LoadError::NoRows {
            path: path.to_path_buf(),
        });
    }
    Ok(CsvCandles { candles, skipped })
}

/// Column indices resolved from a header row.
#[derive(Debug, Clone, Copy)]
struct Columns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl Columns {
    fn from_header(header: &csv::StringRecord, path: &Path) -> Result<Self, LoadError> {
        let names: Vec<String> = header.iter().map(|h| h.to_ascii_lowercase()).collect();
        let find = |column: &'static str, pred: fn(&str) -> bool| {
            find_column(&names, pred).ok_or_else(|| LoadError::MissingColumn {
                path: path.to_path_buf(),
                column,
            })
        };

        // prefer an epoch column over a formatted date when both exist
        let timestamp = find("timestamp", |n| n == "timestamp" || n == "unix")
            .or_else(|_| find("timestamp", |n| n == "date"))?;

        Ok(Self {
            timestamp,
            open: find("open", |n| n == "open")?,
            high: find("high", |n| n == "high")?,
            low: find("low", |n| n == "low")?,
            close: find("close", |n| n == "close")?,
            volume: find("volume", |n| n.starts_with("volume"))?,
        })
    }

    fn parse_row(&self, record: &csv::StringRecord) -> Option<Candle> {
        let price = |i: usize| -> Option<f64> {
            record
                .get(i)?
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
        };

        let timestamp = parse_timestamp(record.get(self.timestamp)?)?;
        let open = price(self.open)?;
        let high = price(self.high)?;
        let low = price(self.low)?;
        let close = price(self.close)?;
        // volume is informational; an unparsable value reads as zero
        let volume = price(self.volume).unwrap_or(0.0);

        Some(Candle::new(timestamp, open, high, low, close, volume))
    }
}

fn find_column(names: &[String], pred: fn(&str) -> bool) -> Option<usize> {
    names.iter().position(|n| pred(n.as_str()))
}

/// Parse Unix seconds, Unix milliseconds, RFC 3339, `YYYY-MM-DD HH:MM:SS` or
/// `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(n) = raw.parse::<i64>() {
        return if n.unsigned_abs() > MILLIS_THRESHOLD {
            Utc.timestamp_millis_opt(n).single()
        } else {
            Utc.timestamp_opt(n, 0).single()
        };
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Compute a deterministic BLAKE3 hash over all candle data.
///
/// Timeframes are visited in their natural order, so the hash does not depend
/// on the order series were loaded in.
pub fn compute_dataset_hash(store: &CandleStore) -> String {
    let mut hasher = blake3::Hasher::new();

    for tf in store.timeframes() {
        hasher.update(tf.label().as_bytes());
        if let Ok(candles) = store.candles(tf) {
            for c in candles {
                hasher.update(&c.timestamp.timestamp_millis().to_le_bytes());
                hasher.update(&c.open.to_le_bytes());
                hasher.update(&c.high.to_le_bytes());
                hasher.update(&c.low.to_le_bytes());
                hasher.update(&c.close.to_le_bytes());
                hasher.update(&c.volume.to_le_bytes());
            }
        }
    }

    hasher.finalize().to_hex().to_string()
}

/// Generate synthetic candles for development runs.
///
/// A random walk from 100.0 seeded from the timeframe label, one candle per
/// timeframe step starting 2024-01-01 UTC. These are clearly fake and tagged
/// as synthetic.
pub fn generate_synthetic_candles(timeframe: Timeframe, count: usize) -> Vec<Candle> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(timeframe.label().as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single();
    let Some(start) = start else {
        return Vec::new();
    };
    let step = timeframe.duration();

    let mut candles = Vec::with_capacity(count);
    let mut price = 100.0_f64;
    let mut ts = start;

    for _ in 0..count {
        let ret: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + ret);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500.0..5_000.0);

        candles.push(Candle::new(ts, open, high, low, close, volume));
        price = close;
        ts += step;
    }

    candles
}
