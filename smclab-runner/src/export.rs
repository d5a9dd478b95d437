//! Reporting and export — JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats for backtest results:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: merged trade tape and final key-level tables
//! - **Markdown**: human-readable per-timeframe summary
//!
//! All persisted artifacts include a `schema_version` field. Unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use smclab_core::{KeyLevelType, Trade};

use crate::runner::{BacktestResult, TimeframeResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export a trade list as CSV.
///
/// Columns: timestamp, timeframe, side, price, volume, key_level, level_type
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "timestamp",
        "timeframe",
        "side",
        "price",
        "volume",
        "key_level",
        "level_type",
    ])?;

    for t in trades {
        wtr.write_record([
            t.timestamp.to_rfc3339().as_str(),
            t.timeframe.label(),
            t.side.to_string().as_str(),
            format!("{:.6}", t.price).as_str(),
            format!("{:.6}", t.volume).as_str(),
            t.key_level.as_str(),
            t.level_type.as_str(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the final key-level cache of every timeframe as CSV.
///
/// Columns: timeframe, name, level_type, active, created_at, reference_price, detail
pub fn export_levels_csv(results: &[TimeframeResult]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timeframe",
        "name",
        "level_type",
        "active",
        "created_at",
        "reference_price",
        "detail",
    ])?;

    for r in results {
        for level in &r.key_levels {
            wtr.write_record([
                r.timeframe.label(),
                level.name.as_str(),
                level.level_type().as_str(),
                if level.active { "true" } else { "false" },
                level.created_at.to_rfc3339().as_str(),
                format!("{:.6}", level.kind.reference_price()).as_str(),
                level.kind.to_string().as_str(),
            ])?;
        }
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a backtest.
///
/// Creates a directory named `smc_{timestamp}_{hash8}/` under `output_dir`
/// containing:
/// - `manifest.json` — the full `BacktestResult`
/// - `trades.csv` — merged trade tape
/// - `levels.csv` — final key levels per timeframe
/// - `report.md` — Markdown summary
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let hash = result
        .config_hash
        .get(..8)
        .unwrap_or(result.config_hash.as_str());
    let dirname = format!(
        "smc_{}_{}",
        chrono::Local::now().format("%Y%m%d_%H%M%S"),
        hash
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("manifest.json"), export_json(result)?)?;
    std::fs::write(run_dir.join("trades.csv"), export_trades_csv(&result.trades)?)?;
    std::fs::write(
        run_dir.join("levels.csv"),
        export_levels_csv(&result.timeframes)?,
    )?;
    std::fs::write(run_dir.join("report.md"), generate_report(result))?;

    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Generate a Markdown report for a backtest.
pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);

    md.push_str("# Smart-Money Backtest Report\n\n");

    // Metadata
    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Timeframes | {} |\n", result.timeframes.len()));
    md.push_str(&format!("| Candles | {} |\n", result.candle_count()));
    md.push_str(&format!("| Skipped Rows | {} |\n", result.skipped_rows()));
    md.push_str(&format!("| Trades | {} |\n", result.trade_count()));
    md.push_str(&format!("| Config Hash | {} |\n", result.config_hash));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    if result.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    // Detectors
    md.push_str("## Detectors\n\n");
    md.push_str("| Detector | Enabled |\n");
    md.push_str("| --- | --- |\n");
    md.push_str("| Swing points | yes |\n");
    md.push_str(&format!("| Fair-value gaps | {} |\n", yes_no(result.strategy.detect_fvg)));
    md.push_str(&format!(
        "| Order blocks | {} |\n",
        yes_no(result.strategy.detect_order_blocks)
    ));
    md.push_str(&format!(
        "| Structure breaks | {} |\n",
        yes_no(result.strategy.detect_structure_breaks)
    ));
    md.push('\n');

    // Per-timeframe summary
    md.push_str("## Timeframes\n\n");
    md.push_str(
        "| Timeframe | Source | Candles | Skipped | Period | Trades | Swing Lows | Swing Highs \
         | FVGs | MSBs | Order Blocks | Active Levels |\n",
    );
    md.push_str(
        "| --- | --- | ---: | ---: | --- | ---: | ---: | ---: | ---: | ---: | ---: | ---: |\n",
    );
    for r in &result.timeframes {
        let period = match (r.first_candle, r.last_candle) {
            (Some(a), Some(b)) => format!(
                "{} to {}",
                a.format("%Y-%m-%d %H:%M"),
                b.format("%Y-%m-%d %H:%M")
            ),
            _ => "-".to_string(),
        };
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
            r.timeframe,
            r.source,
            r.candle_count,
            r.skipped_rows,
            period,
            r.trades.len(),
            r.detected(KeyLevelType::SwingLow),
            r.detected(KeyLevelType::SwingHigh),
            r.detected(KeyLevelType::Fvg),
            r.detected(KeyLevelType::Msb),
            r.detected(KeyLevelType::OrderBlock),
            r.active_levels(),
        ));
    }
    md.push('\n');

    // Trades by level type
    if !result.trades.is_empty() {
        md.push_str("## Trades by Level Type\n\n");
        md.push_str("| Level Type | Trades |\n");
        md.push_str("| --- | ---: |\n");
        for ty in KeyLevelType::all() {
            let n = result.trades.iter().filter(|t| t.level_type == *ty).count();
            if n > 0 {
                md.push_str(&format!("| {ty} | {n} |\n"));
            }
        }
        md.push('\n');
    }

    // Failures
    if !result.failures.is_empty() {
        md.push_str("## Failed Timeframes\n\n");
        for f in &result.failures {
            md.push_str(&format!("- {}: {}\n", f.timeframe, f.error));
        }
        md.push('\n');
    }

    md
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
