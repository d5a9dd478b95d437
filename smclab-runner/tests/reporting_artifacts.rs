//! End-to-end artifact tests: config → backtest → artifact directory → reload.

use smclab_core::Timeframe;
use smclab_runner::{load_artifacts, run_backtest, save_artifacts, BacktestConfig};

const SYNTHETIC_CONFIG: &str = r#"
[[data]]
timeframe = "1h"

[[data]]
timeframe = "1d"

[strategy]
detect_fvg = true
detect_order_blocks = true
detect_structure_breaks = true

[run]
synthetic = true
synthetic_candles = 300
"#;

#[test]
fn synthetic_backtest_artifacts_roundtrip() {
    let config = BacktestConfig::from_toml(SYNTHETIC_CONFIG).unwrap();
    let result = run_backtest(&config, None).unwrap();
    assert!(result.has_synthetic);
    assert_eq!(result.timeframes.len(), 2);

    let dir = tempfile::tempdir().unwrap();
    let run_dir = save_artifacts(&result, dir.path()).unwrap();

    let report = std::fs::read_to_string(run_dir.join("report.md")).unwrap();
    assert!(report.contains("**SYNTHETIC**"));
    assert!(report.contains("| 1h | synthetic | 300 |"));
    assert!(report.contains("| 1d | synthetic | 300 |"));

    let trades_csv = std::fs::read_to_string(run_dir.join("trades.csv")).unwrap();
    assert_eq!(trades_csv.lines().count(), result.trade_count() + 1);

    let levels_csv = std::fs::read_to_string(run_dir.join("levels.csv")).unwrap();
    let level_rows: usize = result.timeframes.iter().map(|r| r.key_levels.len()).sum();
    assert_eq!(levels_csv.lines().count(), level_rows + 1);

    let reloaded = load_artifacts(&run_dir).unwrap();
    assert_eq!(reloaded, result);
    assert_eq!(
        reloaded.timeframe(Timeframe::OneHour).map(|r| r.candle_count),
        Some(300)
    );
}

#[test]
fn identical_configs_give_identical_results() {
    let config = BacktestConfig::from_toml(SYNTHETIC_CONFIG).unwrap();
    let a = run_backtest(&config, None).unwrap();
    let b = run_backtest(&config, None).unwrap();
    assert_eq!(a, b);
}
