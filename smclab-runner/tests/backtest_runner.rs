//! Orchestration tests: parallel replay, failure isolation, merge ordering.

use std::collections::BTreeMap;

use proptest::prelude::*;
use smclab_core::{CandleStore, StrategyConfig, Timeframe};
use smclab_runner::data_loader::{compute_dataset_hash, generate_synthetic_candles};
use smclab_runner::{merge_trades, run_backtest_from_data, DataSource, LoadedData};

// ── Helpers ──────────────────────────────────────────────────────────

fn synthetic(timeframes: &[Timeframe], n: usize) -> LoadedData {
    let mut store = CandleStore::new();
    let mut sources = BTreeMap::new();
    for &tf in timeframes {
        store.add_candles(tf, generate_synthetic_candles(tf, n));
        sources.insert(tf, DataSource::Synthetic);
    }
    LoadedData {
        dataset_hash: compute_dataset_hash(&store),
        store,
        sources,
        skipped_rows: BTreeMap::new(),
        has_synthetic: true,
    }
}

fn all_detectors() -> StrategyConfig {
    StrategyConfig {
        detect_fvg: true,
        detect_order_blocks: true,
        detect_structure_breaks: true,
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[test]
fn all_timeframes_run_with_every_detector() {
    let tfs = Timeframe::all();
    let data = synthetic(tfs, 500);
    let result = run_backtest_from_data(&data, tfs, &all_detectors(), true, "cfg", None).unwrap();

    assert_eq!(result.timeframes.len(), tfs.len());
    assert!(result.failures.is_empty());
    assert!(result.has_synthetic);

    let per_tf: usize = result.timeframes.iter().map(|r| r.trades.len()).sum();
    assert_eq!(result.trade_count(), per_tf);
    assert_eq!(result.trades, merge_trades(&result.timeframes));
}

#[test]
fn timeframes_do_not_share_key_levels() {
    let data = synthetic(&[Timeframe::OneHour, Timeframe::FourHour], 300);
    let both = run_backtest_from_data(
        &data,
        &[Timeframe::OneHour, Timeframe::FourHour],
        &all_detectors(),
        true,
        "cfg",
        None,
    )
    .unwrap();
    let alone = run_backtest_from_data(
        &data,
        &[Timeframe::FourHour],
        &all_detectors(),
        true,
        "cfg",
        None,
    )
    .unwrap();

    assert_eq!(
        both.timeframe(Timeframe::FourHour),
        alone.timeframe(Timeframe::FourHour)
    );
}

#[test]
fn failed_timeframe_does_not_block_others() {
    let data = synthetic(&[Timeframe::Daily], 200);
    let result = run_backtest_from_data(
        &data,
        &[Timeframe::OneMinute, Timeframe::Daily],
        &StrategyConfig::default(),
        true,
        "cfg",
        None,
    )
    .unwrap();

    assert_eq!(result.timeframes.len(), 1);
    assert_eq!(result.timeframes[0].timeframe, Timeframe::Daily);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].timeframe, Timeframe::OneMinute);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// The merged result does not depend on the order timeframes are listed
    /// in or on whether they ran in parallel.
    #[test]
    fn merged_result_is_order_independent(
        order in Just(Timeframe::all().to_vec()).prop_shuffle(),
        parallel in any::<bool>(),
    ) {
        let data = synthetic(Timeframe::all(), 200);
        let reference = run_backtest_from_data(
            &data, Timeframe::all(), &all_detectors(), false, "cfg", None,
        ).unwrap();
        let shuffled = run_backtest_from_data(
            &data, &order, &all_detectors(), parallel, "cfg", None,
        ).unwrap();
        prop_assert_eq!(reference, shuffled);
    }
}
