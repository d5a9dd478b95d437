//! Property tests for key-level and replay invariants.
//!
//! Uses proptest to verify:
//! 1. Boundary candles — the first and last candle are never swing points
//! 2. One-shot levels — a `level` breaches at most once
//! 3. Zone persistence — `range` breaches on every price inside it
//! 4. Breach ordering — output is sorted and independent of insertion order
//! 5. Determinism — identical inputs give identical trades

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use smclab_core::{
    key_level_name, Candle, KeyLevelCache, KeyLevelType, SmartMoneyStrategy, StrategyConfig,
    Timeframe,
};

// ── Strategies (proptest) ────────────────────────────────────────────

fn ts(i: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap() + chrono::Duration::hours(i as i64)
}

fn arb_price() -> impl Strategy<Value = f64> {
    (10.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

/// A well-formed candle: low ≤ open, close ≤ high.
fn arb_candle_shape() -> impl Strategy<Value = (f64, f64, f64, f64)> {
    (arb_price(), 0.0..20.0_f64, 0.0..1.0_f64, 0.0..1.0_f64).prop_map(|(low, span, o, c)| {
        let high = low + span;
        (low + span * o, high, low, low + span * c)
    })
}

fn arb_series(max: usize) -> impl Strategy<Value = Vec<Candle>> {
    prop::collection::vec(arb_candle_shape(), 1..max).prop_map(|shapes| {
        shapes
            .into_iter()
            .enumerate()
            .map(|(i, (open, high, low, close))| Candle::new(ts(i), open, high, low, close, 1.0))
            .collect()
    })
}

fn all_detectors() -> StrategyConfig {
    StrategyConfig {
        detect_fvg: true,
        detect_order_blocks: true,
        detect_structure_breaks: true,
    }
}

// ── 1. Boundary Candles ──────────────────────────────────────────────

proptest! {
    /// The first and last candle never become swing points.
    #[test]
    fn boundary_candles_are_never_swings(candles in arb_series(60)) {
        let mut strategy = SmartMoneyStrategy::default();
        strategy.run(&candles, Timeframe::OneHour).unwrap();

        let first = candles[0].timestamp;
        let last = candles[candles.len() - 1].timestamp;
        for ty in [KeyLevelType::SwingLow, KeyLevelType::SwingHigh] {
            prop_assert!(!strategy.cache().contains(&key_level_name(ty, first)));
            prop_assert!(!strategy.cache().contains(&key_level_name(ty, last)));
        }
    }
}

// ── 2. One-Shot Levels ───────────────────────────────────────────────

proptest! {
    /// However many candles trade through a level, it produces one trade.
    #[test]
    fn level_breaches_at_most_once(candles in arb_series(60), level in arb_price()) {
        let mut cache = KeyLevelCache::new();
        cache.add_level("probe", level, &candles[0]);
        let mut strategy = SmartMoneyStrategy::with_cache(cache, StrategyConfig::default());
        let run = strategy.run(&candles, Timeframe::OneHour).unwrap();

        let hits = run.trades.iter().filter(|t| t.key_level == "probe").count();
        let expected = usize::from(candles.iter().any(|c| c.low <= level));
        prop_assert_eq!(hits, expected);
        prop_assert_eq!(strategy.cache().get("probe").unwrap().active, expected == 0);
    }
}

// ── 3. Zone Persistence ──────────────────────────────────────────────

proptest! {
    /// A range stays active and breaches on every evaluated price inside it.
    #[test]
    fn range_breaches_on_every_inside_price(
        prices in prop::collection::vec(arb_price(), 1..50),
        low in arb_price(),
        width in 0.0..100.0_f64,
    ) {
        let high = low + width;
        let origin = Candle::new(ts(0), low, high, low, high, 0.0);
        let mut cache = KeyLevelCache::new();
        cache.add_range("zone", low, high, &origin);

        let mut hits = 0;
        for &p in &prices {
            hits += cache.check_price_breach(p).len();
        }
        let inside = prices.iter().filter(|&&p| low <= p && p <= high).count();
        prop_assert_eq!(hits, inside);
        prop_assert!(cache.get("zone").unwrap().active);
    }
}

// ── 4. Breach Ordering ───────────────────────────────────────────────

proptest! {
    /// Breach output is sorted by creation time and does not depend on the
    /// order records were inserted in.
    #[test]
    fn breach_order_is_insertion_independent(
        levels in prop::collection::vec((arb_price(), 0usize..100), 1..30),
        price in arb_price(),
    ) {
        let origin = |i: usize| Candle::new(ts(i), 1.0, 1.0, 1.0, 1.0, 0.0);

        let mut forward = KeyLevelCache::new();
        for (n, &(p, i)) in levels.iter().enumerate() {
            forward.add_level(&format!("l{n}"), p, &origin(i));
        }
        let mut backward = KeyLevelCache::new();
        for (n, &(p, i)) in levels.iter().enumerate().rev() {
            backward.add_level(&format!("l{n}"), p, &origin(i));
        }

        let a = forward.check_price_breach(price);
        let b = backward.check_price_breach(price);
        prop_assert_eq!(&a, &b);
        prop_assert!(a
            .windows(2)
            .all(|w| (w[0].created_at, &w[0].name) <= (w[1].created_at, &w[1].name)));
        prop_assert!(a.iter().all(|l| !l.active));
    }
}

// ── 5. Determinism ───────────────────────────────────────────────────

proptest! {
    /// Two fresh replays of the same candles with every detector enabled
    /// produce identical runs and caches.
    #[test]
    fn replay_is_deterministic(candles in arb_series(80)) {
        let mut a = SmartMoneyStrategy::new(all_detectors());
        let mut b = SmartMoneyStrategy::new(all_detectors());
        let run_a = a.run(&candles, Timeframe::FiveMinute).unwrap();
        let run_b = b.run(&candles, Timeframe::FiveMinute).unwrap();
        prop_assert_eq!(run_a, run_b);

        let cache_a: Vec<_> = a.cache().iter().cloned().collect();
        let cache_b: Vec<_> = b.cache().iter().cloned().collect();
        prop_assert_eq!(cache_a, cache_b);
    }
}
