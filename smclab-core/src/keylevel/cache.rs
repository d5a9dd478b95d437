//! Key-level cache — the mutable store a strategy replays against.
//!
//! Lifecycle of an entry: created active by an `add_*` call, optionally
//! deactivated (by a one-shot breach or [`KeyLevelCache::deactivate`]), never
//! removed and never otherwise mutated.
//!
//! Names are identity keys. The cache does not enforce uniqueness: adding
//! under a name that is already present replaces the previous record and
//! returns it. Generating unique names (see
//! [`key_level_name`](super::key_level_name)) is the caller's obligation.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::analytics::Bias;
use crate::domain::Candle;

use super::level::{KeyLevel, KeyLevelKind, KeyLevelType};

/// Name → key level store with breach evaluation.
#[derive(Debug, Clone, Default)]
pub struct KeyLevelCache {
    levels: HashMap<String, KeyLevel>,
}

impl KeyLevelCache {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Insertion ──

    /// Insert `kind` under `name` as an active record created at `created_at`.
    ///
    /// Returns the record previously stored under `name`, if any.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        kind: KeyLevelKind,
        created_at: DateTime<Utc>,
    ) -> Option<KeyLevel> {
        let level = KeyLevel::new(name, kind, created_at);
        debug!(name = %level.name, level = %level.kind, "key level added");
        let previous = self.levels.insert(level.name.clone(), level);
        if let Some(ref prev) = previous {
            warn!(
                name = %prev.name,
                replaced = %prev.kind,
                "key level name reused, previous record overwritten"
            );
        }
        previous
    }

    pub fn add_level(&mut self, name: &str, price: f64, candle: &Candle) -> Option<KeyLevel> {
        self.insert(name, KeyLevelKind::Level { price }, candle.timestamp)
    }

    pub fn add_range(
        &mut self,
        name: &str,
        low: f64,
        high: f64,
        candle: &Candle,
    ) -> Option<KeyLevel> {
        self.insert(name, KeyLevelKind::Range { low, high }, candle.timestamp)
    }

    pub fn add_fvg(
        &mut self,
        name: &str,
        low: f64,
        high: f64,
        candle: &Candle,
    ) -> Option<KeyLevel> {
        self.insert(name, KeyLevelKind::Fvg { low, high }, candle.timestamp)
    }

    pub fn add_msb(
        &mut self,
        name: &str,
        direction: Bias,
        break_point: f64,
        candle: &Candle,
    ) -> Option<KeyLevel> {
        self.insert(
            name,
            KeyLevelKind::Msb {
                direction,
                break_point,
            },
            candle.timestamp,
        )
    }

    /// The candle itself is stored as the block's origin.
    pub fn add_order_block(
        &mut self,
        name: &str,
        direction: Bias,
        candle: &Candle,
    ) -> Option<KeyLevel> {
        self.insert(
            name,
            KeyLevelKind::OrderBlock {
                direction,
                origin: *candle,
            },
            candle.timestamp,
        )
    }

    /// Records the candle's low.
    pub fn add_swing_low(&mut self, name: &str, bias: Bias, candle: &Candle) -> Option<KeyLevel> {
        self.insert(
            name,
            KeyLevelKind::SwingLow {
                bias,
                price: candle.low,
            },
            candle.timestamp,
        )
    }

    /// Records the candle's high.
    pub fn add_swing_high(&mut self, name: &str, bias: Bias, candle: &Candle) -> Option<KeyLevel> {
        self.insert(
            name,
            KeyLevelKind::SwingHigh {
                bias,
                price: candle.high,
            },
            candle.timestamp,
        )
    }

    // ── Lifecycle ──

    /// Mark `name` inactive. Returns false if no such record exists or it was
    /// already inactive.
    pub fn deactivate(&mut self, name: &str) -> bool {
        match self.levels.get_mut(name) {
            Some(level) if level.active => {
                level.active = false;
                true
            }
            _ => false,
        }
    }

    // ── Breach evaluation ──

    /// Evaluate every active record against `price`.
    ///
    /// - `level`: breached iff `price <= level`; the record is deactivated, so
    ///   each level is reported at most once.
    /// - `range` / `fvg`: breached iff `low <= price <= high`; the record stays
    ///   active and breaches again on every call while price remains inside.
    /// - `msb`: breached iff price is beyond the break point in the record's
    ///   direction (strictly); stays active.
    /// - `orderBlock`, `swingLow`, `swingHigh`: never evaluated.
    ///
    /// Returned records reflect their state after evaluation and are sorted by
    /// `(created_at, name)`, independent of the map's iteration order.
    pub fn check_price_breach(&mut self, price: f64) -> Vec<KeyLevel> {
        let mut breached: Vec<KeyLevel> = Vec::new();

        for level in self.levels.values_mut() {
            if !level.active || !level.level_type().is_breach_target() {
                continue;
            }
            if !level.kind.is_breached_by(price) {
                continue;
            }
            if level.kind.deactivates_on_breach() {
                level.active = false;
            }
            breached.push(level.clone());
        }

        breached.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        breached
    }

    // ── Reads ──

    pub fn get(&self, name: &str) -> Option<&KeyLevel> {
        self.levels.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.levels.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.levels.values().filter(|l| l.active).count()
    }

    /// All records sorted by `(created_at, name)`.
    pub fn iter(&self) -> impl Iterator<Item = &KeyLevel> {
        let mut sorted: Vec<&KeyLevel> = self.levels.values().collect();
        sorted.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        sorted.into_iter()
    }

    /// Records of a single type, sorted by `(created_at, name)`.
    pub fn of_type(&self, level_type: KeyLevelType) -> Vec<&KeyLevel> {
        self.iter()
            .filter(|l| l.level_type() == level_type)
            .collect()
    }

    /// Number of records per type. Types with no records are omitted.
    pub fn count_by_type(&self) -> BTreeMap<KeyLevelType, usize> {
        let mut counts = BTreeMap::new();
        for level in self.levels.values() {
            *counts.entry(level.level_type()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candle(day: i64, low: f64, high: f64) -> Candle {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Candle::new(
            base + chrono::Duration::days(day),
            low,
            high,
            low,
            high,
            0.0,
        )
    }

    #[test]
    fn level_breach_is_one_shot() {
        let mut cache = KeyLevelCache::new();
        cache.add_level("l", 100.0, &candle(0, 100.0, 101.0));

        let first = cache.check_price_breach(95.0);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].name, "l");
        assert!(!first[0].active, "returned record reflects deactivation");
        assert!(!cache.get("l").unwrap().active);

        assert!(cache.check_price_breach(95.0).is_empty());
        assert!(cache.check_price_breach(50.0).is_empty());
    }

    #[test]
    fn level_not_breached_above() {
        let mut cache = KeyLevelCache::new();
        cache.add_level("l", 100.0, &candle(0, 100.0, 101.0));
        assert!(cache.check_price_breach(100.5).is_empty());
        assert!(cache.get("l").unwrap().active);
    }

    #[test]
    fn range_and_fvg_breach_on_every_reentry() {
        let mut cache = KeyLevelCache::new();
        cache.add_range("r", 10.0, 20.0, &candle(0, 10.0, 20.0));
        cache.add_fvg("f", 10.0, 20.0, &candle(1, 10.0, 20.0));

        for _ in 0..3 {
            let hits = cache.check_price_breach(15.0);
            assert_eq!(hits.len(), 2);
            assert!(hits.iter().all(|l| l.active));
        }
        assert!(cache.check_price_breach(25.0).is_empty());
        assert_eq!(cache.check_price_breach(10.0).len(), 2);
        assert_eq!(cache.active_count(), 2);
    }

    #[test]
    fn msb_breaches_repeatedly_in_its_direction() {
        let mut cache = KeyLevelCache::new();
        let c = candle(0, 40.0, 60.0);
        cache.add_msb("bull", Bias::Bullish, 50.0, &c);
        cache.add_msb("bear", Bias::Bearish, 45.0, &c);

        let hits = cache.check_price_breach(55.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "bull");
        assert_eq!(cache.check_price_breach(55.0).len(), 1);

        let hits = cache.check_price_breach(40.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "bear");

        assert!(cache.check_price_breach(47.0).is_empty());
    }

    #[test]
    fn annotations_never_breach() {
        let mut cache = KeyLevelCache::new();
        let c = candle(0, 80.0, 105.0);
        cache.add_order_block("ob", Bias::Bullish, &c);
        cache.add_swing_low("sl", Bias::Bullish, &c);
        cache.add_swing_high("sh", Bias::Bearish, &c);

        for price in [0.0, 80.0, 90.0, 105.0, 1000.0] {
            assert!(cache.check_price_breach(price).is_empty());
        }
        assert_eq!(cache.active_count(), 3);
    }

    #[test]
    fn inactive_records_are_skipped() {
        let mut cache = KeyLevelCache::new();
        cache.add_range("r", 10.0, 20.0, &candle(0, 10.0, 20.0));
        assert!(cache.deactivate("r"));
        assert!(!cache.deactivate("r"));
        assert!(!cache.deactivate("missing"));
        assert!(cache.check_price_breach(15.0).is_empty());
    }

    #[test]
    fn breach_results_are_sorted_by_creation_then_name() {
        let mut cache = KeyLevelCache::new();
        cache.add_range("zeta", 0.0, 100.0, &candle(2, 0.0, 100.0));
        cache.add_range("beta", 0.0, 100.0, &candle(1, 0.0, 100.0));
        cache.add_range("alpha", 0.0, 100.0, &candle(1, 0.0, 100.0));
        cache.add_level("omega", 200.0, &candle(0, 0.0, 100.0));

        let names: Vec<String> = cache
            .check_price_breach(50.0)
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["omega", "alpha", "beta", "zeta"]);
    }

    #[test]
    fn reused_name_overwrites_and_returns_previous() {
        let mut cache = KeyLevelCache::new();
        assert!(cache.add_level("dup", 100.0, &candle(0, 0.0, 1.0)).is_none());
        cache.check_price_breach(90.0); // deactivate
        let previous = cache
            .add_fvg("dup", 1.0, 2.0, &candle(1, 0.0, 1.0))
            .expect("previous record returned");
        assert_eq!(previous.level_type(), KeyLevelType::Level);
        assert!(!previous.active);

        assert_eq!(cache.len(), 1);
        let current = cache.get("dup").unwrap();
        assert_eq!(current.level_type(), KeyLevelType::Fvg);
        assert!(current.active);
    }

    #[test]
    fn swing_and_order_block_payloads() {
        let mut cache = KeyLevelCache::new();
        let c = Candle::new(
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
            100.0,
            110.0,
            90.0,
            95.0,
            10.0,
        );
        cache.add_swing_low("sl", Bias::Bullish, &c);
        cache.add_swing_high("sh", Bias::Bearish, &c);
        cache.add_order_block("ob", Bias::Bullish, &c);

        assert_eq!(
            cache.get("sl").unwrap().kind,
            KeyLevelKind::SwingLow {
                bias: Bias::Bullish,
                price: 90.0
            }
        );
        assert_eq!(
            cache.get("sh").unwrap().kind,
            KeyLevelKind::SwingHigh {
                bias: Bias::Bearish,
                price: 110.0
            }
        );
        match &cache.get("ob").unwrap().kind {
            KeyLevelKind::OrderBlock { direction, origin } => {
                assert_eq!(*direction, Bias::Bullish);
                assert_eq!(origin, &c);
            }
            other => panic!("unexpected payload {other:?}"),
        }
        assert_eq!(cache.get("ob").unwrap().created_at, c.timestamp);
    }

    #[test]
    fn counts_and_type_views() {
        let mut cache = KeyLevelCache::new();
        cache.add_swing_low("a", Bias::Bullish, &candle(0, 1.0, 2.0));
        cache.add_swing_low("b", Bias::Bullish, &candle(1, 1.0, 2.0));
        cache.add_fvg("c", 1.0, 2.0, &candle(2, 1.0, 2.0));

        let counts = cache.count_by_type();
        assert_eq!(counts[&KeyLevelType::SwingLow], 2);
        assert_eq!(counts[&KeyLevelType::Fvg], 1);
        assert!(!counts.contains_key(&KeyLevelType::Level));

        let lows: Vec<&str> = cache
            .of_type(KeyLevelType::SwingLow)
            .into_iter()
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(lows, vec!["a", "b"]);
        assert!(cache.contains("c"));
        assert!(!cache.is_empty());
    }
}
