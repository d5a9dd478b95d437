//! Key levels — typed market-structure records and the cache that tracks them.
//!
//! Only `level`, `range`, `fvg` and `msb` records participate in breach
//! evaluation. `level` records are one-shot; zones and structure breaks stay
//! active and re-trigger while price satisfies them. Order blocks and swing
//! points are stored for detectors but never breached.

pub mod cache;
pub mod level;

pub use cache::KeyLevelCache;
pub use level::{key_level_name, KeyLevel, KeyLevelKind, KeyLevelType};
