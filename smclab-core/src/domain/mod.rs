//! Domain types for SMCLab

pub mod candle;
pub mod timeframe;
pub mod trade;

pub use candle::Candle;
pub use timeframe::Timeframe;
pub use trade::{Trade, TradeSide};
