//! Data models for trade events, ledger entries, level requirements, and session metrics.

mod level;
mod metrics;
mod trade;

pub use level::LevelRequirements;
pub use metrics::SessionMetrics;
pub use trade::{LedgerEntry, TradeEvent};
