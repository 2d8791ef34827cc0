//! Replaying trade events from JSON files through a fresh session.

use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::metrics::MetricsCalculator;
use crate::models::{SessionMetrics, TradeEvent};
use crate::progression::{ProgressionConfig, ProgressionEngine};

/// Session state after a replay.
#[derive(Debug, Clone)]
pub struct ReplayReport {
    pub engine: ProgressionEngine,

    /// Balance the session opened with
    pub opening_balance: Decimal,

    /// Events the engine refused (1-based positions in the input)
    pub rejected: Vec<usize>,
}

impl ReplayReport {
    pub fn metrics(&self) -> SessionMetrics {
        MetricsCalculator::calculate(self.opening_balance, self.engine.ledger())
    }
}

/// Read a JSON array of trade events from `path`.
pub fn load_trades(path: &Path) -> Result<Vec<TradeEvent>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read trade file {}", path.display()))?;

    let trades = parse_trades(&raw)
        .with_context(|| format!("invalid trade file {}", path.display()))?;

    debug!(path = %path.display(), trades = trades.len(), "Loaded trades");
    Ok(trades)
}

/// Parse a JSON array of trade events.
///
/// Negative amounts fail deserialization; zero-amount events are left for the
/// engine to report.
pub fn parse_trades(raw: &str) -> Result<Vec<TradeEvent>> {
    serde_json::from_str(raw).context("expected a JSON array of trades with non-negative amounts")
}

/// Apply `trades` in order to a new session, skipping the ones the engine rejects.
pub fn run(config: ProgressionConfig, trades: &[TradeEvent]) -> ReplayReport {
    let opening_balance = config.base_balance;
    let mut engine = ProgressionEngine::new(config);
    let mut rejected = Vec::new();

    for (index, trade) in trades.iter().enumerate() {
        if let Err(e) = engine.apply_trade(trade) {
            warn!(trade = index + 1, pair = %trade.pair(), error = %e, "Trade rejected");
            rejected.push(index + 1);
        }
    }

    ReplayReport {
        engine,
        opening_balance,
        rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::progression::LevelChange;

    const DEMO_TRADES: &str = include_str!("../demos/trades.json");

    #[test]
    fn test_parse_trades() {
        let raw = r#"[
            {"timestamp": "2025-03-01T09:00:00Z", "pair": "XAU/USD", "platform": "MetaTrader 4", "profit": 6.01},
            {"timestamp": "2025-03-01T10:00:00Z", "pair": "EUR/USD", "platform": "cTrader", "loss": "2.50"}
        ]"#;

        let trades = parse_trades(raw).unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].profit(), dec!(6.01));
        assert_eq!(trades[1].loss(), dec!(2.50));
        assert!(trades[1].profit().is_zero());
    }

    #[test]
    fn test_rejects_negative_amounts() {
        let raw = r#"[
            {"timestamp": "2025-03-01T09:00:00Z", "pair": "XAU/USD", "platform": "Other", "loss": -1}
        ]"#;
        assert!(parse_trades(raw).is_err());
    }

    #[test]
    fn test_rejects_non_array() {
        assert!(parse_trades(r#"{"pair": "XAU/USD"}"#).is_err());
    }

    #[test]
    fn test_run_demo_trades() {
        let trades = parse_trades(DEMO_TRADES).unwrap();
        assert_eq!(trades.len(), 8);

        let report = run(ProgressionConfig::default(), &trades);

        // The ETH/USD entry carries no amount
        assert_eq!(report.rejected, vec![6]);
        assert_eq!(report.engine.ledger().len(), 7);

        // 20 -> 22.40 -> 26.05 -> 24.85 -> 28.95 -> 33.95 -> reset 20 -> 21.75
        let balances: Vec<Decimal> = report
            .engine
            .ledger()
            .iter()
            .map(|e| e.balance_after)
            .collect();
        assert_eq!(
            balances,
            vec![
                dec!(22.40),
                dec!(26.05),
                dec!(24.85),
                dec!(28.95),
                dec!(33.95),
                dec!(20.00),
                dec!(21.75)
            ]
        );
        assert_eq!(report.engine.current_level(), 1);

        let metrics = report.metrics();
        assert_eq!(metrics.total_trades, 7);
        assert_eq!(metrics.resets, 1);
        assert_eq!(metrics.peak_level, 3);
        assert_eq!(metrics.closing_balance, dec!(21.75));
    }

    #[test]
    fn test_run_keeps_ledger_after_rejection() {
        let raw = r#"[
            {"timestamp": "2025-03-01T09:00:00Z", "pair": "XAU/USD", "platform": "MetaTrader 4"},
            {"timestamp": "2025-03-01T10:00:00Z", "pair": "XAU/USD", "platform": "MetaTrader 4", "profit": 6}
        ]"#;
        let trades = parse_trades(raw).unwrap();
        let report = run(ProgressionConfig::default(), &trades);

        assert_eq!(report.rejected, vec![1]);
        assert_eq!(report.engine.current_balance(), dec!(26));

        let mut engine = ProgressionEngine::default();
        let outcome = engine.apply_trade(&trades[1]).unwrap();
        assert_eq!(outcome.change, LevelChange::LevelUp);
    }
}
