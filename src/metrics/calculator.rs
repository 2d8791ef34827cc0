//! Calculator for session metrics: win rate, drawdown, balance growth, trades per level.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use statrs::statistics::Statistics;

use crate::models::{LedgerEntry, SessionMetrics};

/// Computes session analytics from a ledger snapshot.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Calculate metrics for a ledger that started at `opening_balance`.
    ///
    /// Entries are expected oldest first, as the engine appends them.
    pub fn calculate(opening_balance: Decimal, ledger: &[LedgerEntry]) -> SessionMetrics {
        let mut metrics = SessionMetrics::new(opening_balance);

        if ledger.is_empty() {
            return metrics;
        }

        metrics.total_trades = ledger.len() as u32;

        let pnls: Vec<Decimal> = ledger.iter().map(LedgerEntry::net_pnl).collect();
        Self::calculate_pnl_metrics(&mut metrics, &pnls);
        Self::calculate_balance_curve(&mut metrics, ledger);
        Self::calculate_level_metrics(&mut metrics, ledger);

        metrics
    }

    /// Win/loss counts, averages, and profit factor.
    fn calculate_pnl_metrics(metrics: &mut SessionMetrics, pnls: &[Decimal]) {
        let (wins, losses): (Vec<Decimal>, Vec<Decimal>) =
            pnls.iter().partition(|&&p| p > Decimal::ZERO);

        metrics.winning_trades = wins.len() as u32;
        metrics.losing_trades = losses.len() as u32;
        metrics.win_rate = wins.len() as f64 / pnls.len() as f64;

        metrics.gross_profit = wins.iter().copied().sum();
        metrics.gross_loss = losses.iter().map(|l| l.abs()).sum();
        metrics.net_pnl = metrics.gross_profit - metrics.gross_loss;

        if !wins.is_empty() {
            metrics.avg_win = metrics.gross_profit / Decimal::from(wins.len() as u32);
        }
        if !losses.is_empty() {
            metrics.avg_loss = metrics.gross_loss / Decimal::from(losses.len() as u32);
        }

        if metrics.gross_loss > Decimal::ZERO {
            metrics.profit_factor = metrics.gross_profit.to_f64().unwrap_or(0.0)
                / metrics.gross_loss.to_f64().unwrap_or(1.0);
        }

        let values: Vec<f64> = pnls.iter().filter_map(|p| p.to_f64()).collect();
        if !values.is_empty() {
            metrics.pnl_mean = values.clone().mean();
        }
        if values.len() >= 2 {
            metrics.pnl_std_dev = values.std_dev();
        }
    }

    /// Balance growth curve and max drawdown, starting from the opening balance.
    fn calculate_balance_curve(metrics: &mut SessionMetrics, ledger: &[LedgerEntry]) {
        let mut peak = metrics.opening_balance;
        let mut max_dd = Decimal::ZERO;
        let mut max_dd_pct = 0.0f64;

        for entry in ledger {
            let balance = entry.balance_after;
            metrics.balance_curve.push((entry.timestamp, balance));

            if balance > peak {
                peak = balance;
            }

            let dd = peak - balance;
            if dd > max_dd {
                max_dd = dd;
            }
            if peak > Decimal::ZERO {
                let dd_pct = dd.to_f64().unwrap_or(0.0) / peak.to_f64().unwrap_or(1.0);
                if dd_pct > max_dd_pct {
                    max_dd_pct = dd_pct;
                }
            }
        }

        metrics.peak_balance = peak;
        metrics.max_drawdown = max_dd;
        metrics.max_drawdown_pct = max_dd_pct;
        metrics.closing_balance = ledger
            .last()
            .map(|e| e.balance_after)
            .unwrap_or(metrics.opening_balance);
    }

    /// Trades per level, peak level, and reset count.
    fn calculate_level_metrics(metrics: &mut SessionMetrics, ledger: &[LedgerEntry]) {
        for entry in ledger {
            *metrics.trades_per_level.entry(entry.level_after).or_insert(0) += 1;
            metrics.peak_level = metrics.peak_level.max(entry.level_after);
            if entry.reset {
                metrics.resets += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    use crate::models::TradeEvent;
    use crate::progression::ProgressionEngine;

    fn play(trades: &[Decimal]) -> ProgressionEngine {
        let mut engine = ProgressionEngine::default();
        let start = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();

        for (i, &pnl) in trades.iter().enumerate() {
            let at = start + Duration::hours(i as i64);
            let event = if pnl > Decimal::ZERO {
                TradeEvent::with_profit(at, "XAU/USD", "MetaTrader 5", pnl).unwrap()
            } else {
                TradeEvent::with_loss(at, "XAU/USD", "MetaTrader 5", pnl.abs()).unwrap()
            };
            engine.apply_trade(&event).unwrap();
        }
        engine
    }

    #[test]
    fn test_empty_ledger() {
        let metrics = MetricsCalculator::calculate(dec!(20), &[]);
        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.closing_balance, dec!(20));
        assert_eq!(metrics.peak_level, 1);
        assert!(metrics.trades_per_level.is_empty());
    }

    #[test]
    fn test_calculate_pnl_metrics() {
        let engine = play(&[dec!(4), dec!(-2), dec!(3), dec!(-1), dec!(2)]);
        let metrics = MetricsCalculator::calculate(dec!(20), engine.ledger());

        assert_eq!(metrics.total_trades, 5);
        assert_eq!(metrics.winning_trades, 3);
        assert_eq!(metrics.losing_trades, 2);
        assert_eq!(metrics.gross_profit, dec!(9));
        assert_eq!(metrics.gross_loss, dec!(3));
        assert_eq!(metrics.net_pnl, dec!(6));
        assert_eq!(metrics.avg_win, dec!(3));
        assert_eq!(metrics.avg_loss, dec!(1.5));
        assert!((metrics.win_rate - 0.6).abs() < 0.001);
        assert!((metrics.profit_factor - 3.0).abs() < 0.001);
        assert!((metrics.pnl_mean - 1.2).abs() < 0.001);
        assert!(metrics.pnl_std_dev > 0.0);
        assert_eq!(metrics.closing_balance, dec!(26));
    }

    #[test]
    fn test_calculate_drawdown() {
        // 20 -> 25 -> 22 -> 20.5 -> 24
        let engine = play(&[dec!(5), dec!(-3), dec!(-1.5), dec!(3.5)]);
        let metrics = MetricsCalculator::calculate(dec!(20), engine.ledger());

        assert_eq!(metrics.peak_balance, dec!(25));
        assert_eq!(metrics.max_drawdown, dec!(4.5));
        assert!((metrics.max_drawdown_pct - 0.18).abs() < 0.001);
        assert_eq!(metrics.balance_curve.len(), 4);
        assert_eq!(metrics.balance_curve[3].1, dec!(24));
    }

    #[test]
    fn test_trades_per_level_and_resets() {
        // Level 2 after the first trade, then a loss at the risk limit resets
        let engine = play(&[dec!(7), dec!(1), dec!(-8), dec!(1)]);
        let metrics = MetricsCalculator::calculate(dec!(20), engine.ledger());

        assert_eq!(metrics.peak_level, 2);
        assert_eq!(metrics.resets, 1);
        assert_eq!(metrics.trades_per_level.get(&2), Some(&2));
        assert_eq!(metrics.trades_per_level.get(&1), Some(&2));
        assert_eq!(metrics.closing_balance, dec!(21));
    }
}
