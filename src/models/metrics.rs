//! Session analytics: win/loss statistics, balance growth, trades per level.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Derived statistics for one session's ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetrics {
    /// Balance before the first trade
    pub opening_balance: Decimal,

    /// Balance after the last trade
    pub closing_balance: Decimal,

    // === Trade Counts ===
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,

    /// Win rate (0.0 to 1.0)
    pub win_rate: f64,

    // === P&L ===
    pub gross_profit: Decimal,

    /// Sum of losses (positive number)
    pub gross_loss: Decimal,

    pub net_pnl: Decimal,

    /// Gross profit / gross loss
    pub profit_factor: f64,

    pub avg_win: Decimal,

    /// Average loss on losing trades (absolute value)
    pub avg_loss: Decimal,

    /// Mean of per-trade P&L
    pub pnl_mean: f64,

    /// Standard deviation of per-trade P&L
    pub pnl_std_dev: f64,

    // === Balance Curve ===
    /// Balance after each trade
    pub balance_curve: Vec<(DateTime<Utc>, Decimal)>,

    pub peak_balance: Decimal,

    /// Largest drop from a running peak, in account currency
    pub max_drawdown: Decimal,

    /// Largest drop from a running peak as a fraction of that peak (0.0 to 1.0)
    pub max_drawdown_pct: f64,

    // === Levels ===
    /// Number of trades recorded at each level (level after the trade)
    pub trades_per_level: BTreeMap<u32, u32>,

    pub peak_level: u32,

    /// Trades that reset the account to level 1
    pub resets: u32,
}

impl SessionMetrics {
    /// Empty metrics for a session that has not traded yet.
    pub fn new(opening_balance: Decimal) -> Self {
        Self {
            opening_balance,
            closing_balance: opening_balance,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate: 0.0,
            gross_profit: Decimal::ZERO,
            gross_loss: Decimal::ZERO,
            net_pnl: Decimal::ZERO,
            profit_factor: 0.0,
            avg_win: Decimal::ZERO,
            avg_loss: Decimal::ZERO,
            pnl_mean: 0.0,
            pnl_std_dev: 0.0,
            balance_curve: Vec::new(),
            peak_balance: opening_balance,
            max_drawdown: Decimal::ZERO,
            max_drawdown_pct: 0.0,
            trades_per_level: BTreeMap::new(),
            peak_level: 1,
            resets: 0,
        }
    }

    /// Return on the opening balance, including resets.
    pub fn return_pct(&self) -> Decimal {
        if self.opening_balance.is_zero() {
            return Decimal::ZERO;
        }
        (self.closing_balance - self.opening_balance) / self.opening_balance
    }
}

impl std::fmt::Display for SessionMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n{:=^50}", " TRADING ANALYTICS ")?;
        writeln!(f)?;
        writeln!(f, "--- Balance ---")?;
        writeln!(f, "Opening:       ${:.2}", self.opening_balance)?;
        writeln!(f, "Closing:       ${:.2}", self.closing_balance)?;
        writeln!(f, "Return:        {:.2}%", self.return_pct() * Decimal::ONE_HUNDRED)?;
        writeln!(f, "Peak:          ${:.2}", self.peak_balance)?;
        writeln!(
            f,
            "Max Drawdown:  ${:.2} ({:.1}%)",
            self.max_drawdown,
            self.max_drawdown_pct * 100.0
        )?;
        writeln!(f)?;
        writeln!(f, "--- Trades ---")?;
        writeln!(f, "Total:         {}", self.total_trades)?;
        writeln!(f, "Winners:       {} ({:.1}%)", self.winning_trades, self.win_rate * 100.0)?;
        writeln!(f, "Losers:        {}", self.losing_trades)?;
        writeln!(f, "Gross Profit:  ${:.2}", self.gross_profit)?;
        writeln!(f, "Gross Loss:    ${:.2}", self.gross_loss)?;
        writeln!(f, "Net P&L:       ${:.2}", self.net_pnl)?;
        writeln!(f, "Avg Win:       ${:.2}", self.avg_win)?;
        writeln!(f, "Avg Loss:      ${:.2}", self.avg_loss)?;
        writeln!(f, "Profit Factor: {:.2}", self.profit_factor)?;
        writeln!(f, "P&L Mean/SD:   {:.2} / {:.2}", self.pnl_mean, self.pnl_std_dev)?;
        writeln!(f)?;
        writeln!(f, "--- Levels ---")?;
        writeln!(f, "Peak Level:    {}", self.peak_level)?;
        writeln!(f, "Resets:        {}", self.resets)?;
        for (level, count) in &self.trades_per_level {
            writeln!(f, "  Level {:>2}: {:>4} {}", level, count, "#".repeat((*count).min(40) as usize))?;
        }
        if !self.balance_curve.is_empty() {
            writeln!(f)?;
            writeln!(f, "--- Balance Growth (last {}) ---", self.balance_curve.len().min(10))?;
            let skip = self.balance_curve.len().saturating_sub(10);
            for (at, balance) in self.balance_curve.iter().skip(skip) {
                writeln!(f, "  {}  ${:>10.2}", at.format("%Y-%m-%d %H:%M"), balance)?;
            }
        }
        writeln!(f, "{:=^50}", "")?;
        Ok(())
    }
}
