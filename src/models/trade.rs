//! Trade events submitted by the player and the ledger entries they produce.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A closed trade reported by the player.
///
/// Amounts are non-negative magnitudes, checked when the event is built or
/// deserialized. Exactly one of `profit` and `loss` is expected to be
/// non-zero; the engine rejects events where both are zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTradeEvent")]
pub struct TradeEvent {
    timestamp: DateTime<Utc>,
    pair: String,
    platform: String,
    profit: Decimal,
    loss: Decimal,
}

/// Wire shape of a trade event before its amounts are checked.
#[derive(Debug, Deserialize)]
struct RawTradeEvent {
    /// When the trade was closed
    timestamp: DateTime<Utc>,

    /// Instrument traded (e.g., "XAU/USD")
    pair: String,

    /// Platform the trade was placed on (e.g., "MetaTrader 5")
    platform: String,

    /// Realized profit in account currency
    #[serde(default)]
    profit: Decimal,

    /// Realized loss in account currency (positive number)
    #[serde(default)]
    loss: Decimal,
}

impl TryFrom<RawTradeEvent> for TradeEvent {
    type Error = anyhow::Error;

    fn try_from(raw: RawTradeEvent) -> Result<Self> {
        Self::new(raw.timestamp, raw.pair, raw.platform, raw.profit, raw.loss)
    }
}

impl TradeEvent {
    /// Build a trade event. Fails if either amount is negative.
    pub fn new(
        timestamp: DateTime<Utc>,
        pair: impl Into<String>,
        platform: impl Into<String>,
        profit: Decimal,
        loss: Decimal,
    ) -> Result<Self> {
        let pair = pair.into();
        if profit < Decimal::ZERO {
            bail!("profit must not be negative, got {} ({} at {})", profit, pair, timestamp);
        }
        if loss < Decimal::ZERO {
            bail!("loss must not be negative, got {} ({} at {})", loss, pair, timestamp);
        }

        Ok(Self {
            timestamp,
            pair,
            platform: platform.into(),
            profit,
            loss,
        })
    }

    /// A winning trade.
    pub fn with_profit(
        timestamp: DateTime<Utc>,
        pair: impl Into<String>,
        platform: impl Into<String>,
        amount: Decimal,
    ) -> Result<Self> {
        Self::new(timestamp, pair, platform, amount, Decimal::ZERO)
    }

    /// A losing trade.
    pub fn with_loss(
        timestamp: DateTime<Utc>,
        pair: impl Into<String>,
        platform: impl Into<String>,
        amount: Decimal,
    ) -> Result<Self> {
        Self::new(timestamp, pair, platform, Decimal::ZERO, amount)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn pair(&self) -> &str {
        &self.pair
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn profit(&self) -> Decimal {
        self.profit
    }

    pub fn loss(&self) -> Decimal {
        self.loss
    }

    /// True when the profit branch applies (any positive profit wins over loss).
    pub fn is_profit(&self) -> bool {
        self.profit > Decimal::ZERO
    }

    /// Signed P&L of the trade as applied to the balance.
    pub fn net_pnl(&self) -> Decimal {
        if self.is_profit() {
            self.profit
        } else {
            -self.loss
        }
    }
}

/// One row of the session's trade history. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub timestamp: DateTime<Utc>,
    pub pair: String,
    pub platform: String,
    pub profit: Decimal,
    pub loss: Decimal,

    /// Level after the trade (and any reset) was applied
    pub level_after: u32,

    /// Lot size for the level after the trade
    pub lot_size_after: Decimal,

    /// Balance after the trade (and any reset) was applied
    pub balance_after: Decimal,

    /// Whether this trade triggered a reset to the base balance
    #[serde(default)]
    pub reset: bool,
}

impl LedgerEntry {
    /// Signed P&L recorded for this entry.
    pub fn net_pnl(&self) -> Decimal {
        if self.profit > Decimal::ZERO {
            self.profit
        } else {
            -self.loss
        }
    }
}
