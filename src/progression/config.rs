//! Progression configuration.

use anyhow::{bail, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Highest `max_level` a configuration may ask for.
pub const MAX_LEVEL_LIMIT: u32 = 1000;

/// Rules of the level progression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionConfig {
    /// Balance every session starts with, and the balance a reset returns to
    pub base_balance: Decimal,

    /// Multiplier between consecutive level starting balances (1.30 = +30%)
    pub growth_rate: Decimal,

    /// Fraction of a level's starting balance that may be lost in one trade (0.0 to 1.0)
    pub max_loss_pct: Decimal,

    /// Lot size at level 1
    pub base_lot_size: Decimal,

    /// Lot size added per level
    pub lot_step: Decimal,

    /// Highest reachable level
    pub max_level: u32,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            base_balance: dec!(20.00), // $20 start
            growth_rate: dec!(1.30),   // +30% per level
            max_loss_pct: dec!(0.30),  // 30% of the level's start
            base_lot_size: dec!(0.03),
            lot_step: dec!(0.01),
            max_level: 40,
        }
    }
}

impl ProgressionConfig {
    /// Reject configurations the level math cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.base_balance <= Decimal::ZERO {
            bail!("base balance must be positive, got {}", self.base_balance);
        }
        if self.growth_rate <= Decimal::ONE {
            bail!("growth rate must be greater than 1, got {}", self.growth_rate);
        }
        if self.max_loss_pct <= Decimal::ZERO || self.max_loss_pct > Decimal::ONE {
            bail!("max loss must be within (0, 1], got {}", self.max_loss_pct);
        }
        if self.base_lot_size.is_sign_negative() || self.lot_step.is_sign_negative() {
            bail!(
                "lot sizes must not be negative, got base {} step {}",
                self.base_lot_size,
                self.lot_step
            );
        }
        if self.max_level == 0 || self.max_level > MAX_LEVEL_LIMIT {
            bail!(
                "max level must be within 1..={}, got {}",
                MAX_LEVEL_LIMIT,
                self.max_level
            );
        }
        Ok(())
    }

    /// Balance below which the account resets regardless of level.
    pub fn catastrophic_floor(&self) -> Decimal {
        self.base_balance * (Decimal::ONE - self.max_loss_pct)
    }
}
