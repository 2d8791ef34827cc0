//! Balance to level projection and per-level requirements.
//!
//! Levels are never stored. They are recomputed from the balance every time,
//! so level and balance cannot drift apart.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::models::LevelRequirements;
use super::ProgressionConfig;

/// Pure level math over a fixed configuration.
#[derive(Debug, Clone)]
pub struct LevelModel {
    config: ProgressionConfig,
}

impl LevelModel {
    /// Create a level model for the given rules.
    pub fn new(config: ProgressionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProgressionConfig {
        &self.config
    }

    pub fn max_level(&self) -> u32 {
        self.config.max_level
    }

    /// Balance at which `level` begins: base * growth^(level - 1).
    ///
    /// Saturates at `Decimal::MAX` instead of overflowing.
    pub fn starting_balance(&self, level: u32) -> Decimal {
        (1..level.max(1)).fold(self.config.base_balance, |acc, _| {
            acc.saturating_mul(self.config.growth_rate)
        })
    }

    /// Level for a balance, in `[1, max_level]`.
    ///
    /// Anything below the base balance (zero and negative included) is level 1.
    pub fn level_for_balance(&self, balance: Decimal) -> u32 {
        if balance < self.config.base_balance {
            return 1;
        }

        let max_level = self.config.max_level.max(1);
        let mut level = self.estimate_level(balance).clamp(1, max_level);

        // The log estimate can land one off near a threshold; settle it
        // against the exact decimal thresholds.
        let mut start = self.starting_balance(level);
        while level > 1 && balance < start {
            level -= 1;
            start = self.starting_balance(level);
        }

        let mut next = start.saturating_mul(self.config.growth_rate);
        while level < max_level && balance >= next {
            level += 1;
            next = next.saturating_mul(self.config.growth_rate);
        }

        level
    }

    /// floor(ln(balance / base) / ln(growth)) + 1, or 1 when undefined.
    fn estimate_level(&self, balance: Decimal) -> u32 {
        let ratio = balance
            .checked_div(self.config.base_balance)
            .and_then(|r| r.to_f64())
            .unwrap_or(0.0);
        let growth = self.config.growth_rate.to_f64().unwrap_or(0.0);

        if ratio <= 0.0 || growth <= 1.0 {
            return 1;
        }

        let steps = ratio.ln() / growth.ln();
        if !steps.is_finite() || steps < 0.0 {
            return 1;
        }

        // `as` saturates for huge values
        (steps.floor() as u32).saturating_add(1)
    }

    /// Requirement set for `level`. Levels below 1 are treated as 1.
    pub fn requirements_for_level(&self, level: u32) -> LevelRequirements {
        let level = level.max(1);
        let start = self.starting_balance(level);
        let steps = Decimal::from(level - 1);

        LevelRequirements {
            level,
            starting_balance: start,
            level_up_requirement: start.saturating_mul(self.config.growth_rate - Decimal::ONE),
            target_balance: start.saturating_mul(self.config.growth_rate),
            lot_size: self
                .config
                .base_lot_size
                .saturating_add(self.config.lot_step.saturating_mul(steps)),
            risk_limit: start.saturating_mul(self.config.max_loss_pct),
        }
    }

    /// Balance below which any trade resets the account.
    pub fn catastrophic_floor(&self) -> Decimal {
        self.config.catastrophic_floor()
    }
}

impl Default for LevelModel {
    fn default() -> Self {
        Self::new(ProgressionConfig::default())
    }
}
