//! Per-level requirement set derived from the progression rules.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Thresholds and sizing that apply while the account sits at one level.
///
/// Values are unrounded; rounding to cents happens when rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRequirements {
    /// Level index (1-based)
    pub level: u32,

    /// Balance at which this level begins
    pub starting_balance: Decimal,

    /// Profit needed on top of the starting balance to reach the next level
    pub level_up_requirement: Decimal,

    /// Balance that promotes the account to the next level
    pub target_balance: Decimal,

    /// Lot size to trade at this level
    pub lot_size: Decimal,

    /// Largest single loss tolerated before the account is reset
    pub risk_limit: Decimal,
}

impl std::fmt::Display for LevelRequirements {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:>5} {:>14.2} {:>12.2} {:>14.2} {:>8} {:>12.2}",
            self.level,
            self.starting_balance,
            self.level_up_requirement,
            self.target_balance,
            self.lot_size,
            self.risk_limit
        )
    }
}
