//! Progression engine: applies trade events to the account and keeps the ledger.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::{LedgerEntry, LevelRequirements, TradeEvent};
use super::{LevelModel, ProgressionConfig, ValidationError};

/// How a trade moved the account across levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelChange {
    LevelUp,
    LevelDown,
    NoChange,
    /// The account was reset to the base balance
    Reset,
}

/// Which rule forced a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResetReason {
    /// A single loss reached the risk limit of the level it was taken at
    RiskLimit,
    /// The balance fell below the catastrophic floor
    CatastrophicFloor,
}

impl ResetReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResetReason::RiskLimit => "max loss hit",
            ResetReason::CatastrophicFloor => "balance below catastrophic floor",
        }
    }
}

/// Result of an accepted trade, for rendering banners and the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub level_before: u32,
    pub level_after: u32,
    pub change: LevelChange,
    pub balance: Decimal,
    /// Requirements of the level after the trade
    pub requirements: LevelRequirements,
    pub reset_reason: Option<ResetReason>,
}

/// Distance to the next level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Progress {
    /// Fraction of the level-up requirement earned so far, in [0, 1]
    Fraction(Decimal),
    MaxLevelReached,
}

/// Mutable state of one trading session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    balance: Decimal,
    ledger: Vec<LedgerEntry>,
}

impl AccountState {
    /// Fresh session state with an empty ledger.
    pub fn new(opening_balance: Decimal) -> Self {
        Self {
            balance: opening_balance,
            ledger: Vec::new(),
        }
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn ledger(&self) -> &[LedgerEntry] {
        &self.ledger
    }
}

/// Sequential processor of trade events for a single session.
#[derive(Debug, Clone)]
pub struct ProgressionEngine {
    model: LevelModel,
    state: AccountState,
}

impl ProgressionEngine {
    /// Start a session at the configured base balance.
    pub fn new(config: ProgressionConfig) -> Self {
        let state = AccountState::new(config.base_balance);
        Self::with_state(config, state)
    }

    /// Resume from an existing session state.
    pub fn with_state(config: ProgressionConfig, state: AccountState) -> Self {
        Self {
            model: LevelModel::new(config),
            state,
        }
    }

    pub fn model(&self) -> &LevelModel {
        &self.model
    }

    /// Apply one trade event.
    ///
    /// Rejected events leave the balance and ledger untouched. Accepted events
    /// mutate the balance once and append exactly one ledger entry.
    pub fn apply_trade(&mut self, event: &TradeEvent) -> Result<TradeOutcome, ValidationError> {
        if event.profit().is_zero() && event.loss().is_zero() {
            return Err(ValidationError::NoAmountSpecified);
        }
        if event.is_profit() && !event.loss().is_zero() {
            warn!(
                profit = %event.profit(),
                loss = %event.loss(),
                "Trade has both profit and loss, applying profit"
            );
        }

        let config = self.model.config();
        let level_before = self.model.level_for_balance(self.state.balance);
        let reqs_before = self.model.requirements_for_level(level_before);

        let mut balance = self.state.balance.saturating_add(event.net_pnl());

        let reset_reason = if !event.is_profit() && event.loss() >= reqs_before.risk_limit {
            Some(ResetReason::RiskLimit)
        } else if balance < self.model.catastrophic_floor() {
            Some(ResetReason::CatastrophicFloor)
        } else {
            None
        };

        if let Some(reason) = reset_reason {
            warn!(
                level = level_before,
                loss = %event.loss(),
                risk_limit = %reqs_before.risk_limit,
                balance = %balance,
                reason = reason.as_str(),
                "Resetting to level 1"
            );
            balance = config.base_balance;
        }

        let level_after = self.model.level_for_balance(balance);
        let reqs_after = self.model.requirements_for_level(level_after);

        let change = match reset_reason {
            Some(_) => LevelChange::Reset,
            None if level_after > level_before => LevelChange::LevelUp,
            None if level_after < level_before => LevelChange::LevelDown,
            None => LevelChange::NoChange,
        };

        match change {
            LevelChange::LevelUp => info!(from = level_before, to = level_after, "Level up"),
            LevelChange::LevelDown => info!(from = level_before, to = level_after, "Level down"),
            _ => {}
        }

        self.state.balance = balance;
        self.state.ledger.push(LedgerEntry {
            timestamp: event.timestamp(),
            pair: event.pair().to_string(),
            platform: event.platform().to_string(),
            profit: event.profit(),
            loss: event.loss(),
            level_after,
            lot_size_after: reqs_after.lot_size,
            balance_after: balance,
            reset: reset_reason.is_some(),
        });

        debug!(
            pair = %event.pair(),
            pnl = %event.net_pnl(),
            balance = %balance,
            level = level_after,
            entries = self.state.ledger.len(),
            "Trade applied"
        );

        Ok(TradeOutcome {
            level_before,
            level_after,
            change,
            balance,
            requirements: reqs_after,
            reset_reason,
        })
    }

    pub fn current_balance(&self) -> Decimal {
        self.state.balance()
    }

    pub fn current_level(&self) -> u32 {
        self.model.level_for_balance(self.state.balance)
    }

    pub fn current_requirements(&self) -> LevelRequirements {
        self.model.requirements_for_level(self.current_level())
    }

    /// Fraction of the way from the current level's start to its target.
    pub fn progress_to_next_level(&self) -> Progress {
        let level = self.current_level();
        if level >= self.model.max_level() {
            return Progress::MaxLevelReached;
        }

        let reqs = self.model.requirements_for_level(level);
        let fraction = (self.state.balance - reqs.starting_balance)
            .checked_div(reqs.level_up_requirement)
            .unwrap_or(Decimal::ZERO);

        Progress::Fraction(fraction.clamp(Decimal::ZERO, Decimal::ONE))
    }

    /// Copy of the ledger, oldest entry first.
    pub fn ledger_snapshot(&self) -> Vec<LedgerEntry> {
        self.state.ledger.clone()
    }

    pub fn ledger(&self) -> &[LedgerEntry] {
        self.state.ledger()
    }
}

impl Default for ProgressionEngine {
    fn default() -> Self {
        Self::new(ProgressionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn profit(amount: Decimal) -> TradeEvent {
        TradeEvent::with_profit(
            Utc.with_ymd_and_hms(2025, 3, 1, 14, 30, 0).unwrap(),
            "XAU/USD",
            "MetaTrader 5",
            amount,
        )
        .unwrap()
    }

    fn loss(amount: Decimal) -> TradeEvent {
        TradeEvent::with_loss(
            Utc.with_ymd_and_hms(2025, 3, 1, 15, 0, 0).unwrap(),
            "EUR/USD",
            "cTrader",
            amount,
        )
        .unwrap()
    }

    #[test]
    fn test_new_session_starts_at_base() {
        let engine = ProgressionEngine::default();
        assert_eq!(engine.current_balance(), dec!(20.00));
        assert_eq!(engine.current_level(), 1);
        assert!(engine.ledger().is_empty());
    }

    #[test]
    fn test_rejects_empty_trade_without_mutation() {
        let mut engine = ProgressionEngine::default();
        engine.apply_trade(&profit(dec!(2))).unwrap();

        let empty = profit(Decimal::ZERO);
        assert_eq!(engine.apply_trade(&empty), Err(ValidationError::NoAmountSpecified));
        assert_eq!(engine.current_balance(), dec!(22));
        assert_eq!(engine.ledger().len(), 1);
    }

    #[test]
    fn test_profit_levels_up() {
        let mut engine = ProgressionEngine::default();
        let outcome = engine.apply_trade(&profit(dec!(6.01))).unwrap();

        assert_eq!(outcome.level_before, 1);
        assert_eq!(outcome.level_after, 2);
        assert_eq!(outcome.change, LevelChange::LevelUp);
        assert_eq!(outcome.balance, dec!(26.01));
        assert_eq!(outcome.requirements.lot_size, dec!(0.04));

        let ledger = engine.ledger();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].level_after, 2);
        assert_eq!(ledger[0].lot_size_after, dec!(0.04));
        assert_eq!(ledger[0].balance_after, dec!(26.01));
        assert!(!ledger[0].reset);
    }

    #[test]
    fn test_loss_at_risk_limit_resets() {
        let mut engine = ProgressionEngine::default();
        let outcome = engine.apply_trade(&loss(dec!(6.00))).unwrap();

        assert_eq!(outcome.change, LevelChange::Reset);
        assert_eq!(outcome.reset_reason, Some(ResetReason::RiskLimit));
        assert_eq!(outcome.balance, dec!(20.00));
        assert_eq!(engine.current_balance(), dec!(20.00));
        assert!(engine.ledger()[0].reset);
    }

    #[test]
    fn test_large_loss_resets() {
        let mut engine = ProgressionEngine::default();
        let outcome = engine.apply_trade(&loss(dec!(13.01))).unwrap();

        assert_eq!(outcome.change, LevelChange::Reset);
        assert_eq!(outcome.balance, dec!(20.00));
        assert_eq!(engine.ledger()[0].balance_after, dec!(20.00));
        assert_eq!(engine.ledger()[0].level_after, 1);
    }

    #[test]
    fn test_catastrophic_floor_fires_under_risk_limit() {
        let mut engine = ProgressionEngine::default();

        // Three small losses: 20 -> 15 -> 14.50 -> 13.90
        engine.apply_trade(&loss(dec!(5))).unwrap();
        let outcome = engine.apply_trade(&loss(dec!(0.50))).unwrap();
        assert_eq!(outcome.change, LevelChange::NoChange);
        assert_eq!(outcome.balance, dec!(14.50));

        let outcome = engine.apply_trade(&loss(dec!(0.60))).unwrap();
        assert_eq!(outcome.change, LevelChange::Reset);
        assert_eq!(outcome.reset_reason, Some(ResetReason::CatastrophicFloor));
        assert_eq!(outcome.balance, dec!(20.00));
    }

    #[test]
    fn test_ordinary_loss_levels_down() {
        let mut engine = ProgressionEngine::default();
        engine.apply_trade(&profit(dec!(7))).unwrap(); // 27, level 2

        // Risk limit at level 2 is 7.80; a 2.00 loss drops below 26
        let outcome = engine.apply_trade(&loss(dec!(2))).unwrap();
        assert_eq!(outcome.level_before, 2);
        assert_eq!(outcome.level_after, 1);
        assert_eq!(outcome.change, LevelChange::LevelDown);
        assert_eq!(outcome.reset_reason, None);
        assert_eq!(outcome.balance, dec!(25));
    }

    #[test]
    fn test_risk_limit_uses_level_before_trade() {
        let mut engine = ProgressionEngine::default();
        engine.apply_trade(&profit(dec!(14))).unwrap(); // 34, level 3

        // Level 3 risk limit: 33.80 * 0.30 = 10.14
        let outcome = engine.apply_trade(&loss(dec!(10.13))).unwrap();
        assert_eq!(outcome.change, LevelChange::LevelDown);
        assert_eq!(outcome.balance, dec!(23.87));

        let mut engine = ProgressionEngine::default();
        engine.apply_trade(&profit(dec!(14))).unwrap();
        let outcome = engine.apply_trade(&loss(dec!(10.14))).unwrap();
        assert_eq!(outcome.change, LevelChange::Reset);
    }

    #[test]
    fn test_ledger_is_append_only_in_order() {
        let mut engine = ProgressionEngine::default();
        engine.apply_trade(&profit(dec!(1))).unwrap();
        engine.apply_trade(&loss(dec!(0.5))).unwrap();
        let _ = engine.apply_trade(&loss(Decimal::ZERO));
        engine.apply_trade(&profit(dec!(2))).unwrap();

        let balances: Vec<Decimal> = engine.ledger().iter().map(|e| e.balance_after).collect();
        assert_eq!(balances, vec![dec!(21), dec!(20.5), dec!(22.5)]);
    }

    #[test]
    fn test_progress_to_next_level() {
        let mut engine = ProgressionEngine::default();
        assert_eq!(engine.progress_to_next_level(), Progress::Fraction(Decimal::ZERO));

        engine.apply_trade(&profit(dec!(3))).unwrap();
        assert_eq!(engine.progress_to_next_level(), Progress::Fraction(dec!(0.5)));
    }

    #[test]
    fn test_progress_clamped_below_base() {
        let mut engine = ProgressionEngine::default();
        engine.apply_trade(&loss(dec!(3))).unwrap(); // 17, still level 1
        assert_eq!(engine.progress_to_next_level(), Progress::Fraction(Decimal::ZERO));
    }

    #[test]
    fn test_progress_at_max_level() {
        let config = ProgressionConfig {
            max_level: 2,
            ..Default::default()
        };
        let mut engine = ProgressionEngine::new(config);
        engine.apply_trade(&profit(dec!(100))).unwrap();

        assert_eq!(engine.current_level(), 2);
        assert_eq!(engine.progress_to_next_level(), Progress::MaxLevelReached);
    }

    #[test]
    fn test_read_accessors_are_idempotent() {
        let mut engine = ProgressionEngine::default();
        engine.apply_trade(&profit(dec!(9.5))).unwrap();

        assert_eq!(engine.current_level(), engine.current_level());
        assert_eq!(engine.current_requirements(), engine.current_requirements());
        assert_eq!(engine.progress_to_next_level(), engine.progress_to_next_level());
        assert_eq!(engine.ledger_snapshot(), engine.ledger_snapshot());
    }

    #[test]
    fn test_huge_profits_saturate_at_max_level() {
        let mut engine = ProgressionEngine::default();
        let huge = dec!(79228162514264337593543950000);

        let first = engine.apply_trade(&profit(huge)).unwrap();
        assert_eq!(first.level_after, 40);

        let second = engine.apply_trade(&profit(huge)).unwrap();
        assert_eq!(second.level_after, 40);
        assert_eq!(second.change, LevelChange::NoChange);
        assert_eq!(engine.current_balance(), Decimal::MAX);
        assert_eq!(engine.progress_to_next_level(), Progress::MaxLevelReached);
        assert_eq!(engine.ledger().len(), 2);
    }

    #[test]
    fn test_resume_from_state() {
        let state = AccountState::new(dec!(40));
        let engine = ProgressionEngine::with_state(ProgressionConfig::default(), state);

        assert_eq!(engine.current_level(), 3);
        assert_eq!(engine.current_requirements().lot_size, dec!(0.05));
    }
}
