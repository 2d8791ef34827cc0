//! Shared handle that serializes access to one session's engine.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;

use crate::models::{LedgerEntry, LevelRequirements, TradeEvent};
use super::{Progress, ProgressionConfig, ProgressionEngine, TradeOutcome, ValidationError};

/// Point-in-time view of a session for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub balance: Decimal,
    pub level: u32,
    pub requirements: LevelRequirements,
    pub progress: Progress,
    pub ledger: Vec<LedgerEntry>,
}

impl From<&ProgressionEngine> for SessionSnapshot {
    fn from(engine: &ProgressionEngine) -> Self {
        Self {
            balance: engine.current_balance(),
            level: engine.current_level(),
            requirements: engine.current_requirements(),
            progress: engine.progress_to_next_level(),
            ledger: engine.ledger_snapshot(),
        }
    }
}

/// Cloneable session handle. Trades are applied under a single write lock;
/// readers only ever see whole snapshots.
#[derive(Clone)]
pub struct SharedSession {
    engine: Arc<RwLock<ProgressionEngine>>,
}

impl SharedSession {
    /// Open a new session at the configured base balance.
    pub fn new(config: ProgressionConfig) -> Self {
        info!(
            base_balance = %config.base_balance,
            max_level = config.max_level,
            "Session started"
        );
        Self::from_engine(ProgressionEngine::new(config))
    }

    pub fn from_engine(engine: ProgressionEngine) -> Self {
        Self {
            engine: Arc::new(RwLock::new(engine)),
        }
    }

    /// Apply a trade while holding the write lock for the whole update.
    pub async fn apply_trade(&self, event: &TradeEvent) -> Result<TradeOutcome, ValidationError> {
        let mut engine = self.engine.write().await;
        engine.apply_trade(event)
    }

    /// Consistent view of balance, level, progress and ledger.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let engine = self.engine.read().await;
        SessionSnapshot::from(&*engine)
    }

    pub async fn config(&self) -> ProgressionConfig {
        self.engine.read().await.model().config().clone()
    }
}
