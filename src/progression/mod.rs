//! Level progression: configuration, level math, and the trade-applying engine.

mod config;
mod engine;
mod error;
mod level_model;
mod session;

pub use config::ProgressionConfig;
pub use engine::{AccountState, LevelChange, Progress, ProgressionEngine, ResetReason, TradeOutcome};
pub use error::ValidationError;
pub use level_model::LevelModel;
pub use session::{SessionSnapshot, SharedSession};
