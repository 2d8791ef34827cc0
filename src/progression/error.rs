//! Errors reported by the progression engine.

use thiserror::Error;

/// Trade events the engine refuses to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Both profit and loss were zero
    #[error("enter either a profit or a loss")]
    NoAmountSpecified,
}
