//! Session analytics derived from the ledger.

mod calculator;

pub use calculator::MetricsCalculator;
