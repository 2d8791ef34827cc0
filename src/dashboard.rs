//! Terminal rendering of the session: banners, dashboard, history, level table, rules.

use std::fmt::Write;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::models::LedgerEntry;
use crate::progression::{
    LevelChange, LevelModel, Progress, ProgressionConfig, SessionSnapshot, TradeOutcome,
};

const BAR_WIDTH: usize = 30;

/// Banner for a level change, if the trade caused one.
pub fn banner(outcome: &TradeOutcome) -> Option<String> {
    match outcome.change {
        LevelChange::LevelUp => Some(format!(
            "*** LEVEL UP! Now at Level {} (lot size {}) ***",
            outcome.level_after,
            outcome.requirements.lot_size.normalize()
        )),
        LevelChange::LevelDown => Some(format!(
            "Dropped from Level {} to Level {}",
            outcome.level_before, outcome.level_after
        )),
        LevelChange::Reset => {
            let reason = outcome.reset_reason.map(|r| r.as_str()).unwrap_or("reset");
            Some(format!(
                "!!! {}! Reset to Level 1 at ${:.2} !!!",
                reason.to_uppercase(),
                outcome.balance
            ))
        }
        LevelChange::NoChange => None,
    }
}

/// Level, balance, lot size and progress bar.
pub fn dashboard(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:-^50}", "");
    let _ = writeln!(out, "Current Level:    {}", snapshot.level);
    let _ = writeln!(out, "Account Balance:  ${:.2}", snapshot.balance);
    let _ = writeln!(out, "Current Lot Size: {}", snapshot.requirements.lot_size.normalize());
    let _ = writeln!(out, "Risk Limit:       ${:.2}", snapshot.requirements.risk_limit);

    match snapshot.progress {
        Progress::Fraction(fraction) => {
            let _ = writeln!(out, "{}", progress_bar(fraction));
            let _ = writeln!(
                out,
                "{:.1}% to Level {} (target ${:.2})",
                fraction * Decimal::ONE_HUNDRED,
                snapshot.level + 1,
                snapshot.requirements.target_balance
            );
        }
        Progress::MaxLevelReached => {
            let _ = writeln!(out, "CONGRATULATIONS! You've reached MAX LEVEL!");
        }
    }
    let _ = write!(out, "{:-^50}", "");
    out
}

fn progress_bar(fraction: Decimal) -> String {
    let filled = (fraction.to_f64().unwrap_or(0.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

/// Trade history, newest first.
pub fn history(ledger: &[LedgerEntry]) -> String {
    if ledger.is_empty() {
        return "No trades recorded yet.".to_string();
    }

    let mut rows: Vec<&LedgerEntry> = ledger.iter().collect();
    // Stable sort keeps append order for equal timestamps
    rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<17} {:<9} {:<14} {:>9} {:>9} {:>5} {:>6} {:>11}",
        "DATE", "PAIR", "PLATFORM", "PROFIT", "LOSS", "LEVEL", "LOT", "BALANCE"
    );
    let _ = writeln!(out, "{}", "-".repeat(87));

    for entry in rows {
        let _ = writeln!(
            out,
            "{:<17} {:<9} {:<14} {:>9.2} {:>9.2} {:>5} {:>6} {:>11.2}{}",
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            truncate(&entry.pair, 9),
            truncate(&entry.platform, 14),
            entry.profit,
            entry.loss,
            entry.level_after,
            entry.lot_size_after.normalize(),
            entry.balance_after,
            if entry.reset { "  RESET" } else { "" }
        );
    }
    out.truncate(out.trim_end().len());
    out
}

/// Requirement table for levels `from..=to`, clamped to the model's range.
pub fn level_table(model: &LevelModel, from: u32, to: u32) -> String {
    let from = from.max(1);
    let to = to.min(model.max_level());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>5} {:>14} {:>12} {:>14} {:>8} {:>12}",
        "LEVEL", "START", "TO LEVEL UP", "TARGET", "LOT", "RISK LIMIT"
    );
    let _ = writeln!(out, "{}", "-".repeat(70));
    for level in from..=to {
        let _ = writeln!(out, "{}", model.requirements_for_level(level));
    }
    out.truncate(out.trim_end().len());
    out
}

/// Game rules for the active configuration.
pub fn rules(config: &ProgressionConfig) -> String {
    let growth_pct = (config.growth_rate - Decimal::ONE) * Decimal::ONE_HUNDRED;
    let loss_pct = config.max_loss_pct * Decimal::ONE_HUNDRED;
    let model = LevelModel::new(config.clone());
    let level_1 = model.requirements_for_level(1);
    let level_2 = model.requirements_for_level(2);

    let mut out = String::new();
    let _ = writeln!(out, "{:=^50}", " NLEVEL TRADER RULES ");
    let _ = writeln!(out, "Starting Balance:  ${:.2}", config.base_balance);
    let _ = writeln!(out, "Starting Lot Size: {}", config.base_lot_size.normalize());
    let _ = writeln!(out, "Levels:            {} total", config.max_level);
    let _ = writeln!(out);
    let _ = writeln!(out, "Level Progression:");
    let _ = writeln!(
        out,
        "  Earn {}% on the current level's starting balance to level up.",
        growth_pct.normalize()
    );
    let _ = writeln!(out, "  Each level adds {} to the lot size.", config.lot_step.normalize());
    let _ = writeln!(out, "  Losses can drop you back to a lower level.");
    let _ = writeln!(out);
    let _ = writeln!(out, "Risk Management:");
    let _ = writeln!(
        out,
        "  A single loss of {}% of the level's starting balance resets to Level 1.",
        loss_pct.normalize()
    );
    let _ = writeln!(
        out,
        "  Falling below ${:.2} resets to Level 1 at any level.",
        config.catastrophic_floor()
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Example:");
    let _ = writeln!(
        out,
        "  Level 1: start with ${:.2}, need ${:.2} profit to reach Level 2.",
        level_1.starting_balance, level_1.level_up_requirement
    );
    let _ = writeln!(
        out,
        "  Level 2: start with ${:.2}, need ${:.2} profit to reach Level 3.",
        level_2.starting_balance, level_2.level_up_requirement
    );
    let _ = writeln!(
        out,
        "  Losing ${:.2} in one trade at Level 1 resets to Level 1.",
        level_1.risk_limit
    );
    let _ = write!(out, "{:=^50}", "");
    out
}

/// Truncate a string with ellipsis if too long.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
