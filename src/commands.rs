//! Line commands accepted by the interactive session.

use anyhow::{anyhow, bail, Context, Result};
use rust_decimal::Decimal;

/// Which side of the ledger a trade lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeKind {
    Profit,
    Loss,
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Record a closed trade
    Trade {
        kind: TradeKind,
        amount: Decimal,
        pair: Option<String>,
        platform: Option<String>,
    },
    Status,
    History,
    Stats,
    Rules,
    Help,
    Quit,
}

impl SessionCommand {
    /// Parse a line. Blank lines yield `None`.
    ///
    /// Trade syntax: `profit <amount> [pair] [platform...]` or
    /// `loss <amount> [pair] [platform...]`. The platform may contain spaces.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };

        let command = match verb.to_lowercase().as_str() {
            "profit" | "p" | "win" => Self::parse_trade(TradeKind::Profit, words)?,
            "loss" | "l" | "lose" => Self::parse_trade(TradeKind::Loss, words)?,
            "status" | "s" => Self::Status,
            "history" | "h" => Self::History,
            "stats" | "analytics" => Self::Stats,
            "rules" => Self::Rules,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => bail!("unknown command '{}', type 'help' for usage", other),
        };

        Ok(Some(command))
    }

    fn parse_trade<'a>(kind: TradeKind, mut words: impl Iterator<Item = &'a str>) -> Result<Self> {
        let amount = words
            .next()
            .ok_or_else(|| anyhow!("missing amount, e.g. 'profit 6.01 XAU/USD'"))?;
        let amount = parse_amount(amount)?;

        let pair = words.next().map(str::to_string);
        let platform: Vec<&str> = words.collect();
        let platform = if platform.is_empty() {
            None
        } else {
            Some(platform.join(" "))
        };

        Ok(Self::Trade {
            kind,
            amount,
            pair,
            platform,
        })
    }
}

/// Parse a non-negative money amount. A leading `$` is allowed.
pub fn parse_amount(s: &str) -> Result<Decimal> {
    let trimmed = s.trim().trim_start_matches('$');
    let amount: Decimal = trimmed
        .parse()
        .with_context(|| format!("invalid amount '{}'", s))?;

    if amount < Decimal::ZERO {
        bail!("amount must not be negative, got {}", amount);
    }
    Ok(amount)
}

pub const HELP: &str = "\
Commands:
  profit <amount> [pair] [platform]   record a winning trade
  loss <amount> [pair] [platform]     record a losing trade
  status                              level, balance, lot size, progress
  history                             trade history (newest first)
  stats                               trading analytics
  rules                               game rules
  help                                this message
  quit                                end the session";
