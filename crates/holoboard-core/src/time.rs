//! Human readable durations quantized to scheduler ticks.
//!
//! Durations are written as one or more `<amount><unit>` pairs, e.g. `30s`,
//! `5m` or `1h30m`. Supported units:
//!
//! | Unit | Meaning |
//! |------|---------|
//! | `d`  | days    |
//! | `h`  | hours   |
//! | `m`  | minutes |
//! | `s`  | seconds |
//! | `t`  | ticks   |
//!
//! A trailing amount without a unit is read as seconds.

use std::fmt::Write;

use tracing::warn;

use crate::error::{Error, Result};

/// Smallest unit of time the host scheduler understands
pub type Ticks = u64;

/// Host clock rate
pub const TICKS_PER_SECOND: Ticks = 20;

const TICKS_PER_MINUTE: Ticks = 60 * TICKS_PER_SECOND;
const TICKS_PER_HOUR: Ticks = 60 * TICKS_PER_MINUTE;
const TICKS_PER_DAY: Ticks = 24 * TICKS_PER_HOUR;

/// Units ordered from largest to smallest, used by [`format_ticks`]
const UNITS: [(char, Ticks); 5] = [
    ('d', TICKS_PER_DAY),
    ('h', TICKS_PER_HOUR),
    ('m', TICKS_PER_MINUTE),
    ('s', TICKS_PER_SECOND),
    ('t', 1),
];

fn unit_ticks(unit: char) -> Option<Ticks> {
    UNITS
        .iter()
        .find(|(symbol, _)| *symbol == unit)
        .map(|(_, ticks)| *ticks)
}

fn invalid(input: &str, reason: impl Into<String>) -> Error {
    Error::InvalidDuration {
        input: input.to_string(),
        reason: reason.into(),
    }
}

fn accumulate(input: &str, total: Ticks, digits: &str, per_unit: Ticks) -> Result<Ticks> {
    let amount: Ticks = digits
        .parse()
        .map_err(|_| invalid(input, "amount out of range"))?;
    amount
        .checked_mul(per_unit)
        .and_then(|ticks| total.checked_add(ticks))
        .ok_or_else(|| invalid(input, "duration out of range"))
}

/// Parse a duration string into ticks.
pub fn parse_ticks(text: &str) -> Result<Ticks> {
    let input = text.trim().to_ascii_lowercase();
    if input.is_empty() {
        return Err(invalid(text, "empty duration"));
    }

    let mut total: Ticks = 0;
    let mut digits = String::new();
    // Whitespace seen after the digits of the current amount
    let mut gap = false;

    for c in input.chars() {
        if c.is_ascii_digit() {
            if gap {
                return Err(invalid(text, "whitespace inside amount"));
            }
            digits.push(c);
            continue;
        }
        if c.is_whitespace() {
            gap = !digits.is_empty();
            continue;
        }
        gap = false;

        let per_unit = unit_ticks(c).ok_or_else(|| invalid(text, format!("unknown unit '{c}'")))?;
        if digits.is_empty() {
            return Err(invalid(text, format!("missing amount before '{c}'")));
        }
        total = accumulate(text, total, &digits, per_unit)?;
        digits.clear();
    }

    if !digits.is_empty() {
        total = accumulate(text, total, &digits, TICKS_PER_SECOND)?;
    }

    Ok(total)
}

/// Parse a duration, falling back to `default` (with a warning) when the text is invalid.
pub fn parse_ticks_or(text: &str, default: Ticks) -> Ticks {
    match parse_ticks(text) {
        Ok(ticks) => ticks,
        Err(e) => {
            warn!("{}, using {}", e, format_ticks(default));
            default
        }
    }
}

/// Format ticks as the canonical compound duration (`1m30s`, `30m`, `5t`).
pub fn format_ticks(ticks: Ticks) -> String {
    if ticks == 0 {
        return "0s".to_string();
    }

    let mut rest = ticks;
    let mut out = String::new();
    for (unit, per_unit) in UNITS {
        if rest >= per_unit {
            let _ = write!(out, "{}{}", rest / per_unit, unit);
            rest %= per_unit;
        }
    }
    out
}

/// Convert whole seconds to ticks
pub const fn seconds(secs: u64) -> Ticks {
    secs * TICKS_PER_SECOND
}

/// Convert whole minutes to ticks
pub const fn minutes(mins: u64) -> Ticks {
    mins * TICKS_PER_MINUTE
}
