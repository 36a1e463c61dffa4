//! Numeric shorthand for limit flags.

use crate::error::{NscError, Result};
use crate::jwt::claims::NO_LIMIT;

/// Parse `""`, a bare integer, or an integer suffixed with `k`/`K`
/// (thousand), `m`/`M` (million) or `g`/`G` (billion).
pub fn parse_number(text: &str) -> Result<i64> {
    let s = text.trim();
    if s.is_empty() {
        return Ok(0);
    }

    let (digits, multiplier) = match s.chars().last() {
        Some('k' | 'K') => (&s[..s.len() - 1], 1_000),
        Some('m' | 'M') => (&s[..s.len() - 1], 1_000_000),
        Some('g' | 'G') => (&s[..s.len() - 1], 1_000_000_000),
        _ => (s, 1),
    };

    digits
        .parse::<i64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(|| NscError::validation("number", format!("{s:?} is not a valid number")))
}

/// Parse a limit value. `unlimited` and `-1` both mean no limit.
pub fn parse_limit(field: &str, text: &str) -> Result<i64> {
    if text.trim().eq_ignore_ascii_case("unlimited") {
        return Ok(NO_LIMIT);
    }
    let value = parse_number(text).map_err(|_| {
        NscError::validation(field, format!("{:?} is not a valid number", text.trim()))
    })?;
    if value < NO_LIMIT {
        return Err(NscError::validation(
            field,
            format!("{value} is not a valid limit (use -1 for unlimited)"),
        ));
    }
    Ok(value)
}
