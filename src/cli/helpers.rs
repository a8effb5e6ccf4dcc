//! Shared helper functions for CLI commands
//!
//! Parsing of `--set` style assignments and small formatting utilities used
//! across command modules.

use serde_json::Value;

use crate::entities::FieldValues;
use crate::wizard::normalize::MAX_DOLLARS;

/// Truncate a string to max_len, adding "..." if truncated
///
/// Counts characters, so multi-byte text is never split mid-character.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Escape a string for CSV output
///
/// Handles commas, quotes, and newlines according to RFC 4180.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Parse `key=value`
///
/// Values stay text; the wizard decides how each field is coerced.
pub fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{}'", s));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Parse a unit assignment `N.key=value` (`2.occupancy=vacant`)
pub fn parse_unit_assignment(s: &str) -> Result<(u32, String, String), String> {
    let (target, value) = parse_assignment(s)?;
    let (number, key) = target
        .split_once('.')
        .ok_or_else(|| format!("expected N.key=value, got '{}'", s))?;
    let number: u32 = number
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a unit number", number))?;
    if number == 0 {
        return Err("unit numbers start at 1".to_string());
    }
    Ok((number, key.trim().to_string(), value))
}

/// Collect assignments into raw field values (later keys win)
pub fn assignments_to_values(assignments: &[(String, String)]) -> FieldValues {
    assignments
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
}

/// Parse a dollar amount (`1,250.50`, `$900`) into cents
pub fn parse_dollars(s: &str) -> Result<u64, String> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    let amount: f64 = cleaned
        .parse()
        .map_err(|_| format!("'{}' is not a dollar amount", s))?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(format!("'{}' is not a dollar amount", s));
    }
    if amount > MAX_DOLLARS {
        return Err(format!("'{}' exceeds $10,000,000,000", s));
    }
    Ok((amount * 100.0).round() as u64)
}
