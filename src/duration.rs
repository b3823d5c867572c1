//! Human duration grammar for `window`/`interval` config fields.
//!
//! Accepts strings of the form `<integer><unit>` where unit is one of `ms`,
//! `s`, `m`, `h`, `d`, e.g. `"500ms"`, `"10s"`, `"1m"`, `"30m"`. No whitespace,
//! no compound durations — this mirrors exactly the grammar the reference
//! client accepts for its `window`/`interval` options, nothing more.

use crate::error::{RateLimitError, RateLimitResult};

/// Parse a human duration string into the number of milliseconds it denotes.
///
/// # Examples
///
/// ```
/// use hummn_ratelimit::duration::parse_ms;
///
/// assert_eq!(parse_ms("10s").unwrap(), 10_000);
/// assert_eq!(parse_ms("1m").unwrap(), 60_000);
/// assert_eq!(parse_ms("500ms").unwrap(), 500);
/// ```
pub fn parse_ms(input: &str) -> RateLimitResult<u64> {
    let split_at = input
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| RateLimitError::config(format!("duration '{input}' has no unit")))?;

    if split_at == 0 {
        return Err(RateLimitError::config(format!(
            "duration '{input}' must start with an integer"
        )));
    }

    let (digits, unit) = input.split_at(split_at);
    let value: u64 = digits
        .parse()
        .map_err(|_| RateLimitError::config(format!("duration '{input}' has an invalid integer")))?;

    let multiplier = match unit {
        "ms" => 1,
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        other => {
            return Err(RateLimitError::config(format!(
                "duration '{input}' has unknown unit '{other}'"
            )))
        }
    };

    value
        .checked_mul(multiplier)
        .ok_or_else(|| RateLimitError::config(format!("duration '{input}' overflows u64 ms")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_seconds() {
        assert_eq!(parse_ms("10s").unwrap(), 10_000);
        assert_eq!(parse_ms("2s").unwrap(), 2_000);
        assert_eq!(parse_ms("1s").unwrap(), 1_000);
    }

    #[test]
    fn parses_minutes_and_hours_and_days() {
        assert_eq!(parse_ms("1m").unwrap(), 60_000);
        assert_eq!(parse_ms("30m").unwrap(), 1_800_000);
        assert_eq!(parse_ms("2h").unwrap(), 7_200_000);
        assert_eq!(parse_ms("1d").unwrap(), 86_400_000);
    }

    #[test]
    fn parses_milliseconds() {
        assert_eq!(parse_ms("500ms").unwrap(), 500);
    }

    #[test]
    fn rejects_missing_unit() {
        let err = parse_ms("10").unwrap_err();
        assert!(err.to_string().contains("no unit"));
    }

    #[test]
    fn rejects_missing_integer() {
        let err = parse_ms("s").unwrap_err();
        assert!(err.to_string().contains("must start with an integer"));
    }

    #[test]
    fn rejects_unknown_unit() {
        let err = parse_ms("10w").unwrap_err();
        assert!(err.to_string().contains("unknown unit"));
    }

    #[test]
    fn rejects_compound_durations() {
        // "1m30s" splits its digit run at the first non-digit, leaving "m30s"
        // as an unrecognised unit — compound durations are out of grammar.
        assert!(parse_ms("1m30s").is_err());
    }
}
