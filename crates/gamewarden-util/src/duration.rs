//! Human-readable duration parsing

use std::time::Duration;

use crate::DurationError;

/// Unit suffixes with their multiplier in seconds.
///
/// Ordered longest first so that "min" wins over "m" and "sec" over "s".
const UNIT_SUFFIXES: &[(&str, u64)] = &[
    ("minute", 60),
    ("second", 1),
    ("hour", 3600),
    ("min", 60),
    ("sec", 1),
    ("hr", 3600),
    ("h", 3600),
    ("m", 60),
    ("s", 1),
];

/// Parse strings like `2h`, `90m`, `10min` or `45s` into a whole-second duration.
///
/// Matching is case-insensitive and ignores surrounding whitespace, but the
/// unit must follow the number directly (`1.5 h` is rejected). The numeric
/// part may be fractional (`1.5h`) or use an exponent (`1e3s`); the result
/// is truncated toward zero to whole seconds.
pub fn parse_duration(text: &str) -> Result<Duration, DurationError> {
    let normalized = text.trim().to_ascii_lowercase();

    for (suffix, factor) in UNIT_SUFFIXES {
        let Some(number) = normalized.strip_suffix(suffix) else {
            continue;
        };

        if let Some(value) = parse_amount(number) {
            let seconds = value * *factor as f64;
            if seconds > u64::MAX as f64 {
                return Err(DurationError::invalid(text));
            }
            return Ok(Duration::from_secs(seconds.trunc() as u64));
        }
    }

    Err(DurationError::invalid(text))
}

fn parse_amount(number: &str) -> Option<f64> {
    // Plain decimal or exponent notation only: no sign, no inf/nan, no spaces
    let starts_numeric = number
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '.');
    let numeric_chars = number
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | '+' | '-'));
    if !starts_numeric || !numeric_chars {
        return None;
    }

    number
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(text: &str) -> u64 {
        parse_duration(text).unwrap().as_secs()
    }

    #[test]
    fn parses_each_unit() {
        assert_eq!(secs("2h"), 7200);
        assert_eq!(secs("90m"), 5400);
        assert_eq!(secs("10min"), 600);
        assert_eq!(secs("45s"), 45);
        assert_eq!(secs("1hr"), 3600);
        assert_eq!(secs("3hour"), 10800);
        assert_eq!(secs("2minute"), 120);
        assert_eq!(secs("30sec"), 30);
        assert_eq!(secs("5second"), 5);
    }

    #[test]
    fn case_and_whitespace_are_ignored() {
        assert_eq!(secs("  2H  "), 7200);
        assert_eq!(secs("10MIN"), 600);
    }

    #[test]
    fn unit_must_follow_number() {
        assert!(parse_duration("1.5 h").is_err());
        assert!(parse_duration("2 min").is_err());
        assert!(parse_duration(" 45\ts").is_err());
    }

    #[test]
    fn exponents_are_accepted() {
        assert_eq!(secs("1e3s"), 1000);
        assert_eq!(secs("2.5E1m"), 1500);
        assert_eq!(secs("1e-3h"), 3);
    }

    #[test]
    fn fractions_truncate_toward_zero() {
        assert_eq!(secs("1.5h"), 5400);
        assert_eq!(secs("0.01m"), 0);
        assert_eq!(secs("2.9s"), 2);
    }

    #[test]
    fn zero_is_accepted() {
        assert_eq!(secs("0m"), 0);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_duration("xyz"),
            Err(DurationError::InvalidDurationFormat(s)) if s == "xyz"
        ));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("h").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("-5m").is_err());
        assert!(parse_duration("2hours").is_err());
        assert!(parse_duration("+5m").is_err());
        assert!(parse_duration("1e5000s").is_err());
        assert!(parse_duration("infs").is_err());
    }
}
