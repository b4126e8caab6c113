use chrono::Duration;
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    // A sequence of decimal numbers each with a unit suffix, e.g. "1h30m", "1.5h", "300ms".
    static ref DURATION_RE: Regex =
        Regex::new(r"^[+-]?(?:(?:\d+(?:\.\d*)?|\.\d+)(?:ns|us|µs|μs|ms|s|m|h))+$")
            .expect("duration pattern is valid");
    static ref COMPONENT_RE: Regex =
        Regex::new(r"(\d+(?:\.\d*)?|\.\d+)(ns|us|µs|μs|ms|s|m|h)").expect("component pattern is valid");
}

#[derive(Debug, Error, PartialEq)]
pub enum DurationError {
    #[error("invalid duration {0:?}")]
    Invalid(String),
    #[error("duration must not be negative")]
    Negative,
}

/// Parses a duration like `1h30m`. Blank input yields `default`.
pub fn parse_duration(input: &str, default: Duration) -> Result<Duration, DurationError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(default);
    }
    if input == "0" {
        return Ok(Duration::zero());
    }
    if !DURATION_RE.is_match(input) {
        return Err(DurationError::Invalid(input.to_string()));
    }

    let mut nanos = 0f64;
    for caps in COMPONENT_RE.captures_iter(input) {
        let value: f64 = caps[1]
            .parse()
            .map_err(|_| DurationError::Invalid(input.to_string()))?;
        let unit_nanos = match &caps[2] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3_600e9,
            _ => return Err(DurationError::Invalid(input.to_string())),
        };
        nanos += value * unit_nanos;
    }

    if !nanos.is_finite() || nanos >= i64::MAX as f64 {
        return Err(DurationError::Invalid(input.to_string()));
    }
    if input.starts_with('-') && nanos > 0.0 {
        return Err(DurationError::Negative);
    }

    Ok(Duration::nanoseconds(nanos.round() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<Duration, DurationError> {
        parse_duration(input, Duration::hours(1))
    }

    #[test]
    fn blank_uses_default() {
        assert_eq!(parse(""), Ok(Duration::hours(1)));
        assert_eq!(parse("   "), Ok(Duration::hours(1)));
    }

    #[test]
    fn unit_sequences() {
        assert_eq!(parse("0"), Ok(Duration::zero()));
        assert_eq!(parse("0s"), Ok(Duration::zero()));
        assert_eq!(parse("90s"), Ok(Duration::seconds(90)));
        assert_eq!(parse("1h30m"), Ok(Duration::minutes(90)));
        assert_eq!(parse("1.5h"), Ok(Duration::minutes(90)));
        assert_eq!(parse("+2m"), Ok(Duration::minutes(2)));
        assert_eq!(parse("250ms"), Ok(Duration::milliseconds(250)));
        assert_eq!(parse("24h"), Ok(Duration::hours(24)));
    }

    #[test]
    fn rejects_garbage_and_negatives() {
        assert!(matches!(parse("soon"), Err(DurationError::Invalid(_))));
        assert!(matches!(parse("10"), Err(DurationError::Invalid(_))));
        assert!(matches!(parse("1d"), Err(DurationError::Invalid(_))));
        assert!(matches!(parse("h"), Err(DurationError::Invalid(_))));
        assert_eq!(parse("-5m"), Err(DurationError::Negative));
        assert_eq!(parse("-0s"), Ok(Duration::zero()));
    }
}
