//! Scalar value parsers
//!
//! Bounded integer, floating point and boolean parsers shared by every
//! configuration key. Integers follow `strtol` base-10 rules: an optional
//! sign followed by digits, nothing else.

use crate::config::error::{ConfigError, Result};

/// Parse an `int`-sized integer
///
/// Values outside the `i32` range fail with `OutOfRange`; negative values
/// fail with `Negative` when `non_negative` is set.
pub fn parse_int(value: &str, non_negative: bool) -> Result<i32> {
    let lval = parse_long(value, non_negative)?;
    i32::try_from(lval).map_err(|_| ConfigError::OutOfRange(value.to_string()))
}

/// Parse a `long`-sized integer
pub fn parse_long(value: &str, non_negative: bool) -> Result<i64> {
    if value.is_empty() || !is_decimal(value) {
        return Err(ConfigError::NotANumber(value.to_string()));
    }

    let lval = value
        .parse::<i64>()
        .map_err(|_| ConfigError::OutOfRange(value.to_string()))?;

    if non_negative && lval < 0 {
        return Err(ConfigError::Negative(value.to_string()));
    }

    Ok(lval)
}

/// Parse a non-negative integer into an unsigned 32-bit value
pub fn parse_u32(value: &str) -> Result<u32> {
    let v = parse_int(value, true)?;
    u32::try_from(v).map_err(|_| ConfigError::OutOfRange(value.to_string()))
}

/// Parse a non-negative number of seconds, fractions allowed
pub fn parse_seconds(value: &str) -> Result<f64> {
    let secs = value
        .trim()
        .parse::<f64>()
        .map_err(|_| ConfigError::NotANumber(value.to_string()))?;

    if !secs.is_finite() {
        return Err(ConfigError::OutOfRange(value.to_string()));
    }
    if secs < 0.0 {
        return Err(ConfigError::Negative(value.to_string()));
    }

    Ok(secs)
}

/// Parse a boolean
///
/// Accepts `on/yes/y/true/t/1` and `off/no/n/false/f/0`, case-insensitively.
pub fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "yes" | "y" | "true" | "t" | "1" => Ok(true),
        "off" | "no" | "n" | "false" | "f" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidBool(value.to_string())),
    }
}

/// Render a boolean the way the configuration file spells it
pub fn bool_str(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn is_decimal(value: &str) -> bool {
    let digits = value
        .strip_prefix('-')
        .or_else(|| value.strip_prefix('+'))
        .unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("100", false).unwrap(), 100);
        assert_eq!(parse_int("-5", false).unwrap(), -5);
        assert_eq!(parse_int("+7", true).unwrap(), 7);

        assert!(matches!(parse_int("", false), Err(ConfigError::NotANumber(_))));
        assert!(matches!(parse_int("12abc", false), Err(ConfigError::NotANumber(_))));
        assert!(matches!(parse_int(" 12", false), Err(ConfigError::NotANumber(_))));
        assert!(matches!(parse_int("-1", true), Err(ConfigError::Negative(_))));
        assert!(matches!(parse_int("2147483648", false), Err(ConfigError::OutOfRange(_))));
        assert_eq!(parse_int("-2147483648", false).unwrap(), i32::MIN);
    }

    #[test]
    fn test_parse_long() {
        assert_eq!(parse_long("4294967296", true).unwrap(), 4_294_967_296);
        assert!(matches!(
            parse_long("99999999999999999999", false),
            Err(ConfigError::OutOfRange(_))
        ));
        assert!(matches!(parse_long("-", false), Err(ConfigError::NotANumber(_))));
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("4").unwrap(), 4.0);
        assert_eq!(parse_seconds("0.25").unwrap(), 0.25);
        assert!(matches!(parse_seconds("-1.0"), Err(ConfigError::Negative(_))));
        assert!(matches!(parse_seconds("soon"), Err(ConfigError::NotANumber(_))));
        assert!(matches!(parse_seconds("inf"), Err(ConfigError::OutOfRange(_))));
    }

    #[test]
    fn test_parse_bool() {
        for v in ["on", "ON", "yes", "y", "true", "T", "1"] {
            assert!(parse_bool(v).unwrap(), "{} should be true", v);
        }
        for v in ["off", "No", "n", "false", "f", "0"] {
            assert!(!parse_bool(v).unwrap(), "{} should be false", v);
        }
        assert!(matches!(parse_bool("maybe"), Err(ConfigError::InvalidBool(_))));
    }
}
