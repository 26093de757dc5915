//! Human-readable durations ("5s", "30m", "2h", "1d") for config values
//! such as the notification dismiss delay and the optional API timeout.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{de, Deserialize, Deserializer};

const UNITS: [(char, u64); 4] = [('d', 24 * 60 * 60), ('h', 60 * 60), ('m', 60), ('s', 1)];

/// Parse a duration string with a single `d`, `h`, `m` or `s` suffix.
///
/// The input is case-insensitive and whitespace is trimmed.
///
/// ```
/// use painel::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
/// assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(2 * 60 * 60));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    let unit = s.chars().last().context("Duration is empty")?;
    let (_, multiplier) = UNITS
        .iter()
        .find(|(suffix, _)| *suffix == unit)
        .with_context(|| format!("Duration must end with d, h, m, or s: {s:?}"))?;

    let number: u64 = s[..s.len() - unit.len_utf8()]
        .trim()
        .parse()
        .with_context(|| format!("Invalid number in duration: {s:?}"))?;
    let secs = number
        .checked_mul(*multiplier)
        .context("Duration is too large")?;

    Ok(Duration::from_secs(secs))
}

/// Format a duration with the largest unit that divides it evenly.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs == 0 {
        return "0s".to_string();
    }
    UNITS
        .iter()
        .find(|(_, multiplier)| secs % multiplier == 0)
        .map(|(suffix, multiplier)| format!("{}{suffix}", secs / multiplier))
        .unwrap_or_else(|| format!("{secs}s"))
}

/// Serde helper for `Duration` fields written as strings.
pub fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(de::Error::custom)
}

/// Serde helper for optional `Duration` fields written as strings.
pub fn deserialize_optional_duration<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|s| parse_duration(&s).map_err(de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_unit() {
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86_400));
        assert_eq!(parse_duration("3h").unwrap(), Duration::from_secs(10_800));
        assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(1_800));
        assert_eq!(parse_duration(" 5S ").unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("5").is_err());
        assert!(parse_duration("5w").is_err());
        assert!(parse_duration("xs").is_err());
        assert!(parse_duration("-5s").is_err());
        assert!(parse_duration("99999999999999999999d").is_err());
    }

    #[test]
    fn formats_with_largest_even_unit() {
        assert_eq!(format_duration(Duration::from_secs(5)), "5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "90s");
        assert_eq!(format_duration(Duration::from_secs(120)), "2m");
        assert_eq!(format_duration(Duration::from_secs(86_400)), "1d");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }
}
