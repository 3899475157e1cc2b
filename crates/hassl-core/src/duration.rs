//! Duration literals
//!
//! Source durations are `<integer><unit>` with unit one of `ms`, `s`, `m`,
//! `h`, `d`. The target platform only understands whole seconds, so
//! millisecond literals collapse to zero.

use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::LiteralError;

static DURATION_RE: OnceLock<Regex> = OnceLock::new();

fn duration_re() -> &'static Regex {
    DURATION_RE.get_or_init(|| {
        Regex::new(r"^\s*(\d+)\s*(ms|s|m|h|d)\s*$").expect("duration pattern is valid")
    })
}

/// Parse a source duration literal such as `15m` or `2h`.
pub fn parse_duration(literal: &str) -> Result<Duration, LiteralError> {
    let caps = duration_re()
        .captures(literal)
        .ok_or_else(|| LiteralError::Duration(literal.to_string()))?;

    let value: u64 = caps[1]
        .parse()
        .map_err(|_| LiteralError::Duration(literal.to_string()))?;

    let factor = match &caps[2] {
        "ms" => 0,
        "s" => 1,
        "m" => 60,
        "h" => 3_600,
        _ => 86_400,
    };

    value
        .checked_mul(factor)
        .map(Duration::from_secs)
        .ok_or_else(|| LiteralError::Duration(literal.to_string()))
}

/// Render whole seconds as `HH:MM:SS`. Hours are not wrapped at 24.
pub fn format_hms(duration: &Duration) -> String {
    let secs = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

/// Render a signed offset in seconds as `[-]HH:MM:SS`.
pub fn format_signed_hms(secs: i64) -> String {
    let magnitude = format_hms(&Duration::from_secs(secs.unsigned_abs()));
    if secs < 0 {
        format!("-{magnitude}")
    } else {
        magnitude
    }
}

fn parse_hms(s: &str) -> Result<Duration, String> {
    let parts = s
        .split(':')
        .map(|p| p.parse::<u64>().map_err(|_| format!("invalid duration '{s}'")))
        .collect::<Result<Vec<_>, _>>()?;
    match parts.as_slice() {
        [secs] => Ok(Duration::from_secs(*secs)),
        [mins, secs] => Ok(Duration::from_secs(mins * 60 + secs)),
        [hours, mins, secs] => Ok(Duration::from_secs(hours * 3600 + mins * 60 + secs)),
        _ => Err(format!("invalid duration '{s}'")),
    }
}

/// Serde adapter writing a `Duration` as `HH:MM:SS`
pub mod hms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_hms(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::parse_hms(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for optional `HH:MM:SS` durations
pub mod option_hms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_str(&super::format_hms(d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| super::parse_hms(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Serde adapter writing signed seconds as `[-]HH:MM:SS`
pub mod signed_hms_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &i64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_signed_hms(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(&s)),
        };
        let secs = super::parse_hms(body).map_err(serde::de::Error::custom)?.as_secs();
        let secs = i64::try_from(secs).map_err(serde::de::Error::custom)?;
        Ok(if negative { -secs } else { secs })
    }
}
