//! Time-of-day, sun-relative and calendar literals

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::duration::{format_signed_hms, parse_duration};
use crate::error::LiteralError;

static CLOCK_RE: OnceLock<Regex> = OnceLock::new();
static SUN_RE: OnceLock<Regex> = OnceLock::new();
static MONTH_DAY_RE: OnceLock<Regex> = OnceLock::new();

fn clock_re() -> &'static Regex {
    CLOCK_RE.get_or_init(|| {
        Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?$").expect("clock pattern is valid")
    })
}

fn sun_re() -> &'static Regex {
    SUN_RE.get_or_init(|| {
        Regex::new(r"^(sunrise|sunset)(?:\s*([+-])\s*(\S+))?$").expect("sun pattern is valid")
    })
}

fn month_day_re() -> &'static Regex {
    MONTH_DAY_RE
        .get_or_init(|| Regex::new(r"^(\d{1,2})-(\d{1,2})$").expect("month-day pattern is valid"))
}

/// Sun event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SunEvent {
    Sunrise,
    Sunset,
}

impl SunEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SunEvent::Sunrise => "sunrise",
            SunEvent::Sunset => "sunset",
        }
    }
}

/// A point in the day: a wall-clock time or an offset from a sun event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeSpec {
    Clock(NaiveTime),
    Sun { event: SunEvent, offset_secs: i64 },
}

/// Parse `HH:MM` or `HH:MM:SS`.
pub fn parse_clock(literal: &str) -> Result<NaiveTime, LiteralError> {
    let err = || LiteralError::Time(literal.to_string());
    let caps = clock_re().captures(literal.trim()).ok_or_else(err)?;
    let hour: u32 = caps[1].parse().map_err(|_| err())?;
    let minute: u32 = caps[2].parse().map_err(|_| err())?;
    let second: u32 = match caps.get(3) {
        Some(s) => s.as_str().parse().map_err(|_| err())?,
        None => 0,
    };
    NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(err)
}

impl FromStr for TimeSpec {
    type Err = LiteralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(caps) = sun_re().captures(trimmed) {
            let event = if &caps[1] == "sunrise" {
                SunEvent::Sunrise
            } else {
                SunEvent::Sunset
            };
            let offset_secs = match (caps.get(2), caps.get(3)) {
                (Some(sign), Some(amount)) => {
                    let secs = parse_duration(amount.as_str())
                        .map_err(|_| LiteralError::Time(s.to_string()))?
                        .as_secs();
                    let secs =
                        i64::try_from(secs).map_err(|_| LiteralError::Time(s.to_string()))?;
                    if sign.as_str() == "-" {
                        -secs
                    } else {
                        secs
                    }
                }
                _ => 0,
            };
            return Ok(TimeSpec::Sun { event, offset_secs });
        }
        parse_clock(trimmed).map(TimeSpec::Clock)
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeSpec::Clock(t) => write!(f, "{}", t.format("%H:%M:%S")),
            TimeSpec::Sun {
                event,
                offset_secs: 0,
            } => f.write_str(event.as_str()),
            TimeSpec::Sun { event, offset_secs } => {
                let sign = if *offset_secs < 0 { "" } else { "+" };
                write!(
                    f,
                    "{}{}{}",
                    event.as_str(),
                    sign,
                    format_signed_hms(*offset_secs)
                )
            }
        }
    }
}

/// Day of week, rendered the way the platform's time condition expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    pub const WORKWEEK: [Weekday; 5] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ];
    pub const WEEKEND: [Weekday; 2] = [Weekday::Sat, Weekday::Sun];
    pub const ALL: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Mon => "mon",
            Weekday::Tue => "tue",
            Weekday::Wed => "wed",
            Weekday::Thu => "thu",
            Weekday::Fri => "fri",
            Weekday::Sat => "sat",
            Weekday::Sun => "sun",
        }
    }
}

/// A recurring calendar day (`MM-DD`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

impl MonthDay {
    /// `month * 100 + day`, comparable across a year
    pub fn ordinal(&self) -> u32 {
        self.month * 100 + self.day
    }
}

impl FromStr for MonthDay {
    type Err = LiteralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || LiteralError::Date(s.to_string());
        let caps = month_day_re().captures(s.trim()).ok_or_else(err)?;
        let month: u32 = caps[1].parse().map_err(|_| err())?;
        let day: u32 = caps[2].parse().map_err(|_| err())?;
        // leap year so that 02-29 is accepted
        NaiveDate::from_ymd_opt(2000, month, day).ok_or_else(err)?;
        Ok(MonthDay { month, day })
    }
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

/// Parse an absolute `YYYY-MM-DD` date.
pub fn parse_date(literal: &str) -> Result<NaiveDate, LiteralError> {
    NaiveDate::parse_from_str(literal.trim(), "%Y-%m-%d")
        .map_err(|_| LiteralError::Date(literal.to_string()))
}
