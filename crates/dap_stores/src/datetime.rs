use std::{fmt::Display, str::FromStr};

use jiff::{Timestamp, civil::DateTime, tz::TimeZone};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateTimeFilterError {
    #[error("Invalid timestamp {0}")]
    Timestamp(String),

    #[error("Invalid start timestamp {0}")]
    Start(String),

    #[error("Invalid stop timestamp {0}")]
    Stop(String),

    #[error("Invalid interval {0}, expected a single '/'")]
    Interval(String),
}

/// Either an exact instant or an interval with optional, inclusive bounds.
///
/// Parsed from `2018-02-12T23:20:50Z`, `2018-02-12T00:00:00Z/2018-03-18T12:31:12Z`,
/// `2018-02-12T00:00:00Z/..` or `/2018-03-18T12:31:12Z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimeFilter {
    Instant(Timestamp),
    Interval {
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    },
}

impl DateTimeFilter {
    pub fn matches(&self, timestamp: Timestamp) -> bool {
        match self {
            DateTimeFilter::Instant(instant) => timestamp == *instant,
            DateTimeFilter::Interval { start, end } => {
                start.is_none_or(|start| timestamp >= start)
                    && end.is_none_or(|end| timestamp <= end)
            }
        }
    }
}

fn parse_timestamp(value: &str) -> Option<Timestamp> {
    if let Ok(timestamp) = value.parse::<Timestamp>() {
        return Some(timestamp);
    }

    // Timestamps without offset are read as UTC.
    value
        .parse::<DateTime>()
        .ok()
        .and_then(|datetime| datetime.to_zoned(TimeZone::UTC).ok())
        .map(|zoned| zoned.timestamp())
}

fn parse_bound(
    value: &str,
    error: fn(String) -> DateTimeFilterError,
) -> Result<Option<Timestamp>, DateTimeFilterError> {
    match value {
        "" | ".." => Ok(None),
        value => parse_timestamp(value)
            .map(Some)
            .ok_or_else(|| error(value.to_owned())),
    }
}

impl FromStr for DateTimeFilter {
    type Err = DateTimeFilterError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = value.split('/').collect();

        match parts.as_slice() {
            [instant] => parse_timestamp(instant)
                .map(DateTimeFilter::Instant)
                .ok_or_else(|| DateTimeFilterError::Timestamp(value.to_owned())),
            [start, end] => Ok(DateTimeFilter::Interval {
                start: parse_bound(start, DateTimeFilterError::Start)?,
                end: parse_bound(end, DateTimeFilterError::Stop)?,
            }),
            _ => Err(DateTimeFilterError::Interval(value.to_owned())),
        }
    }
}

impl Display for DateTimeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateTimeFilter::Instant(instant) => write!(f, "{}", instant),
            DateTimeFilter::Interval { start, end } => {
                match start {
                    Some(start) => write!(f, "{}/", start)?,
                    None => write!(f, "../")?,
                }
                match end {
                    Some(end) => write!(f, "{}", end),
                    None => write!(f, ".."),
                }
            }
        }
    }
}
