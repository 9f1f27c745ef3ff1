// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cycle units and time offsets: the temporal granularity a task partitions
//! data by, and the signed offset applied to wall-clock before a normal-mode
//! scan.

use crate::error::CollectError;
use chrono::{DateTime, Datelike, Duration, FixedOffset, TimeZone, Timelike, Utc};

/// Temporal granularity a task partitions data by. Both the scan-window
/// step and the data-time format string follow from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleUnit {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    TenMinute,
}

impl CycleUnit {
    pub fn parse(s: &str) -> Result<Self, CollectError> {
        Ok(match s {
            "Y" => CycleUnit::Year,
            "M" => CycleUnit::Month,
            "D" => CycleUnit::Day,
            "h" => CycleUnit::Hour,
            "m" => CycleUnit::Minute,
            "10m" => CycleUnit::TenMinute,
            other => {
                return Err(CollectError::InvalidPattern {
                    pattern: other.to_string(),
                    reason: "unknown cycle unit".to_string(),
                })
            }
        })
    }

    /// The format used to render a data-time string under this cycle unit,
    /// e.g. `h -> yyyyMMddHH`.
    pub fn data_time_format(self) -> &'static str {
        match self {
            CycleUnit::Year => "%Y",
            CycleUnit::Month => "%Y%m",
            CycleUnit::Day => "%Y%m%d",
            CycleUnit::Hour => "%Y%m%d%H",
            CycleUnit::Minute | CycleUnit::TenMinute => "%Y%m%d%H%M",
        }
    }

    /// Quantise a timestamp down to the start of its cycle boundary, under
    /// `tz`'s local calendar (e.g. a day boundary is local midnight, not UTC
    /// midnight).
    // Every constructed (year, month, day, hour, minute) tuple below is
    // derived from fields of an existing valid local `DateTime`, and
    // `FixedOffset` never has a DST gap or fold, so the fallible chrono
    // constructors here can never actually fail.
    #[allow(clippy::expect_used)]
    pub fn floor(self, t: DateTime<Utc>, tz: FixedOffset) -> DateTime<Utc> {
        let local = t.with_timezone(&tz);
        let floored = match self {
            CycleUnit::Year => tz
                .with_ymd_and_hms(local.year(), 1, 1, 0, 0, 0)
                .single()
                .expect("year floor of a valid date is always valid"),
            CycleUnit::Month => tz
                .with_ymd_and_hms(local.year(), local.month(), 1, 0, 0, 0)
                .single()
                .expect("month floor of a valid date is always valid"),
            CycleUnit::Day => local
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .expect("midnight is always a valid time")
                .and_local_timezone(tz)
                .single()
                .expect("midnight under a fixed offset is always unambiguous"),
            CycleUnit::Hour => local
                .date_naive()
                .and_hms_opt(local.hour(), 0, 0)
                .expect("an existing hour-of-day is always valid")
                .and_local_timezone(tz)
                .single()
                .expect("an existing hour under a fixed offset is always unambiguous"),
            CycleUnit::Minute => local
                .date_naive()
                .and_hms_opt(local.hour(), local.minute(), 0)
                .expect("an existing hour/minute is always valid")
                .and_local_timezone(tz)
                .single()
                .expect("an existing hour/minute under a fixed offset is always unambiguous"),
            CycleUnit::TenMinute => local
                .date_naive()
                .and_hms_opt(local.hour(), (local.minute() / 10) * 10, 0)
                .expect("an existing hour and a ten-minute floor are always valid")
                .and_local_timezone(tz)
                .single()
                .expect("a ten-minute floor under a fixed offset is always unambiguous"),
        };
        floored.with_timezone(&Utc)
    }

    /// Step to the next cycle boundary after `t` (`t` assumed already
    /// floored), under `tz`'s local calendar.
    #[allow(clippy::expect_used)]
    pub fn step(self, t: DateTime<Utc>, tz: FixedOffset) -> DateTime<Utc> {
        let local = t.with_timezone(&tz);
        let stepped = match self {
            CycleUnit::Year => tz
                .with_ymd_and_hms(local.year() + 1, 1, 1, 0, 0, 0)
                .single()
                .expect("next year is always a valid date"),
            CycleUnit::Month => {
                let (y, m) = if local.month() == 12 {
                    (local.year() + 1, 1)
                } else {
                    (local.year(), local.month() + 1)
                };
                tz.with_ymd_and_hms(y, m, 1, 0, 0, 0)
                    .single()
                    .expect("next month is always a valid date")
            }
            CycleUnit::Day => local + Duration::days(1),
            CycleUnit::Hour => local + Duration::hours(1),
            CycleUnit::Minute => local + Duration::minutes(1),
            CycleUnit::TenMinute => local + Duration::minutes(10),
        };
        stepped.with_timezone(&Utc)
    }
}

/// A signed offset expressed in cycle units, e.g. `-1h`, `+2D`.
///
/// Applied to wall-clock before scans in normal mode; never applied in
/// retry mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOffset {
    pub signed_count: i64,
    pub unit: CycleUnit,
}

impl TimeOffset {
    pub const ZERO: TimeOffset = TimeOffset {
        signed_count: 0,
        unit: CycleUnit::Hour,
    };

    /// Parse `[+-]?<n><unit>`, e.g. `-1h`, `+2D`, `3m`.
    pub fn parse(expression: &str) -> Result<Self, CollectError> {
        let expr = expression.trim();
        if expr.is_empty() {
            return Err(CollectError::InvalidPattern {
                pattern: expression.to_string(),
                reason: "empty time offset expression".to_string(),
            });
        }
        let (sign, rest) = match expr.as_bytes()[0] {
            b'-' => (-1i64, &expr[1..]),
            b'+' => (1i64, &expr[1..]),
            _ => (1i64, expr),
        };
        let split_at = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| CollectError::InvalidPattern {
                pattern: expression.to_string(),
                reason: "missing cycle unit suffix".to_string(),
            })?;
        let (num_str, unit_str) = rest.split_at(split_at);
        let magnitude: i64 = num_str.parse().map_err(|_| CollectError::InvalidPattern {
            pattern: expression.to_string(),
            reason: "invalid numeric offset".to_string(),
        })?;
        let unit = CycleUnit::parse(unit_str)?;
        Ok(TimeOffset {
            signed_count: sign * magnitude,
            unit,
        })
    }

    /// Offset in milliseconds.
    ///
    /// Months and years are not a fixed duration, so this approximates
    /// them (30 days, 365 days) rather than walking the calendar. The
    /// offset is purely additive and never crosses a calendar boundary.
    pub fn as_millis(self) -> i64 {
        let unit_ms: i64 = match self.unit {
            CycleUnit::Year => 365 * 24 * 3_600_000,
            CycleUnit::Month => 30 * 24 * 3_600_000,
            CycleUnit::Day => 24 * 3_600_000,
            CycleUnit::Hour => 3_600_000,
            CycleUnit::Minute => 60_000,
            CycleUnit::TenMinute => 600_000,
        };
        self.signed_count * unit_ms
    }
}

#[cfg(test)]
#[path = "cycle_tests.rs"]
mod tests;
