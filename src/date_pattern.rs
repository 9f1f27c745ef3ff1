// SPDX-License-Identifier: MIT OR Apache-2.0

//! Expands and reads back date tokens (`YYYY`, `MM`, `DD`, `hh`, `mm`) embedded
//! in an origin pattern, and derives the wall-clock release moment for a
//! given data time.

use crate::cycle::{CycleUnit, TimeOffset};
use crate::error::CollectError;
use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone, Utc};
use std::path::Path;

/// Recognised date tokens, longest-first so a greedy left-to-right scan
/// never mistakes part of `YYYY` for anything else. Two-digit years are
/// deliberately absent — `validate` rejects a bare `YY`.
const TOKENS: &[(&str, TokenKind)] = &[
    ("YYYY", TokenKind::Year),
    ("MM", TokenKind::Month),
    ("DD", TokenKind::Day),
    ("hh", TokenKind::Hour),
    ("mm", TokenKind::Minute),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Year,
    Month,
    Day,
    Hour,
    Minute,
}

/// A located token occurrence within a pattern string, in char offsets.
#[derive(Debug, Clone, Copy)]
struct TokenSpan {
    start: usize,
    end: usize,
    kind: TokenKind,
}

/// Reject patterns with a bare two-digit-year token (`YY` not part of `YYYY`).
/// Unknown tokens are not rejected — they pass through `render` verbatim.
pub fn validate(pattern: &str) -> Result<(), CollectError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == 'Y' {
            let run_start = i;
            let mut run_end = i;
            while run_end < chars.len() && chars[run_end] == 'Y' {
                run_end += 1;
            }
            let run_len = run_end - run_start;
            if run_len != 4 {
                return Err(CollectError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: format!("two-digit or irregular year token ({run_len} Y's) is not supported"),
                });
            }
            i = run_end;
        } else {
            i += 1;
        }
    }
    Ok(())
}

/// Substitute every date token in `pattern` with its formatted value under
/// the given cycle's quantisation of `t`, read back under `tz`.
pub fn render(pattern: &str, t: DateTime<Utc>, cycle_unit: CycleUnit, tz: FixedOffset) -> String {
    let floored = cycle_unit.floor(t, tz).with_timezone(&tz);
    let mut out = String::with_capacity(pattern.len());
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if let Some((token, kind, len)) = match_token_at(&chars, i) {
            out.push_str(&formatted_value(kind, floored));
            let _ = token;
            i += len;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

fn formatted_value<Tz: chrono::TimeZone>(kind: TokenKind, t: DateTime<Tz>) -> String {
    use chrono::{Datelike, Timelike};
    match kind {
        TokenKind::Year => format!("{:04}", t.year()),
        TokenKind::Month => format!("{:02}", t.month()),
        TokenKind::Day => format!("{:02}", t.day()),
        TokenKind::Hour => format!("{:02}", t.hour()),
        TokenKind::Minute => format!("{:02}", t.minute()),
    }
}

fn match_token_at(chars: &[char], i: usize) -> Option<(&'static str, TokenKind, usize)> {
    for (token, kind) in TOKENS {
        let token_chars: Vec<char> = token.chars().collect();
        let len = token_chars.len();
        if i + len <= chars.len() && chars[i..i + len] == token_chars[..] {
            return Some((token, *kind, len));
        }
    }
    None
}

/// Locate every token occurrence within a single path segment (no `/`),
/// merged into runs wherever two tokens are separated only by literal
/// (non-`/`) characters. Returns the run with the greatest span.
fn longest_date_region(segment: &str) -> Option<(usize, usize)> {
    let chars: Vec<char> = segment.chars().collect();
    let mut spans = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if let Some((_, kind, len)) = match_token_at(&chars, i) {
            spans.push(TokenSpan {
                start: i,
                end: i + len,
                kind,
            });
            i += len;
        } else {
            i += 1;
        }
    }
    if spans.is_empty() {
        return None;
    }
    // A single segment never contains `/`, so every token found in it
    // belongs to the same run: the span from the first token's start to
    // the last token's end (inclusive of any literal separators between).
    let start = spans.first().map(|s| s.start).unwrap_or(0);
    let end = spans.last().map(|s| s.end).unwrap_or(0);
    Some((start, end))
}

/// Extract the data-time substring from a candidate file path, using the
/// origin pattern's file-name segment to locate the token region, then
/// stripping every non-digit character (e.g. `2024-01-02_05 -> 2024010205`).
/// Returns the empty string if the pattern's file-name segment carries no
/// date token.
pub fn extract_data_time(file_path: &Path, origin_pattern: &str) -> String {
    let segment = origin_pattern.rsplit('/').next().unwrap_or(origin_pattern);
    let Some((start, end)) = longest_date_region(segment) else {
        return String::new();
    };
    let Some(name) = file_path.file_name().map(|n| n.to_string_lossy().to_string()) else {
        return String::new();
    };
    let name_chars: Vec<char> = name.chars().collect();
    if end > name_chars.len() {
        return String::new();
    }
    name_chars[start..end].iter().filter(|c| c.is_ascii_digit()).collect()
}

/// Whether `origin_pattern`'s file-name segment carries a date token at all
/// (`longestDatePattern` non-empty, per `checkFileNameForTime` in §4.F).
pub fn has_date_token(origin_pattern: &str) -> bool {
    let segment = origin_pattern.rsplit('/').next().unwrap_or(origin_pattern);
    longest_date_region(segment).is_some()
}

/// Enumerate every cycle boundary in `[start, end]` inclusive, ascending,
/// under `tz`'s local calendar.
pub fn date_region(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    cycle_unit: CycleUnit,
    tz: FixedOffset,
) -> Vec<DateTime<Utc>> {
    let mut out = Vec::new();
    let mut t = cycle_unit.floor(start, tz);
    let end = cycle_unit.floor(end, tz);
    loop {
        out.push(t);
        if t >= end {
            break;
        }
        t = cycle_unit.step(t, tz);
    }
    out
}

/// Parse a data-time string (formatted per `cycle_unit.data_time_format()`)
/// back into its start-of-cycle instant, read as a local time under `tz`.
pub fn parse_data_time(data_time: &str, cycle_unit: CycleUnit, tz: FixedOffset) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(data_time, cycle_unit.data_time_format())
        .ok()
        .or_else(|| {
            // Formats without a time-of-day component (`%Y`, `%Y%m`, `%Y%m%d`)
            // don't parse via NaiveDateTime; fall back to NaiveDate at midnight.
            chrono::NaiveDate::parse_from_str(data_time, cycle_unit.data_time_format())
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    tz.from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
}

/// The wall-clock moment at which a file carrying `data_time` becomes due
/// for submission: end-of-cycle plus the task's time offset. A file with no
/// date token (`data_time == ""`) carries no cycle to wait for, so it is
/// treated as already due.
pub fn should_start_time(
    data_time: &str,
    cycle_unit: CycleUnit,
    offset: TimeOffset,
    tz: FixedOffset,
) -> Option<DateTime<Utc>> {
    if data_time.is_empty() {
        return Some(DateTime::<Utc>::MIN_UTC);
    }
    let start = parse_data_time(data_time, cycle_unit, tz)?;
    let end = cycle_unit.step(start, tz);
    Some(end + Duration::milliseconds(offset.as_millis()))
}

/// Bounds-check a data time against a fixed `±window` around `now`
/// (default 2 days).
pub fn is_valid_creation_time_window(
    data_time: &str,
    cycle_unit: CycleUnit,
    now: DateTime<Utc>,
    window: Duration,
) -> bool {
    match parse_data_time(data_time, cycle_unit, default_tz()) {
        Some(t) => (now - t).abs() <= window,
        None => false,
    }
}

/// Bounds-check a data time against the current cycle under the task's
/// offset: valid if it falls within the two most recent cycle boundaries
/// from the offset-shifted now, matching the normal-mode scan window
/// (`runForNormal` scans the last 2 cycle units).
pub fn is_valid_creation_time_cycle(
    data_time: &str,
    cycle_unit: CycleUnit,
    now: DateTime<Utc>,
    offset: TimeOffset,
) -> bool {
    let tz = default_tz();
    let Some(t) = parse_data_time(data_time, cycle_unit, tz) else {
        return false;
    };
    let shifted = now + Duration::milliseconds(offset.as_millis());
    let current = cycle_unit.floor(shifted, tz);
    let mut prev = current;
    for _ in 0..2 {
        prev = cycle_unit_step_back(cycle_unit, prev, tz);
    }
    t >= prev && t <= cycle_unit.step(current, tz)
}

/// The crate-wide default date-token time zone (UTC+8), used by the two
/// validity-window checks above, which predate per-call time zone threading
/// and are kept as a pre-flight validation surface independent of a task's
/// configured offset.
fn default_tz() -> FixedOffset {
    crate::env::data_time_zone_offset()
}

// Every constructed (year, month) pair below comes from stepping an
// existing valid local date back by one unit, and `FixedOffset` never has a
// DST gap or fold, so the fallible chrono constructor here can never
// actually fail.
#[allow(clippy::expect_used)]
fn cycle_unit_step_back(cycle_unit: CycleUnit, t: DateTime<Utc>, tz: FixedOffset) -> DateTime<Utc> {
    use chrono::Datelike;
    let local = t.with_timezone(&tz);
    let stepped_back = match cycle_unit {
        CycleUnit::Year => tz
            .with_ymd_and_hms(local.year() - 1, 1, 1, 0, 0, 0)
            .single()
            .expect("previous year is always a valid date"),
        CycleUnit::Month => {
            let (y, m) = if local.month() == 1 {
                (local.year() - 1, 12)
            } else {
                (local.year(), local.month() - 1)
            };
            tz.with_ymd_and_hms(y, m, 1, 0, 0, 0)
                .single()
                .expect("previous month is always a valid date")
        }
        CycleUnit::Day => local - Duration::days(1),
        CycleUnit::Hour => local - Duration::hours(1),
        CycleUnit::Minute => local - Duration::minutes(1),
        CycleUnit::TenMinute => local - Duration::minutes(10),
    };
    stepped_back.with_timezone(&Utc)
}

#[cfg(test)]
#[path = "date_pattern_tests.rs"]
mod tests;
