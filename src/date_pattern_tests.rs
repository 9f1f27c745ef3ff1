// SPDX-License-Identifier: MIT OR Apache-2.0

use super::*;
use crate::cycle::CycleUnit;
use chrono::TimeZone;
use std::path::Path;

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

#[test]
fn render_substitutes_all_tokens() {
    let t = Utc.with_ymd_and_hms(2024, 6, 1, 12, 34, 0).unwrap();
    let rendered = render("/var/log/app/YYYY/MM/DD/hh/app.log", t, CycleUnit::Hour, utc());
    assert_eq!(rendered, "/var/log/app/2024/06/01/12/app.log");
}

#[test]
fn render_passes_unknown_tokens_through() {
    let t = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let rendered = render("/d/YYYY-ZZZ.log", t, CycleUnit::Hour, utc());
    assert_eq!(rendered, "/d/2024-ZZZ.log");
}

#[test]
fn validate_rejects_two_digit_year() {
    assert!(validate("/d/YY/MM/app.log").is_err());
}

#[test]
fn validate_accepts_four_digit_year() {
    assert!(validate("/d/YYYY/MM/app.log").is_ok());
}

#[test]
fn validate_accepts_pattern_without_year() {
    assert!(validate("/d/MM-DD.log").is_ok());
}

#[test]
fn extract_data_time_matches_spec_example() {
    let path = Path::new("/d/2024-01-02_05.log");
    let extracted = extract_data_time(path, "/d/YYYY-MM-DD_hh.log");
    assert_eq!(extracted, "2024010205");
}

#[test]
fn extract_data_time_empty_when_no_token() {
    let path = Path::new("/d/app.log");
    let extracted = extract_data_time(path, "/d/app.log");
    assert_eq!(extracted, "");
}

#[test]
fn has_date_token_detects_presence() {
    assert!(has_date_token("/d/YYYYMMDDhh.log"));
    assert!(!has_date_token("/d/app.log"));
}

#[test]
fn round_trip_render_then_extract_is_digits_only_quantised_value() {
    for (t, cycle) in [
        (
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 34, 56).unwrap(),
            CycleUnit::Hour,
        ),
        (
            Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap(),
            CycleUnit::Day,
        ),
        (
            Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap(),
            CycleUnit::Minute,
        ),
    ] {
        let pattern = "/d/YYYY-MM-DD_hh-mm.log";
        let rendered = render(pattern, t, cycle, utc());
        let file_name = rendered.rsplit('/').next().unwrap();
        let path = Path::new("/tmp").join(file_name);
        let extracted = extract_data_time(&path, pattern);
        let floored = cycle.floor(t, utc());
        let expected = floored.format("%Y%m%d%H%M").to_string();
        assert_eq!(extracted, expected);
    }
}

#[test]
fn date_region_enumerates_ascending_hours() {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 30, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 1, 1, 2, 10, 0).unwrap();
    let region = date_region(start, end, CycleUnit::Hour, utc());
    assert_eq!(
        region,
        vec![
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap(),
        ]
    );
}

#[test]
fn date_region_single_point_when_start_equals_end() {
    let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(date_region(t, t, CycleUnit::Hour, utc()), vec![t]);
}

#[test]
fn should_start_time_is_end_of_cycle_plus_offset() {
    let offset = TimeOffset::parse("0h").unwrap();
    let t = should_start_time("2024060112", CycleUnit::Hour, offset, utc()).unwrap();
    assert_eq!(t, Utc.with_ymd_and_hms(2024, 6, 1, 13, 0, 0).unwrap());
}

#[test]
fn should_start_time_applies_negative_offset() {
    let offset = TimeOffset::parse("-1h").unwrap();
    let t = should_start_time("2024060112", CycleUnit::Hour, offset, utc()).unwrap();
    assert_eq!(t, Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
}

#[test]
fn should_start_time_is_epoch_for_a_tokenless_file() {
    let offset = TimeOffset::parse("0h").unwrap();
    let t = should_start_time("", CycleUnit::Hour, offset, utc()).unwrap();
    assert_eq!(t, DateTime::<Utc>::MIN_UTC);
}

#[test]
fn is_valid_creation_time_window_accepts_recent() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    assert!(is_valid_creation_time_window(
        "2024060112",
        CycleUnit::Hour,
        now,
        Duration::days(2)
    ));
}

#[test]
fn is_valid_creation_time_window_rejects_stale() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    assert!(!is_valid_creation_time_window(
        "2019010100",
        CycleUnit::Hour,
        now,
        Duration::days(2)
    ));
}
