// SPDX-License-Identifier: MIT OR Apache-2.0

use super::*;
use chrono::TimeZone;
use std::fs;
use tempfile::TempDir;

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"x").unwrap();
}

#[test]
fn scans_files_in_dated_directory() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_string_lossy().to_string();
    touch(&dir.path().join("2024010100").join("a.log"));
    touch(&dir.path().join("2024010101").join("b.log"));

    let pattern = format!("{root}/YYYYMMDDhh/*.log");
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
    let results = scan_between(
        &pattern,
        CycleUnit::Hour,
        TimeOffset::ZERO,
        start,
        end,
        true,
        100,
        DEFAULT_SCAN_DEPTH,
        utc(),
    );
    assert_eq!(results.len(), 2);
    let names: Vec<_> = results
        .iter()
        .map(|f| f.path.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert!(names.contains(&"a.log".to_string()));
    assert!(names.contains(&"b.log".to_string()));
}

#[test]
fn missing_static_root_yields_empty_result_not_error() {
    let pattern = "/definitely/not/a/real/path/YYYYMMDDhh/*.log";
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let results = scan_between(
        pattern,
        CycleUnit::Hour,
        TimeOffset::ZERO,
        start,
        start,
        true,
        100,
        DEFAULT_SCAN_DEPTH,
        utc(),
    );
    assert!(results.is_empty());
}

#[test]
fn caps_result_count_at_max_file_num() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_string_lossy().to_string();
    for i in 0..5 {
        touch(&dir.path().join("2024010100").join(format!("{i}.log")));
    }
    let pattern = format!("{root}/YYYYMMDDhh/*.log");
    let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let results = scan_between(
        &pattern,
        CycleUnit::Hour,
        TimeOffset::ZERO,
        t,
        t,
        true,
        2,
        DEFAULT_SCAN_DEPTH,
        utc(),
    );
    assert_eq!(results.len(), 2);
}

#[test]
fn non_matching_files_are_skipped() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_string_lossy().to_string();
    touch(&dir.path().join("2024010100").join("a.log"));
    touch(&dir.path().join("2024010100").join("a.txt"));
    let pattern = format!("{root}/YYYYMMDDhh/*.log");
    let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let results = scan_between(
        &pattern,
        CycleUnit::Hour,
        TimeOffset::ZERO,
        t,
        t,
        true,
        100,
        DEFAULT_SCAN_DEPTH,
        utc(),
    );
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].path.file_name().unwrap(), "a.log");
}

#[test]
fn results_sorted_by_mtime_ascending() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_string_lossy().to_string();
    let older = dir.path().join("2024010100").join("older.log");
    let newer = dir.path().join("2024010100").join("newer.log");
    touch(&older);
    std::thread::sleep(std::time::Duration::from_millis(20));
    touch(&newer);
    let pattern = format!("{root}/YYYYMMDDhh/*.log");
    let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let results = scan_between(
        &pattern,
        CycleUnit::Hour,
        TimeOffset::ZERO,
        t,
        t,
        true,
        100,
        DEFAULT_SCAN_DEPTH,
        utc(),
    );
    assert_eq!(results[0].path.file_name().unwrap(), "older.log");
    assert_eq!(results[1].path.file_name().unwrap(), "newer.log");
}

#[test]
fn normal_mode_shifts_window_by_negative_offset() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_string_lossy().to_string();
    touch(&dir.path().join("2024010100").join("a.log"));
    let pattern = format!("{root}/YYYYMMDDhh/*.log");
    // wall clock at 01:00, offset -1h means we actually scan hour 00.
    let wall_clock = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
    let offset = TimeOffset::parse("-1h").unwrap();
    let results = scan_between(
        &pattern,
        CycleUnit::Hour,
        offset,
        wall_clock,
        wall_clock,
        false,
        100,
        DEFAULT_SCAN_DEPTH,
        utc(),
    );
    assert_eq!(results.len(), 1);
}
