// SPDX-License-Identifier: MIT OR Apache-2.0

//! Centralized environment variable access for this crate's tunables.

use chrono::FixedOffset;
use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

fn parse_u32(var: &str) -> Option<u32> {
    std::env::var(var).ok().and_then(|s| s.parse::<u32>().ok())
}

fn parse_i64(var: &str) -> Option<i64> {
    std::env::var(var).ok().and_then(|s| s.parse::<i64>().ok())
}

/// Interval between directory scans in a task's core loop (default: 60s).
pub fn scan_interval() -> Duration {
    parse_duration_ms("LOGCOLLECT_SCAN_INTERVAL_MS").unwrap_or(Duration::from_secs(60))
}

/// Sleep between core-loop ticks (default: 1s).
pub fn core_thread_sleep_time() -> Duration {
    parse_duration_ms("LOGCOLLECT_CORE_THREAD_SLEEP_MS").unwrap_or(Duration::from_secs(1))
}

/// Maximum allowed gap between consecutive core-loop ticks before the task is
/// considered stalled and fails (default: 60s).
pub fn core_thread_max_gap_time() -> Duration {
    parse_duration_ms("LOGCOLLECT_CORE_THREAD_MAX_GAP_MS").unwrap_or(Duration::from_secs(60))
}

/// Maximum directory depth walked below a pattern's static root (default: 3).
pub fn scan_depth_bound() -> u32 {
    parse_u32("LOGCOLLECT_SCAN_DEPTH_BOUND").unwrap_or(3)
}

/// Horizon for `EventMap::age_out` in normal mode, in milliseconds
/// (default: 2 days).
pub fn age_out_horizon_millis() -> i64 {
    parse_i64("LOGCOLLECT_AGE_OUT_HORIZON_MS").unwrap_or(2 * 24 * 60 * 60 * 1000)
}

/// Window for `is_valid_creation_time_window`, in milliseconds
/// (default: 2 days).
pub fn creation_time_window_millis() -> i64 {
    parse_i64("LOGCOLLECT_CREATION_TIME_WINDOW_MS").unwrap_or(2 * 24 * 60 * 60 * 1000)
}

/// Time zone date tokens are rendered and read back under (default: UTC+8,
/// the domain-convention default per the date-pattern grammar).
// The fallback is a fixed literal number of seconds well within
// `FixedOffset`'s +-24h range, so it can never actually fail to construct.
#[allow(clippy::expect_used)]
pub fn data_time_zone_offset() -> FixedOffset {
    parse_i64("LOGCOLLECT_DATA_TZ_OFFSET_HOURS")
        .and_then(|hours| FixedOffset::east_opt((hours * 3600) as i32))
        .unwrap_or_else(|| FixedOffset::east_opt(8 * 3600).expect("UTC+8 is a valid fixed offset"))
}
