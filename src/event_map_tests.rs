// SPDX-License-Identifier: MIT OR Apache-2.0

use super::*;
use crate::collaborators::fake::FakeInstanceManager;
use crate::cycle::CycleUnit;
use chrono::TimeZone;
use std::path::PathBuf;

fn hour(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

#[tokio::test]
async fn offer_rejects_duplicate_path_for_same_data_time() {
    let mut map = EventMap::new();
    let manager = FakeInstanceManager::new();
    let path = PathBuf::from("/d/2024010100/a.log");
    assert!(
        map.offer(
            path.clone(),
            "2024010100".to_string(),
            SystemTime::UNIX_EPOCH,
            0,
            &manager,
        )
        .await
    );
    assert!(
        !map.offer(
            path,
            "2024010100".to_string(),
            SystemTime::UNIX_EPOCH,
            1,
            &manager,
        )
        .await
    );
    assert_eq!(map.entry_count(), 1);
}

#[tokio::test]
async fn offer_honors_should_add_again_veto() {
    let mut map = EventMap::new();
    let manager = FakeInstanceManager::new();
    let path = PathBuf::from("/d/2024010100/a.log");
    manager.deny_add_again(&path);
    assert!(
        !map.offer(
            path,
            "2024010100".to_string(),
            SystemTime::UNIX_EPOCH,
            0,
            &manager,
        )
        .await
    );
    assert_eq!(map.entry_count(), 0);
}

#[tokio::test]
async fn release_due_skips_buckets_not_yet_due() {
    let mut map = EventMap::new();
    let manager = FakeInstanceManager::new();
    map.offer(
        PathBuf::from("/d/a.log"),
        "2024010100".to_string(),
        SystemTime::UNIX_EPOCH,
        0,
        &manager,
    )
    .await;
    let not_yet_due = hour(2024, 1, 1, 0);
    map.release_due(
        not_yet_due,
        CycleUnit::Hour,
        TimeOffset::ZERO,
        &manager,
        TokioDuration::from_millis(1),
        utc(),
    )
    .await;
    assert_eq!(manager.submitted_count(), 0);
    assert_eq!(map.entry_count(), 1);
}

#[tokio::test]
async fn release_due_submits_bucket_once_cycle_end_reached() {
    let mut map = EventMap::new();
    let manager = FakeInstanceManager::new();
    map.offer(
        PathBuf::from("/d/a.log"),
        "2024010100".to_string(),
        SystemTime::UNIX_EPOCH,
        0,
        &manager,
    )
    .await;
    let due = hour(2024, 1, 1, 1);
    map.release_due(
        due,
        CycleUnit::Hour,
        TimeOffset::ZERO,
        &manager,
        TokioDuration::from_millis(1),
        utc(),
    )
    .await;
    assert_eq!(manager.submitted_count(), 1);
    assert_eq!(map.entry_count(), 0);
    assert_eq!(map.bucket_count(), 0);
}

#[tokio::test]
async fn release_due_submits_entries_in_created_at_order() {
    let mut map = EventMap::new();
    let manager = FakeInstanceManager::new();
    map.offer(
        PathBuf::from("/d/b.log"),
        "2024010100".to_string(),
        SystemTime::UNIX_EPOCH,
        20,
        &manager,
    )
    .await;
    map.offer(
        PathBuf::from("/d/a.log"),
        "2024010100".to_string(),
        SystemTime::UNIX_EPOCH,
        10,
        &manager,
    )
    .await;
    let due = hour(2024, 1, 1, 1);
    map.release_due(
        due,
        CycleUnit::Hour,
        TimeOffset::ZERO,
        &manager,
        TokioDuration::from_millis(1),
        utc(),
    )
    .await;
    let submitted = manager.submitted();
    assert_eq!(submitted.len(), 2);
    let InstanceAction::Add(first) = &submitted[0];
    let InstanceAction::Add(second) = &submitted[1];
    assert_eq!(first.file_path, PathBuf::from("/d/a.log"));
    assert_eq!(second.file_path, PathBuf::from("/d/b.log"));
}

#[tokio::test]
async fn release_due_retries_same_entry_on_queue_full_without_dropping_it() {
    let mut map = EventMap::new();
    let manager = FakeInstanceManager::new();
    manager.reject_first_submits(2);
    map.offer(
        PathBuf::from("/d/a.log"),
        "2024010100".to_string(),
        SystemTime::UNIX_EPOCH,
        0,
        &manager,
    )
    .await;
    let due = hour(2024, 1, 1, 1);
    map.release_due(
        due,
        CycleUnit::Hour,
        TimeOffset::ZERO,
        &manager,
        TokioDuration::from_millis(1),
        utc(),
    )
    .await;
    assert_eq!(manager.submitted_count(), 1);
    assert_eq!(map.entry_count(), 0);
}

#[test]
fn age_out_drops_buckets_outside_horizon() {
    let mut map = EventMap::new();
    let manager = FakeInstanceManager::new();
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(map.offer(
        PathBuf::from("/d/a.log"),
        "2024010100".to_string(),
        SystemTime::UNIX_EPOCH,
        0,
        &manager,
    ));
    let now = hour(2024, 1, 10, 0);
    map.age_out(now, CycleUnit::Hour, Duration::days(2), utc());
    assert_eq!(map.bucket_count(), 0);
}

#[test]
fn age_out_keeps_buckets_within_horizon() {
    let mut map = EventMap::new();
    let manager = FakeInstanceManager::new();
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(map.offer(
        PathBuf::from("/d/a.log"),
        "2024010100".to_string(),
        SystemTime::UNIX_EPOCH,
        0,
        &manager,
    ));
    let now = hour(2024, 1, 1, 5);
    map.age_out(now, CycleUnit::Hour, Duration::days(2), utc());
    assert_eq!(map.bucket_count(), 1);
}
