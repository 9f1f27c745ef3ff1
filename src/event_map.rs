// SPDX-License-Identifier: MIT OR Apache-2.0

//! Two-level `dataTime -> (filePath -> InstanceProfile)` buffer with
//! age-out and time-gated release.

use crate::collaborators::{InstanceAction, InstanceManager};
use crate::cycle::{CycleUnit, TimeOffset};
use crate::date_pattern;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::time::Duration as TokioDuration;

/// Downstream-consumed descriptor of a single file to be ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceProfile {
    pub file_path: PathBuf,
    pub data_time: String,
    pub mtime: SystemTime,
    pub created_at_millis: i64,
}

impl InstanceProfile {
    /// Ordered by `createdAt` ascending, ties broken by `filePath`
    /// lexicographic.
    fn order_key(&self) -> (i64, &Path) {
        (self.created_at_millis, self.file_path.as_path())
    }
}

impl PartialOrd for InstanceProfile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InstanceProfile {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_key().cmp(&other.order_key())
    }
}

/// Default back-pressure sleep between retries of a queue-full entry.
pub const CORE_THREAD_SLEEP_TIME: TokioDuration = TokioDuration::from_secs(1);

/// Default age-out horizon in normal mode.
pub const DEFAULT_AGE_OUT_HORIZON: Duration = Duration::days(2);

#[derive(Default)]
pub struct EventMap {
    buckets: BTreeMap<String, HashMap<PathBuf, InstanceProfile>>,
}

impl EventMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn entry_count(&self) -> usize {
        self.buckets.values().map(|b| b.len()).sum()
    }

    pub fn contains(&self, data_time: &str, file_path: &Path) -> bool {
        self.buckets
            .get(data_time)
            .map(|b| b.contains_key(file_path))
            .unwrap_or(false)
    }

    /// Offer a file for inclusion. Returns `false` if `(dataTime, filePath)`
    /// is already buffered, or if `instance_manager.should_add_again`
    /// vetoes the offer; otherwise buffers it and returns `true`. Never
    /// submits the same path twice for the same bucket.
    pub async fn offer<M: InstanceManager>(
        &mut self,
        file_path: PathBuf,
        data_time: String,
        mtime: SystemTime,
        created_at_millis: i64,
        instance_manager: &M,
    ) -> bool {
        if self.contains(&data_time, &file_path) {
            return false;
        }
        if !instance_manager.should_add_again(&file_path, mtime).await {
            return false;
        }
        self.buckets.entry(data_time.clone()).or_default().insert(
            file_path.clone(),
            InstanceProfile {
                file_path,
                data_time,
                mtime,
                created_at_millis,
            },
        );
        true
    }

    /// Release every bucket whose cycle end has arrived, submitting
    /// entries in `(createdAt, filePath)` order. On queue-full, sleeps
    /// `sleep_duration` and retries the *same* entry, never advancing to
    /// another entry or bucket in the meantime.
    pub async fn release_due<M: InstanceManager>(
        &mut self,
        now: DateTime<Utc>,
        cycle_unit: CycleUnit,
        offset: TimeOffset,
        instance_manager: &M,
        sleep_duration: TokioDuration,
        tz: FixedOffset,
    ) {
        let due: Vec<String> = self
            .buckets
            .keys()
            .filter(|data_time| {
                date_pattern::should_start_time(data_time, cycle_unit, offset, tz)
                    .map(|due_at| due_at <= now)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        for data_time in due {
            self.release_bucket(&data_time, instance_manager, sleep_duration)
                .await;
        }
    }

    async fn release_bucket<M: InstanceManager>(
        &mut self,
        data_time: &str,
        instance_manager: &M,
        sleep_duration: TokioDuration,
    ) {
        loop {
            let next_path = {
                let Some(bucket) = self.buckets.get(data_time) else {
                    return;
                };
                let mut entries: Vec<&InstanceProfile> = bucket.values().collect();
                entries.sort();
                match entries.first() {
                    Some(p) => p.file_path.clone(),
                    None => {
                        self.buckets.remove(data_time);
                        return;
                    }
                }
            };
            let profile = self.buckets[data_time][&next_path].clone();
            let submitted = instance_manager
                .submit_action(InstanceAction::Add(profile))
                .await;
            if submitted {
                if let Some(bucket) = self.buckets.get_mut(data_time) {
                    bucket.remove(&next_path);
                    if bucket.is_empty() {
                        self.buckets.remove(data_time);
                    }
                }
            } else {
                tracing::debug!(data_time, path = %next_path.display(), "event map: queue full, backing off");
                tokio::time::sleep(sleep_duration).await;
            }
        }
    }

    /// In normal mode only, drop every bucket whose `dataTime` falls
    /// outside `[now - horizon, now + horizon]`.
    pub fn age_out(&mut self, now: DateTime<Utc>, cycle_unit: CycleUnit, horizon: Duration, tz: FixedOffset) {
        self.buckets.retain(|data_time, _| {
            match date_pattern::parse_data_time(data_time, cycle_unit, tz) {
                Some(t) => (now - t).abs() <= horizon,
                None => true,
            }
        });
    }
}

#[cfg(test)]
#[path = "event_map_tests.rs"]
mod tests;
