// SPDX-License-Identifier: MIT OR Apache-2.0

//! Orchestrates one task profile end-to-end: opens live watches (normal
//! mode) or runs a bounded window scan (retry mode), buffers discovered
//! files in the event map, and drives the 1Hz core loop.

use crate::clock::Clock;
use crate::collaborators::{InstanceManager, TaskAction, TaskManager};
use crate::cycle::{CycleUnit, TimeOffset};
use crate::date_pattern;
use crate::env;
use crate::error::CollectError;
use crate::event_map::EventMap;
use crate::id::{OriginPatternId, TaskId};
use crate::profile::TaskProfile;
use crate::scanner;
use crate::watch_entity::{DrainedEvent, WatchEntity};
use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, Utc};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Lifecycle state of a collect task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    New,
    Running,
    Succeeded,
    Failed,
}

/// Outcome of a single core-loop tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    Ticked,
    Finished,
    Stalled,
}

/// Point-in-time snapshot for observability; never persisted.
#[derive(Debug, Clone)]
pub struct TaskStatus {
    pub task_id: TaskId,
    pub state: TaskState,
    pub is_retry: bool,
    pub last_tick_millis: i64,
    pub watch_entity_count: usize,
    pub watch_failed_count: usize,
    pub buffered_bucket_count: usize,
    pub buffered_entry_count: usize,
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub struct LogFileCollectTask<C: Clock, M: InstanceManager, T: TaskManager> {
    task_id: TaskId,
    profile: TaskProfile,
    cycle_unit: CycleUnit,
    offset: TimeOffset,
    is_retry: bool,
    fail_time: DateTime<Utc>,
    recover_time: DateTime<Utc>,
    retry_scanned: bool,
    origin_patterns: Vec<String>,
    watch_entities: HashMap<OriginPatternId, (String, WatchEntity)>,
    watch_failed: HashSet<OriginPatternId>,
    event_map: EventMap,
    state: TaskState,
    clock: C,
    instance_manager: M,
    task_manager: T,
    last_tick_millis: Arc<AtomicI64>,
    last_scan_millis: i64,
    scan_interval_millis: i64,
    core_thread_sleep: Duration,
    core_thread_max_gap: Duration,
    scan_depth_bound: u32,
    age_out_horizon: ChronoDuration,
    creation_time_window: ChronoDuration,
    data_time_zone: FixedOffset,
    stop_requested: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
}

/// External, cloneable handle to a running task: the only way to request
/// cancellation from outside the task's own `run()` loop, and to observe
/// whether that loop has actually quiesced.
#[derive(Clone)]
pub struct TaskHandle {
    stop_requested: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    last_tick_millis: Arc<AtomicI64>,
    core_thread_max_gap: Duration,
}

impl TaskHandle {
    /// Signal the task's core loop to stop at the start of its next
    /// iteration. Does not block.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Wait until the core loop has observed the stop request and exited,
    /// or until it appears stuck (no tick observed for longer than
    /// `core_thread_max_gap`), whichever comes first.
    pub async fn await_quiescent(&self) {
        let max_gap_millis = self.core_thread_max_gap.as_millis() as i64;
        loop {
            if !self.is_running() {
                return;
            }
            let last_tick = self.last_tick_millis.load(Ordering::SeqCst);
            let now = SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.as_millis() as i64)
                .unwrap_or(0);
            if now - last_tick > max_gap_millis {
                tracing::warn!("task handle: core loop presumed stuck past max gap, proceeding with shutdown anyway");
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl<C: Clock, M: InstanceManager, T: TaskManager> LogFileCollectTask<C, M, T> {
    pub fn new(
        task_id: TaskId,
        profile: TaskProfile,
        clock: C,
        instance_manager: M,
        task_manager: T,
    ) -> Result<Self, CollectError> {
        profile.validate()?;
        let cycle_unit = profile.cycle_unit()?;
        let offset = profile.time_offset()?;
        let origin_patterns = profile.origin_patterns();
        if origin_patterns.is_empty() {
            return Err(CollectError::ProfileInvalid(
                "fileDirFilterPatterns yields no origin patterns".to_string(),
            ));
        }
        let is_retry = profile.task_retry;
        let fail_time = millis_to_datetime(profile.task_start_time);
        let recover_time = millis_to_datetime(profile.task_end_time);
        let now = clock.now_millis();
        Ok(Self {
            task_id,
            profile,
            cycle_unit,
            offset,
            is_retry,
            fail_time,
            recover_time,
            retry_scanned: false,
            origin_patterns,
            watch_entities: HashMap::new(),
            watch_failed: HashSet::new(),
            event_map: EventMap::new(),
            state: TaskState::New,
            clock,
            instance_manager,
            task_manager,
            last_tick_millis: Arc::new(AtomicI64::new(now)),
            last_scan_millis: 0,
            scan_interval_millis: env::scan_interval().as_millis() as i64,
            core_thread_sleep: env::core_thread_sleep_time(),
            core_thread_max_gap: env::core_thread_max_gap_time(),
            scan_depth_bound: env::scan_depth_bound(),
            age_out_horizon: ChronoDuration::milliseconds(env::age_out_horizon_millis()),
            creation_time_window: ChronoDuration::milliseconds(env::creation_time_window_millis()),
            data_time_zone: env::data_time_zone_offset(),
            stop_requested: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn status(&self) -> TaskStatus {
        TaskStatus {
            task_id: self.task_id.clone(),
            state: self.state,
            is_retry: self.is_retry,
            last_tick_millis: self.last_tick_millis.load(Ordering::SeqCst),
            watch_entity_count: self.watch_entities.len(),
            watch_failed_count: self.watch_failed.len(),
            buffered_bucket_count: self.event_map.bucket_count(),
            buffered_entry_count: self.event_map.entry_count(),
        }
    }

    /// A cloneable external handle for cancelling this task and observing
    /// its loop's liveness from outside the `&mut self` it otherwise
    /// requires for the duration of `run()`.
    pub fn handle(&self) -> TaskHandle {
        TaskHandle {
            stop_requested: self.stop_requested.clone(),
            running: self.running.clone(),
            last_tick_millis: self.last_tick_millis.clone(),
            core_thread_max_gap: self.core_thread_max_gap,
        }
    }

    /// Open live filesystem watches for normal-mode tasks and start the
    /// instance manager. Retry-mode tasks never watch — they only scan
    /// their fixed window.
    pub async fn init(&mut self) -> Result<(), CollectError> {
        if !self.is_retry {
            for pattern in self.origin_patterns.clone() {
                self.open_watch(pattern);
            }
        }
        self.instance_manager.start().await;
        self.state = TaskState::Running;
        Ok(())
    }

    fn open_watch(&mut self, pattern: String) {
        let id = OriginPatternId::new(pattern.clone());
        match WatchEntity::new(&pattern, self.scan_depth_bound) {
            Ok(entity) => {
                self.watch_entities.insert(id.clone(), (pattern, entity));
                self.watch_failed.remove(&id);
            }
            Err(e) => {
                tracing::warn!(task_id = %self.task_id, pattern, error = %e, "task: failed to open watch, relying on periodic scan");
                self.watch_failed.insert(id);
            }
        }
    }

    /// Run the core loop until the task reaches a terminal state, an
    /// external `TaskHandle` requests cancellation, or the loop stalls —
    /// then release its watchers.
    pub async fn run(&mut self) -> TaskState {
        self.running.store(true, Ordering::SeqCst);
        loop {
            if self.stop_requested.load(Ordering::SeqCst) {
                tracing::info!(task_id = %self.task_id, "task: stop requested, ending core loop");
                self.state = TaskState::Succeeded;
                break;
            }
            match self.tick().await {
                LoopOutcome::Stalled => {
                    tracing::error!(task_id = %self.task_id, "task: core loop stalled past max gap, failing task");
                    self.state = TaskState::Failed;
                    break;
                }
                LoopOutcome::Finished => {
                    self.state = TaskState::Succeeded;
                    break;
                }
                LoopOutcome::Ticked => {}
            }
            tokio::time::sleep(self.core_thread_sleep).await;
        }
        self.running.store(false, Ordering::SeqCst);
        self.release_watchers().await;
        self.state
    }

    /// Transition to `Succeeded` and release watchers, after first waiting
    /// for the core loop to observe the stop request (or, if it appears
    /// stuck, proceeding anyway). This is the only external cancellation
    /// path — there is no other way to stop a running task from outside
    /// its own `run()` loop.
    pub async fn destroy(&mut self) -> TaskState {
        self.stop_requested.store(true, Ordering::SeqCst);
        self.handle().await_quiescent().await;
        if self.state == TaskState::Running {
            self.state = TaskState::Succeeded;
        }
        self.release_watchers().await;
        self.state
    }

    /// A single core-loop iteration, bounded by `core_thread_max_gap`: a
    /// tick that doesn't complete in time is treated as a stalled core
    /// thread.
    pub async fn tick(&mut self) -> LoopOutcome {
        self.last_tick_millis
            .store(self.clock.now_millis(), Ordering::SeqCst);
        match tokio::time::timeout(self.core_thread_max_gap, self.tick_inner()).await {
            Ok(outcome) => outcome,
            Err(_) => LoopOutcome::Stalled,
        }
    }

    async fn tick_inner(&mut self) -> LoopOutcome {
        let now_millis = self.clock.now_millis();
        let now = millis_to_datetime(now_millis);

        if self.is_retry {
            self.run_for_retry(now, now_millis).await
        } else {
            self.run_for_normal(now, now_millis).await;
            LoopOutcome::Ticked
        }
    }

    async fn run_for_normal(&mut self, now: DateTime<Utc>, now_millis: i64) {
        let patterns: Vec<(OriginPatternId, String)> = self
            .watch_entities
            .iter()
            .map(|(id, (pattern, _))| (id.clone(), pattern.clone()))
            .collect();

        let mut force_rescan = false;
        for (id, pattern) in &patterns {
            let Some((_, entity)) = self.watch_entities.get_mut(id) else {
                continue;
            };
            if !entity.static_root().exists() {
                if let Err(e) = entity.rebuild() {
                    tracing::warn!(task_id = %self.task_id, pattern, error = %e, "task: failed to rebuild watch after static root vanished");
                }
                continue;
            }
            if entity.total_path_size() == 0 {
                // The static root existed when this tick began but nothing
                // is registered yet, e.g. it just reappeared after being
                // deleted. Retry registration now that it's real again.
                entity.register_recursively(None);
            }
            let mut needs_rebuild = false;
            let mut discovered_files = Vec::new();
            for event in entity.drain_events() {
                match event {
                    DrainedEvent::File(path) => discovered_files.push(path),
                    DrainedEvent::NewDir(_) => {}
                    DrainedEvent::SubdirRemoved(_) => needs_rebuild = true,
                    DrainedEvent::Overflow => force_rescan = true,
                }
            }
            for path in discovered_files {
                self.offer_discovered_file(pattern, path, now, now_millis)
                    .await;
            }
            if needs_rebuild {
                let Some((_, entity)) = self.watch_entities.get_mut(id) else {
                    continue;
                };
                if let Err(e) = entity.rebuild() {
                    tracing::warn!(task_id = %self.task_id, pattern, error = %e, "task: failed to rebuild watch after a registered subdirectory was removed");
                }
            }
        }

        for id in self.watch_failed.clone() {
            self.open_watch(id.as_str().to_string());
        }

        let due_for_scan =
            force_rescan || now_millis - self.last_scan_millis >= self.scan_interval_millis;
        if due_for_scan {
            self.last_scan_millis = now_millis;
            let lookback = TimeOffset {
                signed_count: -2,
                unit: self.cycle_unit,
            };
            let window_start = now + ChronoDuration::milliseconds(lookback.as_millis());
            for pattern in self.origin_patterns.clone() {
                let files = scanner::scan_between(
                    &pattern,
                    self.cycle_unit,
                    self.offset,
                    window_start,
                    now,
                    false,
                    self.profile.file_max_num,
                    self.scan_depth_bound,
                    self.data_time_zone,
                );
                for file in files {
                    self.event_map
                        .offer(
                            file.path,
                            file.data_time,
                            file.modified,
                            now_millis,
                            &self.instance_manager,
                        )
                        .await;
                }
            }
        }

        self.event_map
            .release_due(
                now,
                self.cycle_unit,
                self.offset,
                &self.instance_manager,
                self.core_thread_sleep,
                self.data_time_zone,
            )
            .await;
        self.event_map
            .age_out(now, self.cycle_unit, self.age_out_horizon, self.data_time_zone);
    }

    async fn offer_discovered_file(
        &mut self,
        pattern: &str,
        path: PathBuf,
        now: DateTime<Utc>,
        now_millis: i64,
    ) {
        // A pattern with no date token carries no cycle to validate against;
        // such files are accepted unconditionally under dataTime="".
        let data_time = if self.check_file_name_for_time(pattern) {
            let Some(data_time) = self.get_data_time_from_file_name(&path, pattern) else {
                tracing::debug!(path = %path.display(), pattern, "task: date token present but unreadable in file name, skipping");
                return;
            };
            if !date_pattern::is_valid_creation_time_window(
                &data_time,
                self.cycle_unit,
                now,
                self.creation_time_window,
            ) {
                tracing::warn!(path = %path.display(), data_time, "task: file outside valid creation time window, skipping");
                return;
            }
            data_time
        } else {
            String::new()
        };
        let mtime = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        self.event_map
            .offer(path, data_time, mtime, now_millis, &self.instance_manager)
            .await;
    }

    /// Whether `pattern`'s file-name segment carries a date token at all.
    pub fn check_file_name_for_time(&self, pattern: &str) -> bool {
        date_pattern::has_date_token(pattern)
    }

    /// Extract the data time for `path` under `pattern`, or `None` if the
    /// pattern carries no date token or nothing digit-like was found there.
    pub fn get_data_time_from_file_name(&self, path: &std::path::Path, pattern: &str) -> Option<String> {
        if !self.check_file_name_for_time(pattern) {
            return None;
        }
        let data_time = date_pattern::extract_data_time(path, pattern);
        if data_time.is_empty() {
            None
        } else {
            Some(data_time)
        }
    }

    async fn run_for_retry(&mut self, now: DateTime<Utc>, now_millis: i64) -> LoopOutcome {
        if !self.retry_scanned {
            self.retry_scanned = true;
            for pattern in self.origin_patterns.clone() {
                let files = scanner::scan_between(
                    &pattern,
                    self.cycle_unit,
                    self.offset,
                    self.fail_time,
                    self.recover_time,
                    true,
                    self.profile.file_max_num,
                    self.scan_depth_bound,
                    self.data_time_zone,
                );
                for file in files {
                    self.event_map
                        .offer(
                            file.path,
                            file.data_time,
                            file.modified,
                            now_millis,
                            &self.instance_manager,
                        )
                        .await;
                }
            }
        }

        self.event_map
            .release_due(
                now,
                self.cycle_unit,
                self.offset,
                &self.instance_manager,
                self.core_thread_sleep,
                self.data_time_zone,
            )
            .await;

        if self.retry_scanned
            && self.event_map.entry_count() == 0
            && self.instance_manager.all_instance_finished().await
        {
            LoopOutcome::Finished
        } else {
            LoopOutcome::Ticked
        }
    }

    /// Close every live watch, stop the instance manager, and — for a
    /// retry task that reached `Succeeded` — notify the task manager.
    pub async fn release_watchers(&mut self) {
        for (_, (_, mut entity)) in self.watch_entities.drain() {
            entity.close();
        }
        self.instance_manager.stop().await;
        if self.is_retry && self.state == TaskState::Succeeded {
            self.task_manager
                .submit_action(TaskAction::Finish(self.profile.clone()))
                .await;
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
