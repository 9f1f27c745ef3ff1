// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fake collaborators for tests: an in-memory instance manager and task
//! manager standing in for the real downstream processes.

use super::{InstanceAction, InstanceManager, TaskAction, TaskManager};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

struct FakeInstanceManagerState {
    submitted: Vec<InstanceAction>,
    deny_add_again_for: HashSet<PathBuf>,
}

/// Records every submitted action; can be configured to reject the first N
/// `submit_action` calls (simulating queue-full back-pressure) and to
/// deny `should_add_again` for specific paths.
#[derive(Clone)]
pub struct FakeInstanceManager {
    state: Arc<Mutex<FakeInstanceManagerState>>,
    reject_first_n_submits: Arc<AtomicUsize>,
    finished: Arc<AtomicBool>,
}

impl Default for FakeInstanceManager {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeInstanceManagerState {
                submitted: Vec::new(),
                deny_add_again_for: HashSet::new(),
            })),
            reject_first_n_submits: Arc::new(AtomicUsize::new(0)),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl FakeInstanceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_first_submits(&self, n: usize) {
        self.reject_first_n_submits.store(n, Ordering::SeqCst);
    }

    pub fn deny_add_again(&self, path: &Path) {
        self.state.lock().deny_add_again_for.insert(path.to_path_buf());
    }

    pub fn set_all_finished(&self, finished: bool) {
        self.finished.store(finished, Ordering::SeqCst);
    }

    pub fn submitted(&self) -> Vec<InstanceAction> {
        self.state.lock().submitted.clone()
    }

    pub fn submitted_count(&self) -> usize {
        self.state.lock().submitted.len()
    }
}

#[async_trait]
impl InstanceManager for FakeInstanceManager {
    async fn submit_action(&self, action: InstanceAction) -> bool {
        let remaining = self.reject_first_n_submits.load(Ordering::SeqCst);
        if remaining > 0 {
            self.reject_first_n_submits.fetch_sub(1, Ordering::SeqCst);
            return false;
        }
        self.state.lock().submitted.push(action);
        true
    }

    async fn should_add_again(&self, path: &Path, _mtime: SystemTime) -> bool {
        !self.state.lock().deny_add_again_for.contains(path)
    }

    async fn all_instance_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    async fn start(&self) {}
    async fn stop(&self) {}
}

struct FakeTaskManagerState {
    actions: Vec<TaskAction>,
}

#[derive(Clone)]
pub struct FakeTaskManager {
    state: Arc<Mutex<FakeTaskManagerState>>,
}

impl Default for FakeTaskManager {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeTaskManagerState {
                actions: Vec::new(),
            })),
        }
    }
}

impl FakeTaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> Vec<TaskAction> {
        self.state.lock().actions.clone()
    }
}

#[async_trait]
impl TaskManager for FakeTaskManager {
    async fn submit_action(&self, action: TaskAction) {
        self.state.lock().actions.push(action);
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
