// SPDX-License-Identifier: MIT OR Apache-2.0

//! External collaborators this crate only reaches through narrow traits:
//! the downstream instance manager (tails and ships matched files) and the
//! task manager (receives a terminal action). Their own persistence,
//! concurrency and lifecycle are out of scope here.

use crate::event_map::InstanceProfile;
use crate::profile::TaskProfile;
use async_trait::async_trait;
use std::path::Path;
use std::time::SystemTime;

/// Action submitted to the instance manager for a single discovered file.
#[derive(Debug, Clone)]
pub enum InstanceAction {
    Add(InstanceProfile),
}

/// Action submitted to the task manager. Only `Finish` exists today — a
/// retry-mode task emits it once every instance has finished.
#[derive(Debug, Clone)]
pub enum TaskAction {
    Finish(TaskProfile),
}

/// Downstream collaborator that tails and ships matched files.
///
/// `submit_action` and `should_add_again` are non-blocking by contract: a
/// full internal queue is a return value, not a block or an error.
#[async_trait]
pub trait InstanceManager: Send + Sync + 'static {
    /// Submit a file instance for ingestion. Returns `false` iff the
    /// internal queue is full; the caller must retry the same entry later.
    async fn submit_action(&self, action: InstanceAction) -> bool;

    /// Gate for re-offering a `(path, mtime)` pair that has already been
    /// released from the event map (e.g. the file was truncated and
    /// rewritten). `EventMap::offer` treats `false` the same as a
    /// duplicate.
    async fn should_add_again(&self, path: &Path, mtime: SystemTime) -> bool;

    /// Whether every instance this manager has accepted has finished
    /// processing. Drives the retry-mode `SUCCEEDED` transition.
    async fn all_instance_finished(&self) -> bool;

    async fn start(&self);
    async fn stop(&self);
}

/// Receiver for the task's terminal action.
#[async_trait]
pub trait TaskManager: Send + Sync + 'static {
    async fn submit_action(&self, action: TaskAction);
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake;
