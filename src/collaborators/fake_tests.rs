// SPDX-License-Identifier: MIT OR Apache-2.0

use super::*;
use crate::event_map::InstanceProfile;
use std::path::PathBuf;
use std::time::SystemTime;

fn sample_action() -> InstanceAction {
    InstanceAction::Add(InstanceProfile {
        file_path: PathBuf::from("/d/a.log"),
        data_time: "2024010100".to_string(),
        mtime: SystemTime::UNIX_EPOCH,
        created_at_millis: 0,
    })
}

#[tokio::test]
async fn records_submitted_actions() {
    let manager = FakeInstanceManager::new();
    assert!(manager.submit_action(sample_action()).await);
    assert_eq!(manager.submitted_count(), 1);
}

#[tokio::test]
async fn rejects_first_n_submits_then_accepts() {
    let manager = FakeInstanceManager::new();
    manager.reject_first_submits(2);
    assert!(!manager.submit_action(sample_action()).await);
    assert!(!manager.submit_action(sample_action()).await);
    assert!(manager.submit_action(sample_action()).await);
    assert_eq!(manager.submitted_count(), 1);
}

#[tokio::test]
async fn should_add_again_defaults_true_unless_denied() {
    let manager = FakeInstanceManager::new();
    let path = PathBuf::from("/d/a.log");
    assert!(manager.should_add_again(&path, SystemTime::UNIX_EPOCH).await);
    manager.deny_add_again(&path);
    assert!(!manager.should_add_again(&path, SystemTime::UNIX_EPOCH).await);
}

#[tokio::test]
async fn all_instance_finished_is_settable() {
    let manager = FakeInstanceManager::new();
    assert!(!manager.all_instance_finished().await);
    manager.set_all_finished(true);
    assert!(manager.all_instance_finished().await);
}

#[tokio::test]
async fn task_manager_records_actions() {
    let tm = FakeTaskManager::new();
    tm.submit_action(TaskAction::Finish(crate::profile::TaskProfile::test_minimal()))
        .await;
    assert_eq!(tm.actions().len(), 1);
}
