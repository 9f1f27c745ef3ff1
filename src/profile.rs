// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed task profile, replacing reflection-based JSON typing with an
//! explicit schema plus a string-keyed bag for user-defined extensions.

use crate::cycle::{CycleUnit, TimeOffset};
use crate::error::CollectError;
use serde::{Deserialize, Serialize};

fn default_file_max_num() -> usize {
    1000
}

/// The task profile surface this core consumes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskProfile {
    #[serde(rename = "taskId")]
    pub task_id: String,
    pub source: String,
    pub sink: String,
    pub channel: String,
    #[serde(rename = "groupId")]
    pub group_id: String,
    #[serde(rename = "streamId")]
    pub stream_id: String,
    #[serde(rename = "cycleUnit")]
    pub cycle_unit: String,
    /// Comma-separated origin patterns.
    #[serde(rename = "fileDirFilterPatterns")]
    pub file_dir_filter_patterns: String,
    /// Signed offset expression, e.g. `-1h`. Empty means no offset.
    #[serde(rename = "taskFileTimeOffset", default)]
    pub task_file_time_offset: String,
    #[serde(rename = "fileMaxNum", default = "default_file_max_num")]
    pub file_max_num: usize,
    #[serde(rename = "taskRetry", default)]
    pub task_retry: bool,
    #[serde(rename = "taskStartTime", default)]
    pub task_start_time: i64,
    #[serde(rename = "taskEndTime", default)]
    pub task_end_time: i64,
    /// User-defined extension keys this core does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TaskProfile {
    /// Required-key presence and retry-bounds checks run once at task
    /// construction.
    pub fn validate(&self) -> Result<(), CollectError> {
        for (name, value) in [
            ("taskId", &self.task_id),
            ("source", &self.source),
            ("sink", &self.sink),
            ("channel", &self.channel),
            ("groupId", &self.group_id),
            ("streamId", &self.stream_id),
            ("cycleUnit", &self.cycle_unit),
            ("fileDirFilterPatterns", &self.file_dir_filter_patterns),
        ] {
            if value.is_empty() {
                return Err(CollectError::ProfileInvalid(format!(
                    "missing required key: {name}"
                )));
            }
        }
        CycleUnit::parse(&self.cycle_unit).map_err(|_| {
            CollectError::ProfileInvalid(format!("invalid cycleUnit: {}", self.cycle_unit))
        })?;
        if self.task_retry && (self.task_start_time == 0 || self.task_end_time == 0) {
            return Err(CollectError::ProfileInvalid(
                "retry task requires non-zero taskStartTime and taskEndTime".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cycle_unit(&self) -> Result<CycleUnit, CollectError> {
        CycleUnit::parse(&self.cycle_unit)
    }

    pub fn time_offset(&self) -> Result<TimeOffset, CollectError> {
        if self.task_file_time_offset.trim().is_empty() {
            Ok(TimeOffset::ZERO)
        } else {
            TimeOffset::parse(&self.task_file_time_offset)
        }
    }

    /// Split `fileDirFilterPatterns` on commas, trimming whitespace and
    /// skipping empty segments.
    pub fn origin_patterns(&self) -> Vec<String> {
        self.file_dir_filter_patterns
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl TaskProfile {
    /// A minimal, valid normal-mode profile for tests.
    pub fn test_minimal() -> Self {
        TaskProfile {
            task_id: "task-0".to_string(),
            source: "src".to_string(),
            sink: "sink".to_string(),
            channel: "chan".to_string(),
            group_id: "group".to_string(),
            stream_id: "stream".to_string(),
            cycle_unit: "h".to_string(),
            file_dir_filter_patterns: "/d/YYYYMMDDhh/*.log".to_string(),
            task_file_time_offset: "0h".to_string(),
            file_max_num: 100,
            task_retry: false,
            task_start_time: 0,
            task_end_time: 0,
            extra: serde_json::Map::new(),
        }
    }
}

#[cfg(test)]
#[path = "profile_tests.rs"]
mod tests;
