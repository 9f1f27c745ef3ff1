// SPDX-License-Identifier: MIT OR Apache-2.0

//! Enumerates existing files matching an origin pattern over a time window,
//! capped per tick and sorted by modification time.

use crate::cycle::{CycleUnit, TimeOffset};
use crate::date_pattern;
use crate::path_pattern::{self, PathLayers};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Default recursive-walk depth bound below a watch entity's static root.
pub const DEFAULT_SCAN_DEPTH: u32 = 3;

/// A file discovered by a scan, already paired with its rendered data time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicFileInfo {
    pub path: PathBuf,
    pub data_time: String,
    pub modified: SystemTime,
}

/// Enumerate every existing file matching `origin_pattern` between
/// `fail_time` and `recover_time`, at most `max_file_num` results, sorted by
/// mtime ascending.
///
/// In normal mode (`is_retry == false`) both timestamps are first shifted by
/// `-offset`; in retry mode they are used as given.
pub fn scan_between(
    origin_pattern: &str,
    cycle_unit: CycleUnit,
    offset: TimeOffset,
    fail_time: DateTime<Utc>,
    recover_time: DateTime<Utc>,
    is_retry: bool,
    max_file_num: usize,
    depth_bound: u32,
    tz: FixedOffset,
) -> Vec<BasicFileInfo> {
    let (start, end) = if is_retry {
        (fail_time, recover_time)
    } else {
        let shift = Duration::milliseconds(-offset.as_millis());
        (fail_time + shift, recover_time + shift)
    };

    let mut out = Vec::new();
    for t in date_pattern::date_region(start, end, cycle_unit, tz) {
        let expanded = date_pattern::render(origin_pattern, t, cycle_unit, tz);
        let layers = match path_pattern::split(&expanded) {
            Ok(layers) => layers,
            Err(_) => continue,
        };
        let data_time = t.format(cycle_unit.data_time_format()).to_string();
        collect_from_root(&layers, &data_time, depth_bound, max_file_num, &mut out);
        if out.len() >= max_file_num {
            break;
        }
    }
    out.truncate(max_file_num);
    out.sort_by_key(|f| f.modified);
    out
}

fn collect_from_root(
    layers: &PathLayers,
    data_time: &str,
    depth_bound: u32,
    max_file_num: usize,
    out: &mut Vec<BasicFileInfo>,
) {
    let root = Path::new(&layers.static_root);
    if !root.exists() {
        // Missing staticRoot is an empty result, not an error (§4.C edge cases).
        return;
    }
    walk(root, layers, data_time, 0, depth_bound, max_file_num, out);
}

fn walk(
    dir: &Path,
    layers: &PathLayers,
    data_time: &str,
    depth: u32,
    depth_bound: u32,
    max_file_num: usize,
    out: &mut Vec<BasicFileInfo>,
) {
    if depth > depth_bound || out.len() >= max_file_num {
        return;
    }
    // A file only matches once every intermediate segment has been
    // satisfied; a directory only merits recursion if the next intermediate
    // segment's regex accepts it.
    let file_depth = layers.intermediate_segment_regexes.len() as u32;
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "scanner: failed to read directory, skipping subtree");
            return;
        }
    };
    for entry in entries.flatten() {
        if out.len() >= max_file_num {
            return;
        }
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };
        if file_type.is_dir() {
            if depth < file_depth && path_matches_intermediate(depth, &name, layers) {
                walk(
                    &path,
                    layers,
                    data_time,
                    depth + 1,
                    depth_bound,
                    max_file_num,
                    out,
                );
            }
            continue;
        }
        if !file_type.is_file() || depth != file_depth {
            continue;
        }
        if !layers.file_name_regex.is_match(&name) {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        out.push(BasicFileInfo {
            path,
            data_time: data_time.to_string(),
            modified,
        });
    }
}

/// Whether a directory named `name`, at walk depth `depth` below the static
/// root, satisfies that depth's intermediate segment regex.
fn path_matches_intermediate(depth: u32, name: &str, layers: &PathLayers) -> bool {
    layers
        .intermediate_segment_regexes
        .get(depth as usize)
        .map(|re| re.is_match(name))
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "scanner_tests.rs"]
mod tests;
