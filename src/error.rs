// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the discovery core.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that cross a function boundary inside the discovery core.
///
/// Kinds that the orchestrator recovers from locally without ever
/// surfacing a `Result::Err` (overflow events, queue-full back-pressure,
/// a stalled core loop) are not represented here — see `task::LoopOutcome`
/// for those.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("invalid origin pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid task profile: {0}")]
    ProfileInvalid(String),

    #[error("static root does not exist: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("too many open files while registering {0}")]
    TooManyOpenFiles(PathBuf),

    #[error("io error under {path}: {source}")]
    OtherIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("watch key invalid for {0}")]
    WatchKeyInvalid(PathBuf),

    #[error("filesystem watch error: {0}")]
    Notify(#[from] notify::Error),
}

impl CollectError {
    /// Classify a raw `io::Error` encountered while registering a directory:
    /// an exhausted file-descriptor table is logged without a stack trace,
    /// any other I/O error is logged with one.
    pub fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        if source.raw_os_error() == Some(libc_emfile()) {
            CollectError::TooManyOpenFiles(path)
        } else {
            CollectError::OtherIo { path, source }
        }
    }
}

/// `EMFILE` ("too many open files"), without pulling in a libc dependency
/// just for one constant. Matches the value on Linux and macOS, the two
/// platforms `notify`'s recommended watcher targets.
fn libc_emfile() -> i32 {
    24
}
