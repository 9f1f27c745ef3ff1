// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed identifiers, replacing bare `String` keys for log correlation and
//! map lookups.

/// Define a newtype ID wrapper around `String`: `new()`, `as_str()`,
/// `Display`, `From<String>`/`From<&str>`, and `Borrow<str>`.
macro_rules! define_id {
    ($(#[$meta:meta])* pub struct $name:ident;) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Identifies a task (one core loop, one profile, many origin patterns).
    pub struct TaskId;
}

define_id! {
    /// Identifies a single origin pattern within a task, used to key
    /// `watchFailedDirs` and the watch-entity map.
    pub struct OriginPatternId;
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
