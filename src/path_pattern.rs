// SPDX-License-Identifier: MIT OR Apache-2.0

//! Splits an origin pattern into `(staticRoot, per-segment intermediate dir
//! regexes, fileNameRegex)` layers.

use crate::date_pattern;
use crate::error::CollectError;
use regex::Regex;

/// Characters that mark the end of a pattern's static prefix: glob
/// wildcards and the first character of a date token.
const DYNAMIC_MARKERS: &[char] = &['*', '?', '[', '(', '+', '^', '$', '|'];

/// Derived path layers for an origin pattern.
#[derive(Debug, Clone)]
pub struct PathLayers {
    /// Longest leading prefix with no wildcard/date token.
    pub static_root: String,
    /// One compiled regex per intermediate directory segment between
    /// `static_root` and the file name, in walk order. Empty when the
    /// pattern has only one dynamic segment (the file name itself); a
    /// directory at walk depth `i` below `static_root` must match
    /// `intermediate_segment_regexes[i]` to be worth recursing into.
    pub intermediate_segment_regexes: Vec<Regex>,
    /// Compiled regex for the file name itself.
    pub file_name_regex: Regex,
    /// The longest contiguous date-token region found in the original
    /// pattern's file-name segment, used to know whether a data time can be
    /// extracted from a candidate file name.
    pub has_date_token: bool,
}

/// Split an origin pattern into its path layers. Fails with
/// `CollectError::InvalidPattern` if no static root exists (the pattern is
/// dynamic starting from its very first segment, e.g. `*/app.log`).
pub fn split(origin_pattern: &str) -> Result<PathLayers, CollectError> {
    date_pattern::validate(origin_pattern)?;

    let segments: Vec<&str> = origin_pattern.split('/').collect();
    let first_dynamic = segments
        .iter()
        .position(|s| is_dynamic_segment(s))
        .ok_or_else(|| CollectError::InvalidPattern {
            pattern: origin_pattern.to_string(),
            reason: "pattern has no dynamic segment to scan or watch".to_string(),
        })?;

    if first_dynamic == 0 {
        return Err(CollectError::InvalidPattern {
            pattern: origin_pattern.to_string(),
            reason: "no static root: pattern is dynamic from the first segment".to_string(),
        });
    }

    let static_root = segments[..first_dynamic].join("/");
    let dynamic_segments = &segments[first_dynamic..];

    // A single dynamic segment: the file name. No intermediate segments.
    let (intermediate_segments, file_segment): (&[&str], &str) = if dynamic_segments.len() == 1 {
        (&dynamic_segments[..0], dynamic_segments[0])
    } else {
        (
            &dynamic_segments[..dynamic_segments.len() - 1],
            dynamic_segments[dynamic_segments.len() - 1],
        )
    };

    let intermediate_segment_regexes = intermediate_segments
        .iter()
        .map(|s| {
            Regex::new(&format!("^{}$", segment_to_regex(s))).map_err(|e| CollectError::InvalidPattern {
                pattern: origin_pattern.to_string(),
                reason: format!("intermediate dir regex: {e}"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let file_regex_src = segment_to_regex(file_segment);
    let file_name_regex =
        Regex::new(&format!("^{file_regex_src}$")).map_err(|e| CollectError::InvalidPattern {
            pattern: origin_pattern.to_string(),
            reason: format!("file name regex: {e}"),
        })?;

    Ok(PathLayers {
        static_root,
        intermediate_segment_regexes,
        file_name_regex,
        has_date_token: date_pattern::has_date_token(origin_pattern),
    })
}

/// Raw (unanchored) regex source for a pattern's file-name segment, for
/// callers that need looser matching than `PathLayers::file_name_regex`'s
/// full-string anchors (e.g. the watch entity's prefix-tolerant match).
pub fn file_segment_regex_source(origin_pattern: &str) -> String {
    let segment = origin_pattern.rsplit('/').next().unwrap_or(origin_pattern);
    segment_to_regex(segment)
}

fn is_dynamic_segment(segment: &str) -> bool {
    segment.chars().any(|c| DYNAMIC_MARKERS.contains(&c)) || has_date_token_chars(segment)
}

fn has_date_token_chars(segment: &str) -> bool {
    date_pattern::has_date_token(segment)
}

/// Convert one path segment of an origin pattern into a regex source
/// fragment: `*` becomes a within-segment wildcard, date tokens become
/// digit-count groups, everything else is escaped literally.
fn segment_to_regex(segment: &str) -> String {
    let chars: Vec<char> = segment.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        if let Some(len) = date_token_len_at(&chars, i) {
            out.push_str(&format!("\\d{{{len}}}"));
            i += len;
            continue;
        }
        match chars[i] {
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }
    out
}

fn date_token_len_at(chars: &[char], i: usize) -> Option<usize> {
    const TOKENS: &[&str] = &["YYYY", "MM", "DD", "hh", "mm"];
    for token in TOKENS {
        let token_chars: Vec<char> = token.chars().collect();
        let len = token_chars.len();
        if i + len <= chars.len() && chars[i..i + len] == token_chars[..] {
            return Some(len);
        }
    }
    None
}

#[cfg(test)]
#[path = "path_pattern_tests.rs"]
mod tests;
