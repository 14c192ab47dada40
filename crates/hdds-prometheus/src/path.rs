// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field-path string helpers.
//!
//! Paths are dotted member chains (`location.zone`). Collection boundaries are
//! stored without a trailing separator, so a boundary path is also a valid
//! prefix test target via [`strip_path_prefix`].

/// Member separator in data paths.
pub const SEPARATOR: char = '.';

/// Split a dotted path into its segments. The empty path has none.
pub fn split_path(path: &str) -> Vec<&str> {
    if path.is_empty() {
        Vec::new()
    } else {
        path.split(SEPARATOR).collect()
    }
}

/// Join segments with the member separator.
pub fn join_path<S: AsRef<str>>(segments: &[S]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push(SEPARATOR);
        }
        out.push_str(segment.as_ref());
    }
    out
}

/// Append one member to a path.
pub fn append_member(path: &str, member: &str) -> String {
    if path.is_empty() {
        member.to_string()
    } else {
        format!("{}{}{}", path, SEPARATOR, member)
    }
}

/// Append a 0-based element index (`path[i]`).
pub fn append_index(path: &str, index: usize) -> String {
    format!("{}[{}]", path, index)
}

/// Drop trailing path separators. Member names may end in `_`.
pub fn trim_separator(path: &str) -> &str {
    path.trim_end_matches(SEPARATOR)
}

/// Last segment of a dotted path.
pub fn last_segment(path: &str) -> &str {
    path.rsplit(SEPARATOR).next().unwrap_or(path)
}

/// Peel `prefix` off `path`.
///
/// Returns the remainder after `prefix.`, the empty string when the two are
/// equal, and `None` when `path` is not inside `prefix`. The empty prefix
/// contains every path.
pub fn strip_path_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(path);
    }
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix(SEPARATOR)
    }
}

/// True if `path` equals `boundary` or lies below it.
pub fn is_within(path: &str, boundary: &str) -> bool {
    strip_path_prefix(path, boundary).is_some()
}

/// Metric name derived from a data path (`a.b` -> `a_b`).
pub fn derived_metric_name(path: &str) -> String {
    normalize_label_key(path)
}

/// Make an arbitrary string a valid Prometheus metric name.
///
/// Scoped type names (`pkg::Type`) collapse to `pkg_Type`; any other character
/// outside `[a-zA-Z0-9_:]` becomes `_`, and a leading digit gets a `_` prefix.
pub fn sanitize_metric_name(name: &str) -> String {
    let mut out: String = name
        .replace("::", "_")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Label-key normalization: every `.`, `[` and `]` becomes `_`.
pub fn normalize_label_key(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '.' | '[' | ']' => '_',
            other => other,
        })
        .collect()
}
