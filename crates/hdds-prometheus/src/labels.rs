// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Label sets attached to metric series.

use crate::path::normalize_label_key;
use std::collections::BTreeMap;

/// Label key -> value. Ordered so series identity and exposition are stable.
pub type LabelSet = BTreeMap<String, String>;

/// Normalize every key of `labels` (see [`normalize_label_key`]).
///
/// Keys that collide after normalization keep the value of the last one in
/// key order.
pub fn normalize_labels(labels: LabelSet) -> LabelSet {
    labels
        .into_iter()
        .map(|(k, v)| (normalize_label_key(&k), v))
        .collect()
}

/// Prometheus label-name rule: `[a-zA-Z_][a-zA-Z0-9_]*`, no `__` prefix.
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && !name.starts_with("__")
}

/// Build a label set from string pairs.
pub fn label_set<K, V, I>(pairs: I) -> LabelSet
where
    K: Into<String>,
    V: Into<String>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
