// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Metric specifications: what to read from a sample and how to expose it.

use crate::path::{derived_metric_name, sanitize_metric_name};
use hdds_dynamic::PrimitiveKind;
use std::fmt;
use tracing::warn;

/// Prometheus metric kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MetricKind {
    Counter,
    #[default]
    Gauge,
    Histogram,
    Summary,
}

impl MetricKind {
    /// Parse a configured type name, case-insensitively.
    ///
    /// Unknown names log a warning and fall back to [`MetricKind::Gauge`].
    pub fn what_type(type_name: &str) -> Self {
        match type_name.to_ascii_lowercase().as_str() {
            "counter" => Self::Counter,
            "gauge" => Self::Gauge,
            "histogram" => Self::Histogram,
            "summary" => Self::Summary,
            _ => {
                warn!(
                    "'{}' does not match any metric type, using gauge instead",
                    type_name
                );
                Self::Gauge
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
            Self::Summary => "summary",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Insertion-ordered `name -> data path` map.
///
/// Used for key members and collection boundaries; order is root to leaf.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMap {
    entries: Vec<(String, String)>,
}

impl PathMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `name -> path` and return the name it was stored under.
    ///
    /// Re-inserting an identical entry is a no-op. A name already bound to a
    /// different path is disambiguated as `name_2`, `name_3`, ...
    pub fn insert(&mut self, name: &str, path: &str) -> String {
        let mut candidate = name.to_string();
        let mut suffix = 1;
        loop {
            match self.get(&candidate) {
                None => break,
                Some(existing) if existing == path => return candidate,
                Some(_) => {
                    suffix += 1;
                    candidate = format!("{}_{}", name, suffix);
                }
            }
        }
        self.entries.push((candidate.clone(), path.to_string()));
        candidate
    }

    /// Append `name -> path` even if the same pair is already present.
    ///
    /// Collection boundaries use this: a sequence of sequences has two
    /// boundaries at the same path.
    pub fn push(&mut self, name: &str, path: &str) -> String {
        let mut candidate = name.to_string();
        let mut suffix = 1;
        while self.get(&candidate).is_some() {
            suffix += 1;
            candidate = format!("{}_{}", name, suffix);
        }
        self.entries.push((candidate.clone(), path.to_string()));
        candidate
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p.as_str())
    }

    /// True if some entry maps to `path`.
    pub fn contains_path(&self, path: &str) -> bool {
        self.entries.iter().any(|(_, p)| p == path)
    }

    /// Entry that was inserted first.
    pub fn first(&self) -> Option<(&str, &str)> {
        self.entries
            .first()
            .map(|(n, p)| (n.as_str(), p.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, p)| (n.as_str(), p.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keep entries for which `f(name, path)` holds.
    pub fn retain(&mut self, mut f: impl FnMut(&str, &str) -> bool) {
        self.entries.retain(|(n, p)| f(n, p));
    }

    /// Rewrite every path, dropping entries for which `f` returns `None`.
    pub fn filter_map_paths(&self, mut f: impl FnMut(&str) -> Option<String>) -> PathMap {
        PathMap {
            entries: self
                .entries
                .iter()
                .filter_map(|(n, p)| f(p).map(|p| (n.clone(), p)))
                .collect(),
        }
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for PathMap {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        let mut map = PathMap::new();
        for (name, path) in iter {
            map.insert(name, path);
        }
        map
    }
}

/// How a spec gets its exposed name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecName {
    /// Name given in the configuration, used verbatim.
    Explicit(String),
    /// Name derived from the data path, qualified with the sample type name.
    Derived,
}

/// One configured (or discovered) metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSpec {
    pub name: SpecName,
    pub help: String,
    pub kind: MetricKind,
    /// Dotted path from the sample root to the scalar.
    pub data_path: String,
    /// Resolved scalar kind; `None` until bound to a schema.
    pub data_type: Option<PrimitiveKind>,
    /// Key members that become identifying labels.
    pub key_map: PathMap,
    /// Collection boundaries crossed on the way to the scalar.
    pub collection_map: PathMap,
}

impl MetricSpec {
    pub fn new(
        name: SpecName,
        help: impl Into<String>,
        kind: MetricKind,
        data_path: impl Into<String>,
    ) -> Self {
        Self {
            name,
            help: help.into(),
            kind,
            data_path: data_path.into(),
            data_type: None,
            key_map: PathMap::new(),
            collection_map: PathMap::new(),
        }
    }

    /// Exposed metric name once the sample type is known.
    pub fn final_name(&self, type_name: &str) -> String {
        match &self.name {
            SpecName::Explicit(name) => name.clone(),
            SpecName::Derived => {
                let type_name = sanitize_metric_name(type_name);
                let derived = derived_metric_name(&self.data_path);
                match (type_name.is_empty(), derived.is_empty()) {
                    (true, _) => derived,
                    (false, true) => type_name,
                    (false, false) => format!("{}_{}", type_name, derived),
                }
            }
        }
    }
}
