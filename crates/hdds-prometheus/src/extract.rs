// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Value and label extraction.
//!
//! A spec without collection boundaries yields one `(labels, value)` pair.
//! Otherwise the first boundary is expanded: keys outside it are resolved
//! once, every remaining path is peeled below the boundary, and each element
//! is extracted recursively and tagged with `{boundary}_index` (1-based).
//! Key labels are named after the key's full path from the sample root, so
//! a key name repeated inside a collection element stays distinct.

use crate::labels::LabelSet;
use crate::path::{append_index, append_member, normalize_label_key, strip_path_prefix};
use crate::spec::{MetricSpec, PathMap};
use hdds_dynamic::{DynamicDataError, DynamicDataRef, DynamicValue, FieldPath, TypeKind};
use thiserror::Error;
use tracing::debug;

/// One extracted series sample.
pub type Observation = (LabelSet, f64);

/// Failure to read a metric value at the sample root.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractError {
    #[error("cannot read '{path}': {source}")]
    Value {
        path: String,
        #[source]
        source: DynamicDataError,
    },
}

/// Extract every observation `spec` describes from `view`.
///
/// Misses below a collection boundary discard that collection and yield an
/// empty result; a miss at the root is an error.
pub fn extract(
    view: &DynamicDataRef<'_>,
    spec: &MetricSpec,
) -> Result<Vec<Observation>, ExtractError> {
    let level = Level {
        prefix: String::new(),
        data_path: spec.data_path.clone(),
        key_map: spec.key_map.clone(),
        collection_map: spec.collection_map.clone(),
    };
    if level.collection_map.is_empty() {
        return level.scalar(view).map(|pair| vec![pair]);
    }
    match level.expand(view) {
        Ok(pairs) => Ok(pairs),
        Err(err) => {
            debug!("[extract] '{}' dropped: {}", spec.data_path, err);
            Ok(Vec::new())
        }
    }
}

/// Paths relative to the value being extracted.
#[derive(Debug, Clone)]
struct Level {
    /// Path of the current value from the sample root, without indices.
    prefix: String,
    data_path: String,
    key_map: PathMap,
    collection_map: PathMap,
}

impl Level {
    fn scalar(&self, view: &DynamicDataRef<'_>) -> Result<Observation, ExtractError> {
        let value = read_value(view, &self.data_path).map_err(|source| ExtractError::Value {
            path: self.data_path.clone(),
            source,
        })?;
        let mut labels = LabelSet::new();
        for (_, path) in self.key_map.iter() {
            key_labels_under(view, &self.prefix, path, &mut labels);
        }
        Ok((labels, value))
    }

    fn expand(&self, view: &DynamicDataRef<'_>) -> Result<Vec<Observation>, DynamicDataError> {
        let Some((boundary_name, boundary)) = self.collection_map.first() else {
            return self
                .scalar(view)
                .map(|pair| vec![pair])
                .map_err(|ExtractError::Value { source, .. }| source);
        };

        let mut outer = LabelSet::new();
        for (_, path) in self.key_map.iter() {
            if strip_path_prefix(path, boundary).is_none() {
                key_labels_under(view, &self.prefix, path, &mut outer);
            }
        }

        let peel = |path: &str| strip_path_prefix(path, boundary).map(str::to_string);
        let mut collection_map = PathMap::new();
        for (name, path) in self.collection_map.iter().skip(1) {
            match peel(path) {
                Some(inner) => {
                    collection_map.push(name, &inner);
                }
                None => debug!("[extract] boundary '{}' outside '{}'", path, boundary),
            }
        }
        // A key that is the boundary itself is already labelled by the index.
        let key_map = self
            .key_map
            .filter_map_paths(|path| peel(path).filter(|inner| !inner.is_empty()));
        let inner = Level {
            prefix: if boundary.is_empty() {
                self.prefix.clone()
            } else {
                append_member(&self.prefix, boundary)
            },
            data_path: peel(&self.data_path).ok_or_else(|| {
                DynamicDataError::InvalidPath(format!(
                    "'{}' is not inside collection '{}'",
                    self.data_path, boundary
                ))
            })?,
            key_map,
            collection_map,
        };

        let list = view.lookup(&FieldPath::parse(boundary)?)?;
        let index_label = normalize_label_key(&format!("{}_index", boundary_name));
        let mut out = Vec::new();
        for index in 0..list.len()? {
            let element = list.element(index)?;
            for (mut labels, value) in inner.expand(&element)? {
                labels.extend(outer.iter().map(|(k, v)| (k.clone(), v.clone())));
                labels.insert(index_label.clone(), (index + 1).to_string());
                out.push((labels, value));
            }
        }
        Ok(out)
    }
}

fn read_value(view: &DynamicDataRef<'_>, data_path: &str) -> Result<f64, DynamicDataError> {
    view.lookup(&FieldPath::parse(data_path)?)?.to_f64()
}

/// Render the member at `path` into one or more labels.
///
/// Nested structs, collections and unions expand into indexed sub-paths.
pub(crate) fn key_labels(view: &DynamicDataRef<'_>, path: &str, labels: &mut LabelSet) {
    key_labels_under(view, "", path, labels);
}

/// Like [`key_labels`] for a `view` located at `prefix` below the sample root.
fn key_labels_under(
    view: &DynamicDataRef<'_>,
    prefix: &str,
    path: &str,
    labels: &mut LabelSet,
) {
    let target = match FieldPath::parse(path).and_then(|p| view.lookup(&p)) {
        Ok(target) => target,
        Err(err) => {
            debug!("[extract] key '{}' skipped: {}", path, err);
            return;
        }
    };
    render_key(&target, &append_member(prefix, path), labels);
}

fn render_key(view: &DynamicDataRef<'_>, path: &str, labels: &mut LabelSet) {
    if let Some(text) = scalar_text(view.value()) {
        labels.insert(normalize_label_key(path), text);
        return;
    }
    let Ok(resolved) = view.resolved_type() else {
        return;
    };
    match &resolved.kind {
        TypeKind::Struct(fields) => {
            for field in fields {
                if let Ok(member) = view.member(&field.name) {
                    render_key(&member, &append_member(path, &field.name), labels);
                }
            }
        }
        TypeKind::Sequence(_) | TypeKind::Array(_) => {
            let len = view.len().unwrap_or(0);
            for index in 0..len {
                if let Ok(element) = view.element(index) {
                    render_key(&element, &append_index(path, index), labels);
                }
            }
        }
        TypeKind::Union(_) => {
            if let Some((case, _)) = view.value().union_case() {
                if let Ok(member) = view.member(case) {
                    render_key(&member, &append_member(path, case), labels);
                }
            }
        }
        _ => {}
    }
}

/// Label text of a scalar value. Integers have no decimal point.
fn scalar_text(value: &DynamicValue) -> Option<String> {
    let text = match value {
        DynamicValue::Bool(v) => v.to_string(),
        DynamicValue::U8(v) => v.to_string(),
        DynamicValue::U16(v) => v.to_string(),
        DynamicValue::U32(v) => v.to_string(),
        DynamicValue::U64(v) => v.to_string(),
        DynamicValue::I8(v) => v.to_string(),
        DynamicValue::I16(v) => v.to_string(),
        DynamicValue::I32(v) => v.to_string(),
        DynamicValue::I64(v) => v.to_string(),
        DynamicValue::F32(v) => v.to_string(),
        DynamicValue::F64(v) | DynamicValue::LongDouble(v) => v.to_string(),
        DynamicValue::Char(c) => c.to_string(),
        DynamicValue::String(s) | DynamicValue::WString(s) => s.clone(),
        DynamicValue::Enum(_, name) => name.clone(),
        _ => return None,
    };
    Some(text)
}
