// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Auto-discovery: one metric per mappable primitive leaf of a type.
//!
//! Every recursive call receives its own copy of the accumulator, so sibling
//! branches never see each other's key or collection entries.

use crate::path::{append_member, last_segment};
use crate::resolver::{resolve, ROOT_COLLECTION_NAME};
use crate::spec::{MetricKind, MetricSpec, PathMap, SpecName};
use hdds_dynamic::{TypeDescriptor, TypeKind};
use std::sync::Arc;
use tracing::debug;

/// Recursion bound for self-referential schemas.
pub const MAX_DISCOVERY_DEPTH: usize = 32;

/// Type whose only exposed value is its publication-period mean.
pub const STATISTIC_VARIABLE_TYPE: &str = "StatisticVariable";

/// Sub-path of [`STATISTIC_VARIABLE_TYPE`] that is mapped.
pub const STATISTIC_VARIABLE_MEAN: &str = "publication_period_metrics.mean";

#[derive(Debug, Clone, Default)]
struct Accumulator {
    data_path: String,
    key_map: PathMap,
    collection_map: PathMap,
}

impl Accumulator {
    fn child(&self, member: &str) -> Self {
        let mut next = self.clone();
        next.data_path = append_member(&self.data_path, member);
        next
    }

    fn into_spec(self, type_name: &str, node: &TypeDescriptor, data_path: String) -> MetricSpec {
        let help = if data_path.is_empty() {
            format!("Auto-mapped from {}", type_name)
        } else {
            format!("Auto-mapped from {}.{}", type_name, data_path)
        };
        let mut spec = MetricSpec::new(SpecName::Derived, help, MetricKind::Gauge, data_path);
        spec.data_type = node.primitive_kind();
        spec.key_map = self.key_map;
        spec.collection_map = self.collection_map;
        spec
    }
}

/// Discover a spec for every mappable leaf of `root` not matched by `ignore`.
///
/// An ignore entry matches when it is a substring of the member path followed
/// by a separator (`"secret"` matches `secret_token`, `"id."` matches only a
/// member named `id`). Key members become labels, never metrics.
pub fn auto_map(root: &Arc<TypeDescriptor>, ignore: &[String]) -> Vec<MetricSpec> {
    let mut discovery = Discovery {
        type_name: &root.name,
        ignore,
        out: Vec::new(),
    };
    discovery.visit(root, Accumulator::default(), 0);
    discovery.out
}

struct Discovery<'a> {
    type_name: &'a str,
    ignore: &'a [String],
    out: Vec<MetricSpec>,
}

impl Discovery<'_> {
    fn is_ignored(&self, data_path: &str) -> bool {
        if data_path.is_empty() {
            return false;
        }
        let probe = format!("{}.", data_path);
        self.ignore
            .iter()
            .any(|entry| !entry.is_empty() && probe.contains(entry.as_str()))
    }

    fn visit(&mut self, node: &Arc<TypeDescriptor>, acc: Accumulator, depth: usize) {
        if depth > MAX_DISCOVERY_DEPTH {
            debug!(
                "[auto_map] depth limit reached at '{}', branch dropped",
                acc.data_path
            );
            return;
        }
        if self.is_ignored(&acc.data_path) {
            debug!("[auto_map] '{}' ignored", acc.data_path);
            return;
        }

        if let Some(kind) = node.primitive_kind() {
            if kind.is_mappable() {
                let path = acc.data_path.clone();
                self.out.push(acc.into_spec(self.type_name, node, path));
            }
            return;
        }

        if is_statistic_variable(&node.name) {
            self.statistic_variable(node, acc);
            return;
        }

        match &node.kind {
            TypeKind::Struct(fields) => {
                let mut level = acc;
                for key in fields.iter().filter(|f| f.key) {
                    level
                        .key_map
                        .insert(&key.name, &append_member(&level.data_path, &key.name));
                }
                for field in fields.iter().filter(|f| !f.key) {
                    self.visit(&field.type_desc, level.child(&field.name), depth + 1);
                }
            }
            TypeKind::Union(u) => {
                for case in &u.cases {
                    self.visit(&case.type_desc, acc.child(&case.name), depth + 1);
                }
            }
            TypeKind::Sequence(_) | TypeKind::Array(_) => {
                let mut next = acc;
                let name = if next.data_path.is_empty() {
                    ROOT_COLLECTION_NAME.to_string()
                } else {
                    last_segment(&next.data_path).to_string()
                };
                let path = next.data_path.clone();
                next.collection_map.push(&name, &path);
                if let Some(element) = node.element_type() {
                    self.visit(element, next, depth + 1);
                }
            }
            TypeKind::Alias(alias) => match alias.target() {
                Some(target) => self.visit(&target, acc, depth + 1),
                None => debug!("[auto_map] unbound alias '{}'", node.name),
            },
            TypeKind::Enum(_) | TypeKind::Primitive(_) => {}
        }
    }

    fn statistic_variable(&mut self, node: &Arc<TypeDescriptor>, acc: Accumulator) {
        let resolution = resolve(node, STATISTIC_VARIABLE_MEAN);
        let Some(kind) = resolution.scalar_kind().filter(|k| k.is_mappable()) else {
            debug!(
                "[auto_map] '{}' has no mappable {}",
                acc.data_path, STATISTIC_VARIABLE_MEAN
            );
            return;
        };
        let path = append_member(&acc.data_path, STATISTIC_VARIABLE_MEAN);
        let mut spec = acc.into_spec(self.type_name, node, path);
        spec.data_type = Some(kind);
        self.out.push(spec);
    }
}

fn is_statistic_variable(type_name: &str) -> bool {
    type_name.rsplit("::").next() == Some(STATISTIC_VARIABLE_TYPE)
}
