// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type resolver: walk a type descriptor along a data path.
//!
//! While walking, every key member of each struct level visited is recorded
//! (not only the member on the path), and every sequence/array crossed is
//! recorded as a collection boundary named after the member that holds it.
//! Collections do not consume a path segment: the segment that follows is
//! applied to the element type.

use crate::path::{append_member, last_segment, split_path};
use crate::spec::PathMap;
use hdds_dynamic::{PrimitiveKind, TypeDescriptor, TypeKind, MAX_ALIAS_DEPTH};
use std::sync::Arc;
use tracing::debug;

/// Boundary name used when the sample root itself is a collection.
pub const ROOT_COLLECTION_NAME: &str = "root";

/// Outcome of resolving one data path.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Node reached; `None` when the walk aborted.
    pub node: Option<Arc<TypeDescriptor>>,
    pub key_map: PathMap,
    pub collection_map: PathMap,
    /// True if every segment was consumed.
    pub complete: bool,
}

impl Resolution {
    /// Primitive kind of the resolved node, if the walk completed on a primitive.
    pub fn scalar_kind(&self) -> Option<PrimitiveKind> {
        if !self.complete {
            return None;
        }
        self.node.as_ref()?.primitive_kind()
    }
}

/// Resolve `data_path` against `root`.
///
/// Misses are silent: the returned resolution is incomplete and keeps the
/// key/collection entries gathered before the miss.
pub fn resolve(root: &Arc<TypeDescriptor>, data_path: &str) -> Resolution {
    let segments = split_path(data_path);
    let mut out = Resolution::default();
    let mut current = Arc::clone(root);
    let mut prefix = String::new();
    let mut index = 0;
    // Steps taken without consuming a segment (aliases, collections).
    let mut idle_steps = 0;

    loop {
        if idle_steps > MAX_ALIAS_DEPTH {
            debug!(
                "[resolver] '{}' loops through aliases/collections at '{}', giving up",
                data_path, prefix
            );
            return out;
        }

        if let TypeKind::Alias(alias) = &current.kind {
            let Some(target) = alias.target() else {
                debug!("[resolver] unbound alias '{}' in '{}'", current.name, data_path);
                return out;
            };
            current = target;
            idle_steps += 1;
            continue;
        }

        if current.is_collection() {
            let name = if prefix.is_empty() {
                ROOT_COLLECTION_NAME
            } else {
                last_segment(&prefix)
            };
            out.collection_map.push(name, &prefix);
            if let Some(element) = current.element_type() {
                current = Arc::clone(element);
            }
            idle_steps += 1;
            continue;
        }

        let Some(segment) = segments.get(index).copied() else {
            break;
        };

        let next = match &current.kind {
            TypeKind::Struct(_) => {
                for key in current.key_fields() {
                    out.key_map
                        .insert(&key.name, &append_member(&prefix, &key.name));
                }
                current.field(segment).map(|f| Arc::clone(&f.type_desc))
            }
            TypeKind::Union(_) => current.union_case(segment).map(|c| Arc::clone(&c.type_desc)),
            _ => None,
        };
        let Some(next) = next else {
            debug!(
                "[resolver] segment '{}' of '{}' not found in type '{}'",
                segment, data_path, current.name
            );
            return out;
        };

        prefix = append_member(&prefix, segment);
        current = next;
        index += 1;
        idle_steps = 0;
    }

    out.node = Some(current);
    out.complete = true;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdds_dynamic::{AliasDescriptor, TypeDescriptorBuilder, UnionBuilder};

    fn sensor_type() -> Arc<TypeDescriptor> {
        let sample = Arc::new(
            TypeDescriptorBuilder::new("Sample")
                .key_field("channel", PrimitiveKind::U16)
                .field("value", PrimitiveKind::F64)
                .build(),
        );
        let reading = Arc::new(
            UnionBuilder::new("Reading", PrimitiveKind::I32)
                .case("count", 1, PrimitiveKind::U32)
                .case("ratio", 2, PrimitiveKind::F64)
                .build(),
        );
        let meters = Arc::new(TypeDescriptor::alias(
            "Meters",
            Arc::new(TypeDescriptor::primitive("float64", PrimitiveKind::F64)),
        ));
        Arc::new(
            TypeDescriptorBuilder::new("Sensor")
                .key_field("id", PrimitiveKind::I32)
                .key_field("zone", PrimitiveKind::U32)
                .sequence_field("raw", PrimitiveKind::F64)
                .sequence_of_type("samples", sample)
                .field_with_type("reading", reading)
                .field_with_type("altitude", meters)
                .build(),
        )
    }

    #[test]
    fn test_records_all_keys_of_visited_level() {
        let res = resolve(&sensor_type(), "altitude");
        assert!(res.complete);
        assert_eq!(res.scalar_kind(), Some(PrimitiveKind::F64));
        let keys: Vec<_> = res.key_map.iter().collect();
        assert_eq!(keys, vec![("id", "id"), ("zone", "zone")]);
        assert!(res.collection_map.is_empty());
    }

    #[test]
    fn test_collection_boundary_then_element_member() {
        let res = resolve(&sensor_type(), "samples.value");
        assert_eq!(res.scalar_kind(), Some(PrimitiveKind::F64));
        assert_eq!(res.collection_map.iter().collect::<Vec<_>>(), vec![("samples", "samples")]);
        // Keys of the element struct are recorded with their full path.
        assert_eq!(res.key_map.get("channel"), Some("samples.channel"));
    }

    #[test]
    fn test_trailing_collection_is_recorded() {
        let res = resolve(&sensor_type(), "raw");
        assert!(res.complete);
        assert_eq!(res.scalar_kind(), Some(PrimitiveKind::F64));
        assert_eq!(res.collection_map.get("raw"), Some("raw"));
    }

    #[test]
    fn test_union_case() {
        let res = resolve(&sensor_type(), "reading.ratio");
        assert_eq!(res.scalar_kind(), Some(PrimitiveKind::F64));
        assert!(res.collection_map.is_empty());
    }

    #[test]
    fn test_missing_segment_is_silent_partial() {
        let res = resolve(&sensor_type(), "samples.nope");
        assert!(!res.complete);
        assert!(res.node.is_none());
        assert_eq!(res.scalar_kind(), None);
        // Gathered before the miss.
        assert_eq!(res.collection_map.get("samples"), Some("samples"));
        assert_eq!(res.key_map.get("id"), Some("id"));
    }

    #[test]
    fn test_path_through_primitive_aborts() {
        let res = resolve(&sensor_type(), "altitude.extra");
        assert!(!res.complete);
    }

    #[test]
    fn test_alias_cycle_terminates() {
        let a = AliasDescriptor::forward();
        let b = AliasDescriptor::forward();
        let a_type = Arc::new(TypeDescriptor::new("A", TypeKind::Alias(a.clone())));
        let b_type = Arc::new(TypeDescriptor::new("B", TypeKind::Alias(b.clone())));
        a.bind(b_type);
        b.bind(a_type.clone());

        let root = Arc::new(
            TypeDescriptorBuilder::new("Loop")
                .field_with_type("looped", a_type)
                .build(),
        );
        let res = resolve(&root, "looped.x");
        assert!(!res.complete);
    }

    #[test]
    fn test_self_nested_collection_terminates() {
        // Alias whose target is a sequence of the alias itself.
        let fwd = AliasDescriptor::forward();
        let node = Arc::new(TypeDescriptor::new("Node", TypeKind::Alias(fwd.clone())));
        fwd.bind(Arc::new(TypeDescriptor::sequence_of(node.clone())));

        let res = resolve(&node, "");
        assert!(!res.complete);
    }

    #[test]
    fn test_sequence_of_sequence_records_both_levels() {
        let inner = Arc::new(TypeDescriptor::sequence_of(Arc::new(TypeDescriptor::primitive(
            "int32",
            PrimitiveKind::I32,
        ))));
        let root = Arc::new(
            TypeDescriptorBuilder::new("Grid")
                .sequence_of_type("rows", inner)
                .build(),
        );
        let res = resolve(&root, "rows");
        assert_eq!(res.scalar_kind(), Some(PrimitiveKind::I32));
        assert_eq!(
            res.collection_map.iter().collect::<Vec<_>>(),
            vec![("rows", "rows"), ("rows_2", "rows")]
        );
    }
}
