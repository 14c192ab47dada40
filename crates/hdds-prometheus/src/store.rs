// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Mapping configuration store.
//!
//! Specs live in an arena addressed by [`SpecId`]. The name index is only
//! meaningful once the sample type is known: [`SpecStore::finalize`] and
//! [`SpecStore::populate_auto`] rebuild it keyed by final metric names.

use crate::auto_map::auto_map;
use crate::config::MapperConfig;
use crate::resolver::resolve;
use crate::spec::MetricSpec;
use hdds_dynamic::TypeDescriptor;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Stable identifier of a spec inside a [`SpecStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecId(usize);

impl SpecId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Owning table of metric specs.
#[derive(Debug, Default)]
pub struct SpecStore {
    arena: Vec<MetricSpec>,
    by_name: BTreeMap<String, SpecId>,
    type_name: Option<String>,
}

impl SpecStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding the declared metrics of `config`, unresolved.
    pub fn from_config(config: &MapperConfig) -> Self {
        let mut store = Self::new();
        for spec in config.declared_specs() {
            store.insert(spec);
        }
        store
    }

    /// Add a spec to the arena. It is indexed on the next finalization.
    pub fn insert(&mut self, spec: MetricSpec) -> SpecId {
        let id = SpecId(self.arena.len());
        self.arena.push(spec);
        id
    }

    /// Bind declared specs to `root`: resolve paths and index by final name.
    pub fn finalize(&mut self, root: &Arc<TypeDescriptor>) {
        for spec in &mut self.arena {
            let resolution = resolve(root, &spec.data_path);
            spec.key_map = resolution.key_map.clone();
            spec.collection_map = resolution.collection_map.clone();
            spec.data_type = resolution.scalar_kind();
            if spec.data_type.is_none() {
                warn!(
                    "data_path '{}' does not lead to a scalar in type '{}'",
                    spec.data_path, root.name
                );
            }
        }
        self.rebuild_index(&root.name);
    }

    /// Replace the contents with auto-discovered specs for `root`.
    pub fn populate_auto(&mut self, root: &Arc<TypeDescriptor>, ignore: &[String]) {
        self.arena = auto_map(root, ignore);
        self.rebuild_index(&root.name);
        info!(
            "Auto-mapped {} metric(s) from type '{}'",
            self.by_name.len(),
            root.name
        );
    }

    fn rebuild_index(&mut self, type_name: &str) {
        self.by_name.clear();
        for (index, spec) in self.arena.iter().enumerate() {
            let name = spec.final_name(type_name);
            if self.by_name.contains_key(&name) {
                warn!(
                    "Metric name '{}' already used, spec for '{}' skipped",
                    name, spec.data_path
                );
                continue;
            }
            debug!("[store] {} <- {}", name, spec.data_path);
            self.by_name.insert(name, SpecId(index));
        }
        self.type_name = Some(type_name.to_string());
    }

    /// Type the store was bound to.
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn is_bound(&self) -> bool {
        self.type_name.is_some()
    }

    pub fn get(&self, name: &str) -> Option<&MetricSpec> {
        self.by_name.get(name).map(|id| &self.arena[id.0])
    }

    pub fn get_by_id(&self, id: SpecId) -> Option<&MetricSpec> {
        self.arena.get(id.0)
    }

    pub fn id_of(&self, name: &str) -> Option<SpecId> {
        self.by_name.get(name).copied()
    }

    /// Indexed specs by final name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricSpec)> {
        self.by_name
            .iter()
            .map(|(name, id)| (name.as_str(), &self.arena[id.0]))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    /// Number of indexed specs.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Every spec in the arena, indexed or not.
    pub fn pending(&self) -> &[MetricSpec] {
        &self.arena
    }
}
