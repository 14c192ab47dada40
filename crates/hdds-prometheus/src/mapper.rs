// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Update driver: binds a configuration to a sample type and pushes every
//! sample into the registry.

use crate::config::MapperConfig;
use crate::extract::{extract, key_labels, Observation};
use crate::labels::{label_set, normalize_labels, LabelSet};
use crate::registry::{FamilyHandle, MetricRegistry};
use crate::store::SpecStore;
use crate::spec::MetricKind;
use hdds_dynamic::{DynamicData, SampleInfo, TypeDescriptor};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Counter of processed samples, one series per topic.
pub const CALLS_METRIC: &str = "call_on_data_available_total";
const CALLS_HELP: &str = "How many times this processor call on_data_available()";

/// Pseudo-metric labelled with the identity of each new instance.
pub const INSTANCE_INFO_METRIC: &str = "instance_info";
const INSTANCE_INFO_HELP: &str = "Contain human-readable about data instances";

/// Label carrying the instance handle.
pub const INSTANCE_ID_LABEL: &str = "Instance_ID";

/// Outcome of one [`Mapper::update_metrics`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Series updated successfully.
    pub pushed: usize,
    /// Specs whose extraction failed and got the `0.0` fallback.
    pub fallbacks: usize,
    /// Specs that produced no observation.
    pub skipped: usize,
    /// Series the registry refused.
    pub failed: usize,
}

impl UpdateReport {
    pub fn merge(&mut self, other: UpdateReport) {
        self.pushed += other.pushed;
        self.fallbacks += other.fallbacks;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Maps samples of one type to metrics.
#[derive(Debug)]
pub struct Mapper {
    config: MapperConfig,
    store: SpecStore,
    root: Option<Arc<TypeDescriptor>>,
    families: HashMap<String, FamilyHandle>,
    calls: FamilyHandle,
    instance_info: FamilyHandle,
    registered: bool,
}

impl Mapper {
    pub fn new(config: MapperConfig) -> Self {
        let store = if config.enable_auto_map {
            if !config.metrics.is_empty() {
                warn!(
                    "enable_auto_map is set, {} declared metric(s) ignored",
                    config.metrics.len()
                );
            }
            SpecStore::new()
        } else {
            SpecStore::from_config(&config)
        };
        Self {
            config,
            store,
            root: None,
            families: HashMap::new(),
            calls: FamilyHandle::None,
            instance_info: FamilyHandle::None,
            registered: false,
        }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn store(&self) -> &SpecStore {
        &self.store
    }

    /// Name of the bound type, used as topic label.
    pub fn type_name(&self) -> Option<&str> {
        self.root.as_deref().map(|root| root.name.as_str())
    }

    /// Finalize the specs against the sample type.
    ///
    /// Rebinding drops the families of the previous registration.
    pub fn bind_type(&mut self, root: Arc<TypeDescriptor>) {
        if self.config.enable_auto_map {
            self.store.populate_auto(&root, &self.config.ignore);
        } else {
            self.store.finalize(&root);
        }
        info!(
            "Mapper bound to '{}' with {} metric(s)",
            root.name,
            self.store.len()
        );
        self.root = Some(root);
        self.families.clear();
        self.calls = FamilyHandle::None;
        self.instance_info = FamilyHandle::None;
        self.registered = false;
    }

    /// Create the families of every spec plus the two built-in metrics.
    ///
    /// Returns the number of families available. Failures are logged and
    /// leave a [`FamilyHandle::None`] behind.
    pub fn register_metrics(&mut self, registry: &MetricRegistry) -> usize {
        let Some(topic) = self.type_name().map(str::to_string) else {
            warn!("register_metrics called before bind_type");
            return 0;
        };

        self.calls = create_or_none(
            registry,
            MetricKind::Counter,
            CALLS_METRIC,
            CALLS_HELP,
            &label_set([("Test", "on_data_available")]),
        );
        self.calls.add_series(&topic_labels(&topic));
        self.instance_info = create_or_none(
            registry,
            MetricKind::Gauge,
            INSTANCE_INFO_METRIC,
            INSTANCE_INFO_HELP,
            &LabelSet::new(),
        );

        self.families = self
            .store
            .iter()
            .map(|(name, spec)| {
                let handle =
                    create_or_none(registry, spec.kind, name, &spec.help, &LabelSet::new());
                (name.to_string(), handle)
            })
            .collect();
        self.registered = true;

        let live = self.families.values().filter(|h| !h.is_none()).count();
        info!(
            "Registered {}/{} metric(s) for '{}'",
            live,
            self.families.len(),
            topic
        );
        live
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Push one sample. Never fails; problems are counted in the report.
    pub fn update_metrics(&self, data: &DynamicData, info: &SampleInfo) -> UpdateReport {
        let mut report = UpdateReport::default();
        let Some(topic) = self.type_name().filter(|_| self.registered) else {
            warn!("update_metrics called before register_metrics, sample dropped");
            return report;
        };
        if data.type_name() != topic {
            debug!(
                "[mapper] sample of type '{}' pushed to mapper of '{}'",
                data.type_name(),
                topic
            );
        }

        self.calls.increment(&topic_labels(topic));

        if info.is_new_instance() {
            let labels = self.instance_labels(topic, data, info);
            if !self.instance_info.update(&labels, 1.0) {
                report.failed += 1;
            }
        }

        let view = data.view();
        let instance_id = info.instance_handle.to_string();
        for (name, spec) in self.store.iter() {
            let observations: Vec<Observation> = match extract(&view, spec) {
                Ok(pairs) if pairs.is_empty() => {
                    debug!("[mapper] '{}' has no value in this sample", name);
                    report.skipped += 1;
                    continue;
                }
                Ok(pairs) => pairs,
                Err(err) => {
                    debug!("[mapper] '{}' falls back to 0: {}", name, err);
                    report.fallbacks += 1;
                    vec![(LabelSet::new(), 0.0)]
                }
            };

            let Some(handle) = self.families.get(name) else {
                report.failed += observations.len();
                continue;
            };
            for (labels, value) in observations {
                let mut labels = if labels.is_empty() {
                    LabelSet::new()
                } else {
                    normalize_labels(labels)
                };
                if labels.is_empty() || self.config.use_key_hash_label {
                    labels.insert(INSTANCE_ID_LABEL.to_string(), instance_id.clone());
                }
                if handle.update(&labels, value) {
                    report.pushed += 1;
                } else {
                    report.failed += 1;
                }
            }
        }
        report
    }

    fn instance_labels(&self, topic: &str, data: &DynamicData, info: &SampleInfo) -> LabelSet {
        if self.config.instance_info.is_empty() {
            return label_set([("topic", topic), ("key", "0")]);
        }
        let view = data.view();
        let mut labels = LabelSet::new();
        for path in &self.config.instance_info {
            key_labels(&view, path, &mut labels);
        }
        labels.insert("key".to_string(), info.instance_handle.to_string());
        normalize_labels(labels)
    }
}

fn topic_labels(topic: &str) -> LabelSet {
    label_set([("topic", topic)])
}

fn create_or_none(
    registry: &MetricRegistry,
    kind: MetricKind,
    name: &str,
    help: &str,
    const_labels: &LabelSet,
) -> FamilyHandle {
    registry
        .create_family(kind, name, help, const_labels)
        .unwrap_or_else(|err| {
            warn!("Failed to create {} metric '{}': {}", kind, name, err);
            FamilyHandle::None
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdds_dynamic::{DynamicValue, InstanceHandle, PrimitiveKind, TypeDescriptorBuilder, ViewState};

    fn sensor_type() -> Arc<TypeDescriptor> {
        Arc::new(
            TypeDescriptorBuilder::new("Sensor")
                .key_field("id", PrimitiveKind::I32)
                .sequence_field("samples", PrimitiveKind::F64)
                .field("temperature", PrimitiveKind::F32)
                .build(),
        )
    }

    fn sensor_sample(id: i32, samples: Vec<f64>) -> DynamicData {
        let mut data = DynamicData::new(&sensor_type());
        data.set("id", id).expect("id");
        data.set("samples", samples).expect("samples");
        data.set("temperature", 20.0f32).expect("temperature");
        data
    }

    fn declared(yaml: &str) -> Mapper {
        let mut mapper = Mapper::new(MapperConfig::from_yaml(yaml).expect("config"));
        mapper.bind_type(sensor_type());
        mapper
    }

    #[test]
    fn test_update_before_register_is_dropped() {
        let mapper = declared("enable_auto_map: false\n");
        let info = SampleInfo::new(InstanceHandle::from_u64(1), ViewState::New);
        let report = mapper.update_metrics(&sensor_sample(1, vec![]), &info);
        assert_eq!(report, UpdateReport::default());
    }

    #[test]
    fn test_register_before_bind() {
        let mut mapper = Mapper::new(MapperConfig::default());
        assert_eq!(mapper.register_metrics(&MetricRegistry::new()), 0);
        assert!(!mapper.is_registered());
    }

    #[test]
    fn test_key_sequence_metric_is_pushed() {
        let hits = Arc::new(TypeDescriptor::sequence_of(Arc::new(TypeDescriptor::primitive(
            "uint32",
            PrimitiveKind::U32,
        ))));
        let root = Arc::new(
            TypeDescriptorBuilder::new("K")
                .key_field_with_type("hits", hits)
                .field("x", PrimitiveKind::I32)
                .build(),
        );
        let mut data = DynamicData::new(&root);
        data.set("hits", vec![5u32, 6]).expect("hits");

        let config = MapperConfig::from_yaml(
            "enable_auto_map: false\nmetrics:\n  hits:\n    data_path: hits\n    description: Hits\n",
        )
        .expect("config");
        let mut mapper = Mapper::new(config);
        mapper.bind_type(root);
        let registry = MetricRegistry::new();
        mapper.register_metrics(&registry);

        let info = SampleInfo::new(InstanceHandle::from_u64(1), ViewState::New);
        let report = mapper.update_metrics(&data, &info);
        assert_eq!(report.pushed, 2);
        assert_eq!(report.failed, 0);

        let family = registry.family("K_hits").expect("family");
        let first = label_set([("hits_index", "1")]);
        assert_eq!(family.family().and_then(|f| f.value(&first)), Some(5.0));
    }

    #[test]
    fn test_collection_metric_and_builtins() {
        let mut mapper = declared(
            r#"
enable_auto_map: false
metrics:
  samples:
    data_path: samples
    description: Samples
"#,
        );
        let registry = MetricRegistry::new();
        assert_eq!(mapper.register_metrics(&registry), 1);

        let info = SampleInfo::new(InstanceHandle::from_u64(1), ViewState::New);
        let report = mapper.update_metrics(&sensor_sample(7, vec![1.0, 2.0, 3.0]), &info);
        assert_eq!(report.pushed, 3);
        assert_eq!(report.fallbacks, 0);

        let family = registry.family("Sensor_samples").expect("family");
        let second = label_set([("id", "7"), ("samples_index", "2")]);
        assert_eq!(family.family().and_then(|f| f.value(&second)), Some(2.0));

        let calls = registry.family(CALLS_METRIC).expect("calls");
        assert_eq!(
            calls.family().and_then(|f| f.value(&topic_labels("Sensor"))),
            Some(1.0)
        );
        let placeholder = label_set([("topic", "Sensor"), ("key", "0")]);
        let instances = registry.family(INSTANCE_INFO_METRIC).expect("instance_info");
        assert_eq!(
            instances.family().and_then(|f| f.value(&placeholder)),
            Some(1.0)
        );
    }

    #[test]
    fn test_missing_value_falls_back_to_zero_with_instance_id() {
        let mut mapper = declared(
            r#"
enable_auto_map: false
metrics:
  pressure:
    data_path: pressure
    description: Not in the type
"#,
        );
        let registry = MetricRegistry::new();
        mapper.register_metrics(&registry);

        let handle = InstanceHandle::from_u64(0xab);
        let info = SampleInfo::new(handle, ViewState::NotNew);
        let report = mapper.update_metrics(&sensor_sample(1, vec![]), &info);
        assert_eq!(report.fallbacks, 1);
        assert_eq!(report.pushed, 1);

        let labels = label_set([(INSTANCE_ID_LABEL, handle.to_string())]);
        let family = registry.family("Sensor_pressure").expect("family");
        assert_eq!(family.family().and_then(|f| f.value(&labels)), Some(0.0));
    }

    #[test]
    fn test_empty_collection_is_skipped() {
        let mut mapper = declared(
            r#"
enable_auto_map: false
metrics:
  samples:
    data_path: samples
    description: Samples
"#,
        );
        mapper.register_metrics(&MetricRegistry::new());
        let info = SampleInfo::new(InstanceHandle::from_u64(1), ViewState::NotNew);
        let report = mapper.update_metrics(&sensor_sample(1, vec![]), &info);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.pushed, 0);
    }

    #[test]
    fn test_key_hash_label_and_instance_info() {
        let mut mapper = declared(
            r#"
instance_info: [id]
use_key_hash_label: true
ignore: [samples]
"#,
        );
        let registry = MetricRegistry::new();
        assert_eq!(mapper.register_metrics(&registry), 1);

        let handle = InstanceHandle::from_u64(5);
        let info = SampleInfo::new(handle, ViewState::New);
        let report = mapper.update_metrics(&sensor_sample(9, vec![1.0]), &info);
        assert_eq!(report.pushed, 1);

        let family = registry.family("Sensor_temperature").expect("family");
        let labels = label_set([("id", "9".to_string()), (INSTANCE_ID_LABEL, handle.to_string())]);
        assert_eq!(family.family().and_then(|f| f.value(&labels)), Some(20.0));

        let instances = registry.family(INSTANCE_INFO_METRIC).expect("instance_info");
        let identity = label_set([("id", "9".to_string()), ("key", handle.to_string())]);
        assert_eq!(instances.family().and_then(|f| f.value(&identity)), Some(1.0));
    }

    #[test]
    fn test_two_mappers_share_builtins() {
        let registry = MetricRegistry::new();
        let mut a = declared("ignore: [samples]\n");
        let other = Arc::new(
            TypeDescriptorBuilder::new("Other")
                .field("load", PrimitiveKind::F64)
                .build(),
        );
        let mut b = Mapper::new(MapperConfig::default());
        b.bind_type(other.clone());
        a.register_metrics(&registry);
        b.register_metrics(&registry);

        let mut data = DynamicData::new(&other);
        data.set("load", DynamicValue::F64(0.5)).expect("load");
        let info = SampleInfo::new(InstanceHandle::from_u64(2), ViewState::NotNew);
        b.update_metrics(&data, &info);

        let calls = registry.family(CALLS_METRIC).expect("calls");
        let calls = calls.family().expect("live");
        assert_eq!(calls.value(&topic_labels("Other")), Some(1.0));
        assert_eq!(calls.value(&topic_labels("Sensor")), Some(0.0));
    }
}
