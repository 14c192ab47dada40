// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Mapping configuration.
//!
//! ```yaml
//! instance_info: [id, location.zone]
//! ignore: [secret]
//! enable_auto_map: false
//! use_key_hash_label: false
//! metrics:
//!   temperature:
//!     data_path: readings.temperature
//!     type: gauge
//!     description: Last temperature reading
//! ```

use crate::path::trim_separator;
use crate::spec::{MetricKind, MetricSpec, SpecName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Per-mapper configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapperConfig {
    /// Paths whose values label the `instance_info` series of a new instance.
    #[serde(default)]
    pub instance_info: Vec<String>,

    /// Path substrings excluded from auto-discovery.
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Discover every mappable leaf instead of using `metrics`.
    #[serde(default = "default_true")]
    pub enable_auto_map: bool,

    /// Add the instance handle as `Instance_ID` to every series.
    #[serde(default)]
    pub use_key_hash_label: bool,

    /// Declared metrics, by entry name.
    #[serde(default)]
    pub metrics: BTreeMap<String, MetricEntry>,
}

/// One declared metric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricEntry {
    /// Dotted path from the sample root.
    pub data_path: String,

    /// Exposed name. Derived from the type and path when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// counter | gauge | histogram | summary (case-insensitive, default gauge).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub metric_type: Option<String>,

    /// Help text.
    pub description: String,
}

fn default_true() -> bool {
    true
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            instance_info: Vec::new(),
            ignore: Vec::new(),
            enable_auto_map: true,
            use_key_hash_label: false,
            metrics: BTreeMap::new(),
        }
    }
}

impl MapperConfig {
    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yaml::from_str(yaml)?;
        config.sanitize();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Drop empty ignore entries and trailing separators in data paths.
    pub fn sanitize(&mut self) {
        let before = self.ignore.len();
        self.ignore.retain(|entry| !entry.is_empty());
        if self.ignore.len() != before {
            warn!("Empty ignore entries dropped (they would match every path)");
        }
        for entry in self.metrics.values_mut() {
            let trimmed = trim_separator(&entry.data_path);
            if trimmed.len() != entry.data_path.len() {
                entry.data_path = trimmed.to_string();
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (entry_name, entry) in &self.metrics {
            if entry.data_path.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Metric '{}' has empty data_path",
                    entry_name
                )));
            }
            if entry.description.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Metric '{}' has empty description",
                    entry_name
                )));
            }
            if entry.name.as_deref().is_some_and(str::is_empty) {
                return Err(ConfigError::Invalid(format!(
                    "Metric '{}' has empty name",
                    entry_name
                )));
            }
        }
        for path in &self.instance_info {
            if path.is_empty() {
                return Err(ConfigError::Invalid("Empty instance_info path".into()));
            }
        }
        Ok(())
    }

    /// Declared metrics as unresolved specs.
    pub fn declared_specs(&self) -> Vec<MetricSpec> {
        self.metrics
            .values()
            .map(|entry| {
                let name = match &entry.name {
                    Some(name) => SpecName::Explicit(name.clone()),
                    None => SpecName::Derived,
                };
                let kind = entry
                    .metric_type
                    .as_deref()
                    .map(MetricKind::what_type)
                    .unwrap_or_default();
                MetricSpec::new(name, entry.description.clone(), kind, entry.data_path.clone())
            })
            .collect()
    }

    /// Sample configuration written by `gen-config`.
    pub fn example() -> Self {
        let mut metrics = BTreeMap::new();
        metrics.insert(
            "pushed_samples".to_string(),
            MetricEntry {
                data_path: "datawriter_protocol_status.pushed_sample_count".into(),
                name: Some("pushed_sample_count".into()),
                metric_type: Some("counter".into()),
                description: "Samples pushed by the writer".into(),
            },
        );
        metrics.insert(
            "latency".to_string(),
            MetricEntry {
                data_path: "latency.publication_period_metrics.mean".into(),
                name: None,
                metric_type: Some("summary".into()),
                description: "Publication latency mean".into(),
            },
        );
        Self {
            instance_info: vec!["datawriter_key".into(), "topic_name".into()],
            ignore: vec!["reserved".into()],
            enable_auto_map: false,
            use_key_hash_label: false,
            metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL_YAML: &str = r#"
instance_info: [id]
ignore: [secret, ""]
enable_auto_map: false
use_key_hash_label: true
metrics:
  temp:
    data_path: readings.temperature.
    type: Counter
    description: Temperature
  named:
    data_path: load
    name: cpu_load
    description: CPU load
  odd:
    data_path: odd
    type: coounter
    description: Typo in type
"#;

    #[test]
    fn test_defaults() {
        let config = MapperConfig::from_yaml("{}").expect("parse");
        assert!(config.enable_auto_map);
        assert!(!config.use_key_hash_label);
        assert!(config.metrics.is_empty());
        assert_eq!(config, MapperConfig::default());
    }

    #[test]
    fn test_full_config() {
        let config = MapperConfig::from_yaml(FULL_YAML).expect("parse");
        assert_eq!(config.instance_info, vec!["id"]);
        assert_eq!(config.ignore, vec!["secret"]);
        assert!(!config.enable_auto_map);
        assert!(config.use_key_hash_label);
        assert_eq!(config.metrics["temp"].data_path, "readings.temperature");

        let specs = config.declared_specs();
        assert_eq!(specs.len(), 3);
        // BTreeMap order: named, odd, temp
        assert_eq!(specs[0].name, SpecName::Explicit("cpu_load".into()));
        assert_eq!(specs[0].kind, MetricKind::Gauge);
        assert_eq!(specs[1].kind, MetricKind::Gauge);
        assert_eq!(specs[2].name, SpecName::Derived);
        assert_eq!(specs[2].kind, MetricKind::Counter);
        assert!(specs.iter().all(|s| s.data_type.is_none()));
    }

    #[test]
    fn test_trailing_underscore_in_member_name_is_kept() {
        let yaml = "metrics:\n  v:\n    data_path: stats.value_\n    description: V\n";
        let config = MapperConfig::from_yaml(yaml).expect("parse");
        assert_eq!(config.metrics["v"].data_path, "stats.value_");

        let yaml = "metrics:\n  v:\n    data_path: stats.value_.\n    description: V\n";
        let config = MapperConfig::from_yaml(yaml).expect("parse");
        assert_eq!(config.metrics["v"].data_path, "stats.value_");
    }

    #[test]
    fn test_missing_description_is_an_error() {
        let yaml = "metrics:\n  x:\n    data_path: a\n";
        assert!(matches!(
            MapperConfig::from_yaml(yaml),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_empty_values_rejected() {
        let yaml = "metrics:\n  x:\n    data_path: a\n    description: ''\n";
        assert!(matches!(
            MapperConfig::from_yaml(yaml),
            Err(ConfigError::Invalid(_))
        ));
        let yaml = "metrics:\n  x:\n    data_path: ''\n    description: d\n";
        assert!(matches!(
            MapperConfig::from_yaml(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_example_roundtrips_through_file() {
        let yaml = MapperConfig::example().to_yaml().expect("serialize");
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(yaml.as_bytes()).expect("write");

        let loaded = MapperConfig::from_file(file.path()).expect("load");
        assert_eq!(loaded, MapperConfig::example());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            MapperConfig::from_file("/nonexistent/mapper.yaml"),
            Err(ConfigError::Io(_))
        ));
    }
}
