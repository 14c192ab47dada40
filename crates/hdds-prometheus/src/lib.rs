// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HDDS Prometheus bridge
//!
//! Projects fields of runtime-typed DDS samples onto Prometheus metrics.
//!
//! # Features
//!
//! - **Declarative mapping**: pick fields by dotted path, name and type them
//! - **Auto-mapping**: expose every numeric leaf of a type
//! - **Keys as labels**: key members label every series of an instance
//! - **Collections**: sequences and arrays expand into one series per element
//!   (`{member}_index` label, 1-based)
//! - **Failure tolerant**: a missing value exposes `0`, never aborts an update
//!
//! # Quick Start
//!
//! ```rust
//! use hdds_dynamic::{DynamicData, InstanceHandle, PrimitiveKind, SampleInfo,
//!     TypeDescriptorBuilder, ViewState};
//! use hdds_prometheus::{MapperConfig, MetricRegistry, MonitorProcessor};
//! use std::sync::Arc;
//!
//! let sensor = Arc::new(TypeDescriptorBuilder::new("Sensor")
//!     .key_field("id", PrimitiveKind::I32)
//!     .sequence_field("samples", PrimitiveKind::F64)
//!     .build());
//!
//! let registry = Arc::new(MetricRegistry::new());
//! let mut processor = MonitorProcessor::new(MapperConfig::default(), registry);
//! processor.on_input_enabled(sensor.clone());
//!
//! let mut data = DynamicData::new(&sensor);
//! data.set("id", 7i32).unwrap();
//! data.set("samples", vec![1.0f64, 2.0]).unwrap();
//! let info = SampleInfo::new(InstanceHandle::from_u64(1), ViewState::New);
//! processor.on_data_available(&[(data, info)]);
//!
//! let text = processor.exposition().unwrap();
//! assert!(text.contains(r#"Sensor_samples{id="7",samples_index="2"} 2"#));
//! ```
//!
//! # Configuration File
//!
//! ```yaml
//! instance_info: [id]
//! enable_auto_map: false
//! metrics:
//!   samples:
//!     data_path: samples
//!     type: gauge
//!     description: Raw samples
//! ```

pub mod auto_map;
pub mod config;
pub mod extract;
pub mod labels;
pub mod mapper;
pub mod path;
pub mod processor;
pub mod registry;
pub mod replay;
pub mod resolver;
pub mod spec;
pub mod store;

pub use auto_map::auto_map;
pub use config::{ConfigError, MapperConfig, MetricEntry};
pub use extract::{extract, ExtractError, Observation};
pub use labels::LabelSet;
pub use mapper::{Mapper, UpdateReport};
pub use processor::MonitorProcessor;
pub use registry::{FamilyHandle, MetricRegistry, RegistryError};
pub use resolver::{resolve, Resolution};
pub use spec::{MetricKind, MetricSpec, PathMap, SpecName};
pub use store::{SpecId, SpecStore};
