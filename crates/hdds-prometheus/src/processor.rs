// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Processor glue: one mapper per input, fed with taken samples.

use crate::config::MapperConfig;
use crate::mapper::{Mapper, UpdateReport};
use crate::registry::{MetricRegistry, RegistryError};
use hdds_dynamic::{DynamicData, SampleInfo, TypeDescriptor};
use std::sync::Arc;
use tracing::{debug, info};

/// Feeds the samples of one input into a shared registry.
#[derive(Debug)]
pub struct MonitorProcessor {
    mapper: Mapper,
    registry: Arc<MetricRegistry>,
}

impl MonitorProcessor {
    pub fn new(config: MapperConfig, registry: Arc<MetricRegistry>) -> Self {
        Self {
            mapper: Mapper::new(config),
            registry,
        }
    }

    /// The input type is known: bind the mapper and register its metrics.
    pub fn on_input_enabled(&mut self, input_type: Arc<TypeDescriptor>) {
        let name = input_type.name.clone();
        self.mapper.bind_type(input_type);
        let registered = self.mapper.register_metrics(&self.registry);
        info!("Input '{}' enabled, {} metric(s) exposed", name, registered);
    }

    /// Push every sample carrying data. Lifecycle-only samples are skipped.
    pub fn on_data_available(&self, samples: &[(DynamicData, SampleInfo)]) -> UpdateReport {
        let mut report = UpdateReport::default();
        for (data, sample_info) in samples {
            if !sample_info.valid_data {
                debug!(
                    "[processor] invalid sample for instance {} skipped",
                    sample_info.instance_handle
                );
                continue;
            }
            report.merge(self.mapper.update_metrics(data, sample_info));
        }
        report
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn registry(&self) -> &Arc<MetricRegistry> {
        &self.registry
    }

    /// Text exposition of the shared registry.
    pub fn exposition(&self) -> Result<String, RegistryError> {
        self.registry.render()
    }
}
