// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Recorded samples replayed through a processor.
//!
//! ```json
//! [
//!   {"instance": 1, "data": {"id": 7, "samples": [1.0, 2.0]}},
//!   {"instance": 1, "valid": false}
//! ]
//! ```

use hdds_dynamic::json::data_from_json;
use hdds_dynamic::{DynamicData, DynamicDataError, InstanceHandle, SampleInfo, TypeDescriptor, ViewState};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Replay file errors.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Sample {index}: {source}")]
    Sample {
        index: usize,
        #[source]
        source: DynamicDataError,
    },
}

/// One recorded sample.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordedSample {
    /// Instance identity; becomes the instance handle.
    #[serde(default)]
    pub instance: u64,

    /// False for lifecycle-only samples.
    #[serde(default = "default_valid")]
    pub valid: bool,

    #[serde(default)]
    pub data: serde_json::Value,
}

fn default_valid() -> bool {
    true
}

/// Parse a JSON array of recorded samples.
pub fn load_samples<P: AsRef<Path>>(path: P) -> Result<Vec<RecordedSample>, ReplayError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Convert recorded samples into data plus metadata.
///
/// The first sample seen for an instance is [`ViewState::New`], the rest
/// [`ViewState::NotNew`]. Invalid samples carry default data.
pub fn to_samples(
    descriptor: &Arc<TypeDescriptor>,
    recorded: &[RecordedSample],
) -> Result<Vec<(DynamicData, SampleInfo)>, ReplayError> {
    let mut seen = HashSet::new();
    recorded
        .iter()
        .enumerate()
        .map(|(index, sample)| {
            let handle = InstanceHandle::from_u64(sample.instance);
            if !sample.valid {
                return Ok((DynamicData::new(descriptor), SampleInfo::invalid(handle)));
            }
            let data = data_from_json(descriptor, &sample.data)
                .map_err(|source| ReplayError::Sample { index, source })?;
            let view_state = if seen.insert(sample.instance) {
                ViewState::New
            } else {
                ViewState::NotNew
            };
            Ok((data, SampleInfo::new(handle, view_state)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdds_dynamic::{PrimitiveKind, TypeDescriptorBuilder};
    use std::io::Write;

    fn counter_type() -> Arc<TypeDescriptor> {
        Arc::new(
            TypeDescriptorBuilder::new("Counter")
                .key_field("id", PrimitiveKind::I32)
                .field("value", PrimitiveKind::U64)
                .build(),
        )
    }

    #[test]
    fn test_view_state_per_instance() {
        let recorded: Vec<RecordedSample> = serde_json::from_str(
            r#"[
                {"instance": 1, "data": {"id": 1, "value": 10}},
                {"instance": 2, "data": {"id": 2, "value": 20}},
                {"instance": 1, "data": {"id": 1, "value": 11}},
                {"instance": 1, "valid": false}
            ]"#,
        )
        .expect("json");

        let samples = to_samples(&counter_type(), &recorded).expect("samples");
        let states: Vec<_> = samples.iter().map(|(_, i)| i.view_state).collect();
        assert_eq!(
            states,
            vec![ViewState::New, ViewState::New, ViewState::NotNew, ViewState::NotNew]
        );
        assert!(!samples[3].1.valid_data);
        assert_eq!(samples[2].0.get::<u64>("value"), Ok(11));
    }

    #[test]
    fn test_bad_sample_reports_index() {
        let recorded: Vec<RecordedSample> =
            serde_json::from_str(r#"[{"data": {"id": 1, "value": 1}}, {"data": {"id": "x"}}]"#)
                .expect("json");
        assert!(matches!(
            to_samples(&counter_type(), &recorded),
            Err(ReplayError::Sample { index: 1, .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(br#"[{"instance": 3, "data": {"id": 3, "value": 1}}]"#)
            .expect("write");
        let recorded = load_samples(file.path()).expect("load");
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].instance, 3);
        assert!(recorded[0].valid);
    }
}
