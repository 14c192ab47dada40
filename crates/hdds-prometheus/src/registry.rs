// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Metric registry adapter.
//!
//! The label set of a mapped metric is only known per sample, so families are
//! custom collectors that accept any label set per series rather than
//! `*Vec` metrics with fixed label names.

use crate::labels::{is_valid_label_name, LabelSet};
use crate::spec::MetricKind;
use parking_lot::Mutex;
use prometheus::core::{Collector, Desc};
use prometheus::proto;
use prometheus::{Encoder, Registry, TextEncoder};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Fixed histogram bucket upper bounds (`+Inf` is implicit).
pub const HISTOGRAM_BUCKETS: [f64; 3] = [0.0, 1.0, 2.0];

/// Fixed summary quantiles.
pub const SUMMARY_QUANTILES: [f64; 3] = [0.5, 0.7, 0.9];

/// Observations kept per summary series.
pub const SUMMARY_WINDOW: usize = 512;

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("Metric '{name}' already registered as {existing}, requested {requested}")]
    KindConflict {
        name: String,
        existing: MetricKind,
        requested: MetricKind,
    },

    #[error("Invalid label name '{0}'")]
    InvalidLabel(String),

    #[error("Exposition is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Clone)]
enum SeriesState {
    Scalar(f64),
    Histogram {
        /// Non-cumulative count per bucket of [`HISTOGRAM_BUCKETS`].
        buckets: [u64; HISTOGRAM_BUCKETS.len()],
        sum: f64,
        count: u64,
    },
    Summary {
        window: VecDeque<f64>,
        sum: f64,
        count: u64,
    },
}

impl SeriesState {
    fn new(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Counter | MetricKind::Gauge => Self::Scalar(0.0),
            MetricKind::Histogram => Self::Histogram {
                buckets: [0; HISTOGRAM_BUCKETS.len()],
                sum: 0.0,
                count: 0,
            },
            MetricKind::Summary => Self::Summary {
                window: VecDeque::with_capacity(SUMMARY_WINDOW),
                sum: 0.0,
                count: 0,
            },
        }
    }

    fn observe(&mut self, value: f64) {
        match self {
            Self::Scalar(current) => *current = value,
            Self::Histogram {
                buckets,
                sum,
                count,
            } => {
                if let Some(slot) = HISTOGRAM_BUCKETS.iter().position(|bound| value <= *bound) {
                    buckets[slot] += 1;
                }
                *sum += value;
                *count += 1;
            }
            Self::Summary { window, sum, count } => {
                if window.len() == SUMMARY_WINDOW {
                    window.pop_front();
                }
                window.push_back(value);
                *sum += value;
                *count += 1;
            }
        }
    }
}

/// One metric family: name, help, kind and its series.
#[derive(Debug)]
pub struct DynamicFamily {
    name: String,
    help: String,
    kind: MetricKind,
    const_labels: LabelSet,
    desc: Desc,
    series: Mutex<BTreeMap<LabelSet, SeriesState>>,
}

impl DynamicFamily {
    fn new(
        kind: MetricKind,
        name: &str,
        help: &str,
        const_labels: &LabelSet,
    ) -> Result<Self, RegistryError> {
        // Empty help is rejected by `Desc`.
        let help = if help.trim().is_empty() { name } else { help };
        let desc = Desc::new(
            name.to_string(),
            help.to_string(),
            Vec::new(),
            const_labels
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<HashMap<_, _>>(),
        )?;
        Ok(Self {
            name: name.to_string(),
            help: help.to_string(),
            kind,
            const_labels: const_labels.clone(),
            desc,
            series: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Number of series.
    pub fn len(&self) -> usize {
        self.series.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.lock().is_empty()
    }

    /// Current scalar value of a counter/gauge series.
    pub fn value(&self, labels: &LabelSet) -> Option<f64> {
        match self.series.lock().get(labels)? {
            SeriesState::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    /// Number of observations of a histogram/summary series.
    pub fn sample_count(&self, labels: &LabelSet) -> Option<u64> {
        match self.series.lock().get(labels)? {
            SeriesState::Histogram { count, .. } | SeriesState::Summary { count, .. } => {
                Some(*count)
            }
            SeriesState::Scalar(_) => None,
        }
    }

    fn check_labels(&self, labels: &LabelSet) -> Result<(), RegistryError> {
        for key in labels.keys() {
            let reserved = match self.kind {
                MetricKind::Histogram => key == "le",
                MetricKind::Summary => key == "quantile",
                _ => false,
            };
            if reserved || !is_valid_label_name(key) || self.const_labels.contains_key(key) {
                return Err(RegistryError::InvalidLabel(key.clone()));
            }
        }
        Ok(())
    }

    fn with_series(&self, labels: &LabelSet, f: impl FnOnce(&mut SeriesState)) -> bool {
        if let Err(err) = self.check_labels(labels) {
            warn!("{}: {}", self.name, err);
            return false;
        }
        let mut series = self.series.lock();
        let state = series
            .entry(labels.clone())
            .or_insert_with(|| SeriesState::new(self.kind));
        f(state);
        true
    }

    fn add_series(&self, labels: &LabelSet) -> bool {
        self.with_series(labels, |_| {})
    }

    fn update(&self, labels: &LabelSet, value: f64) -> bool {
        if self.kind == MetricKind::Counter && (value < 0.0 || value.is_nan()) {
            warn!("{}: counter cannot be set to {}", self.name, value);
            return false;
        }
        self.with_series(labels, |state| state.observe(value))
    }

    fn increment(&self, labels: &LabelSet) -> bool {
        self.with_series(labels, |state| match state {
            SeriesState::Scalar(v) => *v += 1.0,
            other => other.observe(1.0),
        })
    }

    fn encode(&self) -> Option<proto::MetricFamily> {
        let series = self.series.lock();
        // The text encoder rejects families without metrics.
        if series.is_empty() {
            return None;
        }

        let mut family = proto::MetricFamily::default();
        family.set_name(self.name.clone());
        family.set_help(self.help.clone());
        family.set_field_type(match self.kind {
            MetricKind::Counter => proto::MetricType::COUNTER,
            MetricKind::Gauge => proto::MetricType::GAUGE,
            MetricKind::Histogram => proto::MetricType::HISTOGRAM,
            MetricKind::Summary => proto::MetricType::SUMMARY,
        });

        for (labels, state) in series.iter() {
            let mut metric = proto::Metric::default();
            let merged = self
                .const_labels
                .iter()
                .chain(labels.iter())
                .collect::<BTreeMap<_, _>>();
            for (name, value) in merged {
                let mut pair = proto::LabelPair::default();
                pair.set_name(name.clone());
                pair.set_value(value.clone());
                metric.mut_label().push(pair);
            }
            encode_state(self.kind, state, &mut metric);
            family.mut_metric().push(metric);
        }
        Some(family)
    }
}

fn encode_state(kind: MetricKind, state: &SeriesState, metric: &mut proto::Metric) {
    match state {
        SeriesState::Scalar(value) => {
            if kind == MetricKind::Counter {
                let mut counter = proto::Counter::default();
                counter.set_value(*value);
                metric.set_counter(counter);
            } else {
                let mut gauge = proto::Gauge::default();
                gauge.set_value(*value);
                metric.set_gauge(gauge);
            }
        }
        SeriesState::Histogram {
            buckets,
            sum,
            count,
        } => {
            let mut histogram = proto::Histogram::default();
            histogram.set_sample_count(*count);
            histogram.set_sample_sum(*sum);
            let mut cumulative = 0;
            for (bound, hits) in HISTOGRAM_BUCKETS.iter().zip(buckets.iter()) {
                cumulative += hits;
                let mut bucket = proto::Bucket::default();
                bucket.set_upper_bound(*bound);
                bucket.set_cumulative_count(cumulative);
                histogram.mut_bucket().push(bucket);
            }
            metric.set_histogram(histogram);
        }
        SeriesState::Summary { window, sum, count } => {
            let mut summary = proto::Summary::default();
            summary.set_sample_count(*count);
            summary.set_sample_sum(*sum);
            let mut sorted: Vec<f64> = window.iter().copied().collect();
            sorted.sort_by(f64::total_cmp);
            for q in SUMMARY_QUANTILES {
                let mut quantile = proto::Quantile::default();
                quantile.set_quantile(q);
                quantile.set_value(quantile_of(&sorted, q));
                summary.mut_quantile().push(quantile);
            }
            metric.set_summary(summary);
        }
    }
}

/// Nearest-rank quantile of sorted observations; NaN when empty.
fn quantile_of(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let rank = (q * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

struct FamilyCollector(Arc<DynamicFamily>);

impl Collector for FamilyCollector {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.0.desc]
    }

    fn collect(&self) -> Vec<proto::MetricFamily> {
        self.0.encode().into_iter().collect()
    }
}

/// Handle to a registered family, tagged by kind.
#[derive(Debug, Clone, Default)]
pub enum FamilyHandle {
    Counter(Arc<DynamicFamily>),
    Gauge(Arc<DynamicFamily>),
    Histogram(Arc<DynamicFamily>),
    Summary(Arc<DynamicFamily>),
    /// Creation failed; every operation is a failing no-op.
    #[default]
    None,
}

impl FamilyHandle {
    fn wrap(kind: MetricKind, family: Arc<DynamicFamily>) -> Self {
        match kind {
            MetricKind::Counter => Self::Counter(family),
            MetricKind::Gauge => Self::Gauge(family),
            MetricKind::Histogram => Self::Histogram(family),
            MetricKind::Summary => Self::Summary(family),
        }
    }

    pub fn family(&self) -> Option<&Arc<DynamicFamily>> {
        match self {
            Self::Counter(f) | Self::Gauge(f) | Self::Histogram(f) | Self::Summary(f) => Some(f),
            Self::None => None,
        }
    }

    pub fn kind(&self) -> Option<MetricKind> {
        self.family().map(|f| f.kind())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Create the series for `labels` if it does not exist.
    pub fn add_series(&self, labels: &LabelSet) -> bool {
        self.family().is_some_and(|f| f.add_series(labels))
    }

    /// Set (counter, gauge) or observe (histogram, summary) `value`.
    pub fn update(&self, labels: &LabelSet, value: f64) -> bool {
        self.family().is_some_and(|f| f.update(labels, value))
    }

    /// Add one to a counter/gauge; observe `1` for histograms and summaries.
    pub fn increment(&self, labels: &LabelSet) -> bool {
        self.family().is_some_and(|f| f.increment(labels))
    }
}

/// Registry of dynamic families over a `prometheus::Registry`.
pub struct MetricRegistry {
    registry: Registry,
    families: Mutex<HashMap<String, FamilyHandle>>,
}

impl std::fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("families", &self.families.lock().len())
            .finish()
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    /// Register families into an existing registry.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            families: Mutex::new(HashMap::new()),
        }
    }

    /// Underlying registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Create (or fetch the cached) family named `name`.
    ///
    /// A cached family of another kind is a [`RegistryError::KindConflict`].
    pub fn create_family(
        &self,
        kind: MetricKind,
        name: &str,
        help: &str,
        const_labels: &LabelSet,
    ) -> Result<FamilyHandle, RegistryError> {
        let mut families = self.families.lock();
        if let Some(existing) = families.get(name) {
            return match existing.kind() {
                Some(found) if found == kind => Ok(existing.clone()),
                Some(found) => Err(RegistryError::KindConflict {
                    name: name.to_string(),
                    existing: found,
                    requested: kind,
                }),
                None => Ok(FamilyHandle::None),
            };
        }
        if let Some(bad) = const_labels.keys().find(|k| !is_valid_label_name(k)) {
            return Err(RegistryError::InvalidLabel(bad.clone()));
        }

        let family = Arc::new(DynamicFamily::new(kind, name, help, const_labels)?);
        self.registry
            .register(Box::new(FamilyCollector(Arc::clone(&family))))?;
        debug!("[registry] {} family '{}' registered", kind, name);

        let handle = FamilyHandle::wrap(kind, family);
        families.insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    /// Cached family, if any.
    pub fn family(&self, name: &str) -> Option<FamilyHandle> {
        self.families.lock().get(name).cloned()
    }

    /// Prometheus text exposition of every registered family.
    pub fn render(&self) -> Result<String, RegistryError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::label_set;

    #[test]
    fn test_gauge_series() {
        let registry = MetricRegistry::new();
        let gauge = registry
            .create_family(MetricKind::Gauge, "sensor_temp", "Temperature", &LabelSet::new())
            .expect("family");
        let labels = label_set([("id", "7")]);

        assert!(gauge.add_series(&labels));
        assert_eq!(gauge.family().and_then(|f| f.value(&labels)), Some(0.0));
        assert!(gauge.update(&labels, 21.5));
        assert!(gauge.update(&labels, 19.0));
        assert_eq!(gauge.family().and_then(|f| f.value(&labels)), Some(19.0));

        let text = registry.render().expect("render");
        assert!(text.contains("# TYPE sensor_temp gauge"));
        assert!(text.contains("sensor_temp{id=\"7\"} 19"));
    }

    #[test]
    fn test_counter_set_and_increment() {
        let registry = MetricRegistry::new();
        let consts = label_set([("Test", "on_data_available")]);
        let counter = registry
            .create_family(MetricKind::Counter, "calls_total", "Calls", &consts)
            .expect("family");
        let labels = label_set([("topic", "Square")]);

        assert!(counter.increment(&labels));
        assert!(counter.increment(&labels));
        assert_eq!(counter.family().and_then(|f| f.value(&labels)), Some(2.0));
        assert!(counter.update(&labels, 40.0));
        assert!(!counter.update(&labels, -1.0));
        assert_eq!(counter.family().and_then(|f| f.value(&labels)), Some(40.0));

        let text = registry.render().expect("render");
        assert!(text.contains("calls_total{Test=\"on_data_available\",topic=\"Square\"} 40"));
    }

    #[test]
    fn test_cached_by_name() {
        let registry = MetricRegistry::new();
        let a = registry
            .create_family(MetricKind::Gauge, "shared", "help", &LabelSet::new())
            .expect("first");
        let b = registry
            .create_family(MetricKind::Gauge, "shared", "other help", &LabelSet::new())
            .expect("cached");
        let (Some(fa), Some(fb)) = (a.family(), b.family()) else {
            panic!("handles should be live");
        };
        assert!(Arc::ptr_eq(fa, fb));

        let conflict =
            registry.create_family(MetricKind::Counter, "shared", "help", &LabelSet::new());
        assert!(matches!(conflict, Err(RegistryError::KindConflict { .. })));
    }

    #[test]
    fn test_invalid_names_are_failures() {
        let registry = MetricRegistry::new();
        assert!(registry
            .create_family(MetricKind::Gauge, "bad name", "help", &LabelSet::new())
            .is_err());

        let hist = registry
            .create_family(MetricKind::Histogram, "latency", "help", &LabelSet::new())
            .expect("family");
        assert!(!hist.update(&label_set([("le", "1")]), 1.0));
        assert!(!hist.add_series(&label_set([("a.b", "x")])));
        assert!(!FamilyHandle::None.update(&LabelSet::new(), 1.0));
        assert!(FamilyHandle::None.is_none());
    }

    #[test]
    fn test_histogram_buckets() {
        let registry = MetricRegistry::new();
        let hist = registry
            .create_family(MetricKind::Histogram, "depth", "Queue depth", &LabelSet::new())
            .expect("family");
        let labels = LabelSet::new();
        for v in [0.0, 1.0, 1.5, 5.0] {
            assert!(hist.update(&labels, v));
        }
        assert_eq!(hist.family().and_then(|f| f.sample_count(&labels)), Some(4));

        let text = registry.render().expect("render");
        assert!(text.contains("depth_bucket{le=\"0\"} 1"));
        assert!(text.contains("depth_bucket{le=\"1\"} 2"));
        assert!(text.contains("depth_bucket{le=\"2\"} 3"));
        assert!(text.contains("depth_bucket{le=\"+Inf\"} 4"));
        assert!(text.contains("depth_sum 7.5"));
        assert!(text.contains("depth_count 4"));
    }

    #[test]
    fn test_summary_window() {
        let registry = MetricRegistry::new();
        let summary = registry
            .create_family(MetricKind::Summary, "period", "Period", &LabelSet::new())
            .expect("family");
        let labels = LabelSet::new();
        for v in 1..=10 {
            assert!(summary.update(&labels, f64::from(v)));
        }
        let text = registry.render().expect("render");
        assert!(text.contains("period{quantile=\"0.5\"} 5"));
        assert!(text.contains("period{quantile=\"0.9\"} 9"));
        assert!(text.contains("period_count 10"));

        for _ in 0..SUMMARY_WINDOW {
            summary.update(&labels, 100.0);
        }
        let text = registry.render().expect("render");
        assert!(text.contains("period{quantile=\"0.5\"} 100"));
    }

    #[test]
    fn test_empty_family_not_exposed() {
        let registry = MetricRegistry::new();
        registry
            .create_family(MetricKind::Gauge, "unused", "help", &LabelSet::new())
            .expect("family");
        assert_eq!(registry.render().expect("render"), "");
    }

    #[test]
    fn test_quantile_of() {
        assert!(quantile_of(&[], 0.5).is_nan());
        assert_eq!(quantile_of(&[3.0], 0.9), 3.0);
        assert_eq!(quantile_of(&[1.0, 2.0, 3.0, 4.0], 0.5), 2.0);
        assert_eq!(quantile_of(&[1.0, 2.0, 3.0, 4.0], 0.7), 3.0);
    }
}
