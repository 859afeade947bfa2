use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

/// Identifies the container a metric belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerKey {
    pub pod_uid: String,
    pub container_name: String,
}

impl ContainerKey {
    pub fn new(pod_uid: impl Into<String>, container_name: impl Into<String>) -> Self {
        Self {
            pod_uid: pod_uid.into(),
            container_name: container_name.into(),
        }
    }
}

impl fmt::Display for ContainerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pod_uid, self.container_name)
    }
}

/// A single metric value and the time it describes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricData {
    pub value: f64,
    pub time: Option<DateTime<Utc>>,
}

impl MetricData {
    /// Creates a sample stamped at the given Unix second.
    ///
    /// Seconds outside chrono's representable range leave the time unset.
    pub fn at_unix_secs(value: f64, secs: i64) -> Self {
        Self {
            value,
            time: DateTime::from_timestamp(secs, 0),
        }
    }

    /// Unix seconds of the sample, or 0 when it carries no time
    pub fn unix_secs(&self) -> i64 {
        self.time.map_or(0, |t| t.timestamp())
    }

    /// The value as a raw counter reading.
    ///
    /// Counters go through the store as f64, so this saturates at the u64 bounds
    /// and maps NaN to 0.
    pub fn as_counter(&self) -> u64 {
        self.value as u64
    }
}

/// Latest-value metric storage keyed by container and metric name.
///
/// Implementations must tolerate concurrent access for different keys.
/// Callers serialize read-modify-write sequences on the same key.
pub trait MetricStore {
    /// Returns the most recent sample recorded for the key
    fn get_container_metric(&self, key: &ContainerKey, metric_name: &str) -> Option<MetricData>;

    /// Records a new sample for the key
    fn set_container_metric(&self, key: &ContainerKey, metric_name: &str, data: MetricData);
}

impl<S: MetricStore + ?Sized> MetricStore for Arc<S> {
    fn get_container_metric(&self, key: &ContainerKey, metric_name: &str) -> Option<MetricData> {
        (**self).get_container_metric(key, metric_name)
    }

    fn set_container_metric(&self, key: &ContainerKey, metric_name: &str, data: MetricData) {
        (**self).set_container_metric(key, metric_name, data)
    }
}

/// In-process [`MetricStore`] that keeps the latest sample per series
#[derive(Debug, Default)]
pub struct MemoryMetricStore {
    series: RwLock<HashMap<ContainerKey, HashMap<String, MetricData>>>,
}

impl MemoryMetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets every series of a container
    pub fn remove_container(&self, key: &ContainerKey) {
        self.series
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }

    /// Number of containers with at least one series
    pub fn container_count(&self) -> usize {
        self.series.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl MetricStore for MemoryMetricStore {
    fn get_container_metric(&self, key: &ContainerKey, metric_name: &str) -> Option<MetricData> {
        let series = self.series.read().unwrap_or_else(|e| e.into_inner());
        series.get(key)?.get(metric_name).copied()
    }

    fn set_container_metric(&self, key: &ContainerKey, metric_name: &str, data: MetricData) {
        let mut series = self.series.write().unwrap_or_else(|e| e.into_inner());
        series
            .entry(key.clone())
            .or_default()
            .insert(metric_name.to_string(), data);
    }
}
