use std::mem;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use membw::metric_names::{MEM_BANDWIDTH_READ_CONTAINER, MEM_BANDWIDTH_WRITE_CONTAINER};
use membw::{ContainerKey, MemoryMetricStore, MetricData, MetricStore};

/// A bandwidth value committed during a collection cycle
#[derive(Debug, Clone, PartialEq)]
pub struct RateSample {
    pub time: DateTime<Utc>,
    pub key: ContainerKey,
    pub metric: &'static str,
    pub value: f64,
}

/// Metric store that also keeps the bandwidth samples written since the last drain.
///
/// Raw counter series only go to the backing store; they are bookkeeping for
/// the next cycle and are not exported.
pub struct ExportingStore {
    inner: Arc<MemoryMetricStore>,
    pending: Mutex<Vec<RateSample>>,
}

impl ExportingStore {
    pub fn new(inner: Arc<MemoryMetricStore>) -> Self {
        Self {
            inner,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn backing_store(&self) -> &MemoryMetricStore {
        &self.inner
    }

    /// Takes every sample committed since the previous call
    pub fn drain(&self) -> Vec<RateSample> {
        mem::take(&mut *self.pending.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

fn exported_name(metric_name: &str) -> Option<&'static str> {
    [MEM_BANDWIDTH_READ_CONTAINER, MEM_BANDWIDTH_WRITE_CONTAINER]
        .into_iter()
        .find(|name| *name == metric_name)
}

impl MetricStore for ExportingStore {
    fn get_container_metric(&self, key: &ContainerKey, metric_name: &str) -> Option<MetricData> {
        self.inner.get_container_metric(key, metric_name)
    }

    fn set_container_metric(&self, key: &ContainerKey, metric_name: &str, data: MetricData) {
        if let (Some(metric), Some(time)) = (exported_name(metric_name), data.time) {
            self.pending
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(RateSample {
                    time,
                    key: key.clone(),
                    metric,
                    value: data.value,
                });
        }
        self.inner.set_container_metric(key, metric_name, data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use membw::metric_names::OCR_READ_DRAMS_CONTAINER;

    #[test]
    fn test_only_bandwidth_series_are_exported() {
        let store = ExportingStore::new(Arc::new(MemoryMetricStore::new()));
        let key = ContainerKey::new("uid", "app");

        store.set_container_metric(
            &key,
            OCR_READ_DRAMS_CONTAINER,
            MetricData::at_unix_secs(100.0, 10),
        );
        store.set_container_metric(
            &key,
            MEM_BANDWIDTH_READ_CONTAINER,
            MetricData::at_unix_secs(1.5, 10),
        );

        let samples = store.drain();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].metric, MEM_BANDWIDTH_READ_CONTAINER);
        assert_eq!(samples[0].value, 1.5);
        assert_eq!(samples[0].time.timestamp(), 10);
        assert_eq!(samples[0].key, key);

        // both series still reach the backing store
        assert!(store
            .backing_store()
            .get_container_metric(&key, OCR_READ_DRAMS_CONTAINER)
            .is_some());
        assert!(store.drain().is_empty());
    }
}
