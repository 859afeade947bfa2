use log::debug;

use crate::counter::{MemCounters, MemSample};
use crate::metric_names;
use crate::rate::{set_container_rate_metric, RateFormula};
use crate::snapshot::CgroupStats;
use crate::store::{ContainerKey, MetricData, MetricStore};

/// Rates committed for one container in one cycle; `None` means suppressed
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct BandwidthUpdate {
    pub read_mbps: Option<f64>,
    pub write_mbps: Option<f64>,
}

impl BandwidthUpdate {
    /// True when neither series received a value
    pub fn is_empty(&self) -> bool {
        self.read_mbps.is_none() && self.write_mbps.is_none()
    }
}

/// Turns per-container cgroup snapshots into memory bandwidth series.
///
/// The fetcher keeps no state of its own. The previous counter readings live
/// in the injected store next to the derived series, so one fetcher can serve
/// any number of containers as long as each container is processed by one
/// caller at a time.
pub struct BandwidthFetcher<S: MetricStore> {
    store: S,
}

impl<S: MetricStore> BandwidthFetcher<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs one collection cycle for a container.
    ///
    /// Reads the previous raw counters, commits read and write bandwidth for
    /// the interval since then, and records the current counters as the base
    /// for the next cycle. A sample that is not newer than the recorded one
    /// leaves the recorded counters untouched.
    pub fn process_container(&self, key: &ContainerKey, stats: &CgroupStats) -> BandwidthUpdate {
        let current = stats.reconcile();
        if !current.is_valid() {
            debug!(
                "No usable sample for {} (cgroup type {:?})",
                key,
                stats.cgroup_type()
            );
            return BandwidthUpdate::default();
        }

        let prior = self.last_sample(key);
        let update = BandwidthUpdate {
            read_mbps: self.set_rate(key, RateFormula::ReadBandwidth, &prior, &current),
            write_mbps: self.set_rate(key, RateFormula::WriteBandwidth, &prior, &current),
        };

        if !prior.is_valid() || current.update_time > prior.update_time {
            self.record_counters(key, &current);
        }

        update
    }

    /// The counters recorded in the previous cycle.
    ///
    /// Missing series read as zero counters; the sample time comes from the
    /// DRAM read series and is 0 when that series has never been written.
    pub fn last_sample(&self, key: &ContainerKey) -> MemSample {
        let read = self
            .store
            .get_container_metric(key, metric_names::OCR_READ_DRAMS_CONTAINER);
        let counter = |name: &str| {
            self.store
                .get_container_metric(key, name)
                .map_or(0, |data| data.as_counter())
        };

        MemSample::new(
            MemCounters {
                ocr_read_drams: read.map_or(0, |data| data.as_counter()),
                imc_writes: counter(metric_names::IMC_WRITE_CONTAINER),
                store_all_ins: counter(metric_names::STORE_ALL_INS_CONTAINER),
                store_ins: counter(metric_names::STORE_INS_CONTAINER),
            },
            read.map_or(0, |data| data.unix_secs()),
        )
    }

    fn set_rate(
        &self,
        key: &ContainerKey,
        formula: RateFormula,
        prior: &MemSample,
        current: &MemSample,
    ) -> Option<f64> {
        set_container_rate_metric(
            &self.store,
            key,
            formula.metric_name(),
            formula,
            &prior.counters,
            &current.counters,
            prior.update_time,
            current.update_time,
        )
    }

    fn record_counters(&self, key: &ContainerKey, sample: &MemSample) {
        let counters = &sample.counters;
        for (name, value) in [
            (metric_names::OCR_READ_DRAMS_CONTAINER, counters.ocr_read_drams),
            (metric_names::IMC_WRITE_CONTAINER, counters.imc_writes),
            (metric_names::STORE_ALL_INS_CONTAINER, counters.store_all_ins),
            (metric_names::STORE_INS_CONTAINER, counters.store_ins),
        ] {
            self.store.set_container_metric(
                key,
                name,
                MetricData::at_unix_secs(value as f64, sample.update_time),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::V2CpuStats;
    use crate::store::MemoryMetricStore;

    fn v2(read: u64, update_time: i64) -> CgroupStats {
        CgroupStats::V2(V2CpuStats {
            ocr_read_drams: read,
            update_time,
            ..Default::default()
        })
    }

    #[test]
    fn test_first_cycle_only_records_counters() {
        let fetcher = BandwidthFetcher::new(MemoryMetricStore::new());
        let key = ContainerKey::new("pod", "app");

        let update = fetcher.process_container(&key, &v2(100, 10));
        assert!(update.is_empty());

        let store = fetcher.store();
        assert!(store
            .get_container_metric(&key, metric_names::MEM_BANDWIDTH_READ_CONTAINER)
            .is_none());
        assert_eq!(
            fetcher.last_sample(&key),
            MemSample::new(
                MemCounters {
                    ocr_read_drams: 100,
                    ..Default::default()
                },
                10,
            )
        );
    }

    #[test]
    fn test_second_cycle_commits_both_series() {
        let fetcher = BandwidthFetcher::new(MemoryMetricStore::new());
        let key = ContainerKey::new("pod", "app");

        fetcher.process_container(&key, &v2(100, 10));
        let update = fetcher.process_container(&key, &v2(164, 11));

        assert_eq!(update.read_mbps, Some(0.00390625));
        assert_eq!(update.write_mbps, Some(0.0));
    }

    #[test]
    fn test_unsupported_snapshot_keeps_history() {
        let fetcher = BandwidthFetcher::new(MemoryMetricStore::new());
        let key = ContainerKey::new("pod", "app");

        fetcher.process_container(&key, &v2(100, 10));
        let update = fetcher.process_container(&key, &CgroupStats::Unsupported("V9".into()));
        assert!(update.is_empty());

        assert_eq!(fetcher.last_sample(&key).update_time, 10);
        assert_eq!(fetcher.last_sample(&key).counters.ocr_read_drams, 100);
    }

    #[test]
    fn test_unsupported_snapshot_logs_once() {
        let fetcher = BandwidthFetcher::new(MemoryMetricStore::new());
        let key = ContainerKey::new("pod", "app");
        fetcher.process_container(&key, &v2(100, 10));

        testing_logger::setup();
        fetcher.process_container(&key, &CgroupStats::Unsupported("V9".into()));

        testing_logger::validate(|captured_logs| {
            assert_eq!(captured_logs.len(), 1);
            assert_eq!(captured_logs[0].level, log::Level::Debug);
            assert_eq!(
                captured_logs[0].body,
                "No usable sample for pod/app (cgroup type \"V9\")"
            );
        });
    }

    #[test]
    fn test_stale_sample_keeps_newer_history() {
        let fetcher = BandwidthFetcher::new(MemoryMetricStore::new());
        let key = ContainerKey::new("pod", "app");

        fetcher.process_container(&key, &v2(100, 10));
        fetcher.process_container(&key, &v2(164, 11));
        let update = fetcher.process_container(&key, &v2(120, 10));
        assert!(update.is_empty());

        let sample = fetcher.last_sample(&key);
        assert_eq!(sample.update_time, 11);
        assert_eq!(sample.counters.ocr_read_drams, 164);
    }
}
