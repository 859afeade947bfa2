//! Rate calculation over pairs of counter readings.
//!
//! A rate is committed in two steps: the sample interval is validated first,
//! and only when it is usable is the formula evaluated and the result written.
//! Every anomaly (no history, stale or out-of-order samples, counter rollover,
//! zero divisor) turns into a skipped write or a zero increment; nothing here
//! returns an error.

use log::{debug, trace};

use crate::counter::{counter_delta, MemCounters};
use crate::metric_names;
use crate::store::{ContainerKey, MetricData, MetricStore};

/// Bytes moved by one DRAM read request or memory controller write
pub const BYTES_PER_TRANSFER: f64 = 64.0;

/// Bytes per reported megabyte
pub const BYTES_PER_MEGABYTE: f64 = 1024.0 * 1024.0;

/// The counter arithmetic behind each derived bandwidth series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateFormula {
    /// Megabytes read from DRAM
    ReadBandwidth,
    /// Megabytes written through the memory controller, attributed by store share
    WriteBandwidth,
}

impl RateFormula {
    /// Name of the series this formula feeds
    pub fn metric_name(&self) -> &'static str {
        match self {
            RateFormula::ReadBandwidth => metric_names::MEM_BANDWIDTH_READ_CONTAINER,
            RateFormula::WriteBandwidth => metric_names::MEM_BANDWIDTH_WRITE_CONTAINER,
        }
    }

    /// Megabytes moved between the two readings
    pub fn numerator(&self, prior: &MemCounters, current: &MemCounters) -> f64 {
        match self {
            RateFormula::ReadBandwidth => read_megabytes(prior, current),
            RateFormula::WriteBandwidth => write_megabytes(prior, current),
        }
    }
}

/// Megabytes read from DRAM between two readings
pub fn read_megabytes(prior: &MemCounters, current: &MemCounters) -> f64 {
    let reads = counter_delta(prior.ocr_read_drams, current.ocr_read_drams);
    reads as f64 * BYTES_PER_TRANSFER / BYTES_PER_MEGABYTE
}

/// Megabytes written between two readings.
///
/// The memory controller write counter is not split per store type, so it is
/// scaled by the share of all stores that fall in the instrumented subset. With
/// no stores observed there is nothing to attribute and the result is 0.
///
/// The operation order is kept as is so the values stay identical to the
/// series existing dashboards are built on.
pub fn write_megabytes(prior: &MemCounters, current: &MemCounters) -> f64 {
    let store_all_inc = counter_delta(prior.store_all_ins, current.store_all_ins);
    if store_all_inc == 0 {
        return 0.0;
    }

    let store_inc = counter_delta(prior.store_ins, current.store_ins);
    let imc_writes_inc = counter_delta(prior.imc_writes, current.imc_writes);

    store_inc as f64 / store_all_inc as f64 / BYTES_PER_MEGABYTE
        * imc_writes_inc as f64
        * BYTES_PER_TRANSFER
}

/// Length of the sample interval in seconds, if it can anchor a rate.
///
/// Returns `None` when there is no previous sample (`last_update_time == 0`),
/// when the sample has not advanced since the last computation, or when time
/// went backwards.
pub fn sample_interval_secs(last_update_time: i64, cur_update_time: i64) -> Option<i64> {
    if last_update_time == 0 {
        return None;
    }
    cur_update_time
        .checked_sub(last_update_time)
        .filter(|delta| *delta > 0)
}

/// Computes a container rate and writes it to the store when a new interval exists.
///
/// Returns the committed value, or `None` when the write was suppressed. At most
/// one sample is written per call, stamped with `cur_update_time`.
#[allow(clippy::too_many_arguments)]
pub fn set_container_rate_metric<S: MetricStore + ?Sized>(
    store: &S,
    key: &ContainerKey,
    metric_name: &str,
    formula: RateFormula,
    prior: &MemCounters,
    current: &MemCounters,
    last_update_time: i64,
    cur_update_time: i64,
) -> Option<f64> {
    let Some(interval) = sample_interval_secs(last_update_time, cur_update_time) else {
        debug!(
            "Skipping {} for {}: no new sample (last={}, current={})",
            metric_name, key, last_update_time, cur_update_time
        );
        return None;
    };

    let value = formula.numerator(prior, current) / interval as f64;
    trace!("Setting {} for {} to {} over {}s", metric_name, key, value, interval);

    store.set_container_metric(
        key,
        metric_name,
        MetricData::at_unix_secs(value, cur_update_time),
    );
    Some(value)
}
