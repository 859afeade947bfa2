//! # membw
//!
//! Derives per-container memory bandwidth (MB/s) from the monotonic hardware
//! counters exposed through cgroup accounting.
//!
//! Raw snapshots come in either the cgroup v1 or the v2 layout. [`CgroupStats`]
//! reconciles both into a flat [`MemCounters`] tuple, and the rate functions in
//! [`rate`] turn two such tuples into a rate that is committed to a
//! [`MetricStore`] only when a new sample interval actually exists.
//!
//! [`BandwidthFetcher`] ties the pieces together for one container per
//! collection cycle.

pub mod counter;
pub mod fetcher;
pub mod rate;
pub mod snapshot;
pub mod store;

pub use counter::*;
pub use fetcher::*;
pub use rate::{set_container_rate_metric, RateFormula};
pub use snapshot::*;
pub use store::*;

use thiserror::Error;

/// Errors raised while decoding raw snapshot documents
#[derive(Error, Debug)]
pub enum Error {
    /// The document was not valid JSON for the expected layout
    #[error("failed to decode cgroup snapshot: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Metric names for the raw counters and the derived bandwidth series.
pub mod metric_names {
    /// DRAM read requests issued on behalf of the container
    pub const OCR_READ_DRAMS_CONTAINER: &str = "cpu.read.drams.container";
    /// Integrated memory controller write transactions
    pub const IMC_WRITE_CONTAINER: &str = "cpu.imc.write.container";
    /// All retired store instructions
    pub const STORE_ALL_INS_CONTAINER: &str = "cpu.store.allins.container";
    /// Store instructions in the instrumented subset
    pub const STORE_INS_CONTAINER: &str = "cpu.store.ins.container";

    /// Memory read bandwidth in MB/s
    pub const MEM_BANDWIDTH_READ_CONTAINER: &str = "mem.bandwidth.read.container";
    /// Memory write bandwidth in MB/s
    pub const MEM_BANDWIDTH_WRITE_CONTAINER: &str = "mem.bandwidth.write.container";
}
