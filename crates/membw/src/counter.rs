/// The four raw hardware counters the bandwidth rates are built from.
///
/// All values are monotonic within a counter epoch. A value lower than the
/// previous reading means the counter wrapped or was reset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemCounters {
    /// DRAM read requests (offcore response, 64 bytes each)
    pub ocr_read_drams: u64,
    /// Memory controller write transactions (64 bytes each)
    pub imc_writes: u64,
    /// All retired store instructions
    pub store_all_ins: u64,
    /// Retired store instructions in the instrumented subset
    pub store_ins: u64,
}

/// A reconciled counter reading together with the time it was sampled.
///
/// An `update_time` of zero marks a sample that carries no usable data.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemSample {
    pub counters: MemCounters,
    /// Unix seconds at which the counters were read
    pub update_time: i64,
}

impl MemSample {
    pub fn new(counters: MemCounters, update_time: i64) -> Self {
        Self {
            counters,
            update_time,
        }
    }

    /// True when the sample has a timestamp and can anchor a rate
    pub fn is_valid(&self) -> bool {
        self.update_time != 0
    }
}

/// Computes the increase between two readings of a u64 counter.
///
/// The counters can pass `u64::MAX` and start over, and the upper bound of
/// each counter is not known here, so a reading lower than the previous one
/// counts as no increase at all.
pub fn counter_delta(previous: u64, current: u64) -> u64 {
    current.checked_sub(previous).unwrap_or(0)
}
