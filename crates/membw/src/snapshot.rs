use serde::Deserialize;

use crate::counter::{MemCounters, MemSample};
use crate::Error;

/// Hardware counters reported for a cgroup v1 hierarchy
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct V1CpuStats {
    pub ocr_read_drams: u64,
    pub imc_writes: u64,
    pub store_all_ins: u64,
    pub store_ins: u64,
    /// Unix seconds of the last scrape
    pub update_time: i64,
}

/// Hardware counters reported for a cgroup v2 unified hierarchy
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct V2CpuStats {
    pub ocr_read_drams: u64,
    pub imc_writes: u64,
    pub store_all_ins: u64,
    pub store_ins: u64,
    /// Unix seconds of the last scrape
    pub update_time: i64,
}

/// Raw per-container statistics, tagged by the cgroup layout that produced them.
///
/// Decodes from the scraper's JSON document, where `cgroup_type` names which of
/// the `v1` / `v2` sections is populated. A tag that names no known layout, or a
/// tag whose section is missing, decodes to [`CgroupStats::Unsupported`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawCgroupInfo")]
pub enum CgroupStats {
    V1(V1CpuStats),
    V2(V2CpuStats),
    /// Carries the unrecognized discriminator for diagnostics
    Unsupported(String),
}

impl CgroupStats {
    /// Decodes a single cgroup statistics document
    pub fn from_json(data: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(data)?)
    }

    /// Flattens the snapshot into counters plus sample time.
    ///
    /// Unsupported layouts reconcile to all-zero counters with a zero timestamp,
    /// which downstream treats as "no sample".
    pub fn reconcile(&self) -> MemSample {
        match self {
            CgroupStats::V1(cpu) => MemSample::new(
                MemCounters {
                    ocr_read_drams: cpu.ocr_read_drams,
                    imc_writes: cpu.imc_writes,
                    store_all_ins: cpu.store_all_ins,
                    store_ins: cpu.store_ins,
                },
                cpu.update_time,
            ),
            CgroupStats::V2(cpu) => MemSample::new(
                MemCounters {
                    ocr_read_drams: cpu.ocr_read_drams,
                    imc_writes: cpu.imc_writes,
                    store_all_ins: cpu.store_all_ins,
                    store_ins: cpu.store_ins,
                },
                cpu.update_time,
            ),
            CgroupStats::Unsupported(_) => MemSample::default(),
        }
    }

    /// The discriminator as it appears on the wire
    pub fn cgroup_type(&self) -> &str {
        match self {
            CgroupStats::V1(_) => "V1",
            CgroupStats::V2(_) => "V2",
            CgroupStats::Unsupported(tag) => tag,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCgroupInfo {
    cgroup_type: String,
    v1: Option<RawV1Section>,
    v2: Option<RawV2Section>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawV1Section {
    cpu: V1CpuStats,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawV2Section {
    cpu: V2CpuStats,
}

impl From<RawCgroupInfo> for CgroupStats {
    fn from(raw: RawCgroupInfo) -> Self {
        match (raw.cgroup_type.as_str(), raw.v1, raw.v2) {
            ("V1", Some(v1), _) => CgroupStats::V1(v1.cpu),
            ("V2", _, Some(v2)) => CgroupStats::V2(v2.cpu),
            _ => CgroupStats::Unsupported(raw.cgroup_type),
        }
    }
}
