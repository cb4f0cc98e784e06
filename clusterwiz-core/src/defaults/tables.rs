//! Step tables keyed on the weakest node's RAM (GB).
//!
//! Each table is an ordered list of upper-inclusive thresholds; the first
//! threshold at or above the RAM wins, anything past the last one gets the
//! ceiling value.
//!
//! Reservations and minimum container sizes step up together at a threshold,
//! so NodeManager memory only grows with RAM inside one band: a node just
//! past a threshold (25 GB) can get less than one sitting on it (24 GB).

/// Memory held back from YARN on each node, in GB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedMemory {
    pub os_gb: u32,
    pub hbase_gb: u32,
}

const fn reserve(os_gb: u32, hbase_gb: u32) -> ReservedMemory {
    ReservedMemory { os_gb, hbase_gb }
}

const RESERVED_MEMORY: [(f64, ReservedMemory); 11] = [
    (4.0, reserve(1, 1)),
    (8.0, reserve(2, 1)),
    (16.0, reserve(2, 2)),
    (24.0, reserve(4, 4)),
    (48.0, reserve(6, 8)),
    (64.0, reserve(8, 8)),
    (72.0, reserve(8, 8)),
    (96.0, reserve(12, 16)),
    (128.0, reserve(24, 24)),
    (256.0, reserve(32, 32)),
    (512.0, reserve(64, 64)),
];
const RESERVED_MEMORY_CEILING: ReservedMemory = reserve(64, 64);

const MIN_CONTAINER_SIZE_MB: [(f64, u32); 3] = [(4.0, 256), (8.0, 512), (24.0, 1024)];
const MIN_CONTAINER_SIZE_CEILING_MB: u32 = 2048;

fn step_lookup<T: Copy>(table: &[(f64, T)], ceiling: T, ram_gb: f64) -> T {
    table
        .iter()
        .find(|(limit, _)| ram_gb <= *limit)
        .map_or(ceiling, |(_, value)| *value)
}

pub fn reserved_memory(ram_gb: f64) -> ReservedMemory {
    step_lookup(&RESERVED_MEMORY, RESERVED_MEMORY_CEILING, ram_gb)
}

pub fn min_container_size_mb(ram_gb: f64) -> u32 {
    step_lookup(&MIN_CONTAINER_SIZE_MB, MIN_CONTAINER_SIZE_CEILING_MB, ram_gb)
}
