//! Configuration defaults for YARN, Tez and Hive
//!
//! Sizes NodeManager memory, container allocation limits and task heaps for
//! the weakest node running the reference slave role. The arithmetic is
//! shared; each [`DefaultsVariant`] only adds its own keys on top of the YARN
//! set.

mod tables;

pub use tables::{min_container_size_mb, reserved_memory, ReservedMemory};

use crate::inventory::LocalDb;
use crate::topology::{ClusterAggregate, HostTopologySnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Slave role whose hosts bound the sizing
pub const NODEMANAGER: &str = "NODEMANAGER";

pub const NODEMANAGER_MEMORY_MB: &str = "yarn.nodemanager.resource.memory-mb";
pub const SCHEDULER_MIN_ALLOCATION_MB: &str = "yarn.scheduler.minimum-allocation-mb";
pub const SCHEDULER_MAX_ALLOCATION_MB: &str = "yarn.scheduler.maximum-allocation-mb";
pub const AM_RESOURCE_MB: &str = "yarn.app.mapreduce.am.resource.mb";
pub const AM_COMMAND_OPTS: &str = "yarn.app.mapreduce.am.command-opts";
pub const MAP_MEMORY_MB: &str = "mapreduce.map.memory.mb";
pub const REDUCE_MEMORY_MB: &str = "mapreduce.reduce.memory.mb";
pub const MAP_JAVA_OPTS: &str = "mapreduce.map.java.opts";
pub const REDUCE_JAVA_OPTS: &str = "mapreduce.reduce.java.opts";
pub const TASK_IO_SORT_MB: &str = "mapreduce.task.io.sort.mb";
pub const TEZ_AM_MEMORY_MB: &str = "tez.am.resource.memory.mb";
pub const TEZ_AM_JAVA_OPTS: &str = "tez.am.java.opts";
pub const HIVE_TEZ_CONTAINER_SIZE: &str = "hive.tez.container.size";
pub const HIVE_TEZ_JAVA_OPTS: &str = "hive.tez.java.opts";

/// Above this, RAM per container is rounded down to a multiple of 512 MB
const CONTAINER_ROUNDING_THRESHOLD_MB: f64 = 2048.0;
const CONTAINER_ROUNDING_STEP_MB: f64 = 512.0;
const HEAP_RATIO: f64 = 0.8;
const SORT_BUFFER_RATIO: f64 = 0.4;
const SORT_BUFFER_CAP_MB: f64 = 1024.0;

/// Which provider's keys to emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultsVariant {
    Yarn,
    Tez,
    Hive,
}

/// A recommended value, rendered as the console would store it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Int(u64),
    Text(String),
}

/// Flat configuration key -> recommended value map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Recommendations(BTreeMap<String, ConfigValue>);

/// Container layout shared by every variant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerSizing {
    pub reserved: ReservedMemory,
    pub usable_ram_mb: f64,
    pub min_container_mb: u32,
    pub containers: u32,
    pub ram_per_container_mb: f64,
}

impl DefaultsVariant {
    pub const ALL: [DefaultsVariant; 3] = [DefaultsVariant::Yarn, DefaultsVariant::Tez, DefaultsVariant::Hive];

    pub fn name(self) -> &'static str {
        match self {
            DefaultsVariant::Yarn => "yarn",
            DefaultsVariant::Tez => "tez",
            DefaultsVariant::Hive => "hive",
        }
    }

    pub fn reference_role(self) -> &'static str {
        NODEMANAGER
    }

    fn write_overlay(self, sizing: &ContainerSizing, out: &mut Recommendations) {
        match self {
            DefaultsVariant::Yarn => {}
            DefaultsVariant::Tez => {
                let am = sizing.am_memory_mb();
                out.insert_int(TEZ_AM_MEMORY_MB, am.floor() as u64);
                out.insert_text(
                    TEZ_AM_JAVA_OPTS,
                    format!(
                        "-server -Xmx{}m -Djava.net.preferIPv4Stack=true -XX:+UseNUMA -XX:+UseParallelGC",
                        heap_mb(am)
                    ),
                );
            }
            DefaultsVariant::Hive => {
                let container = sizing.map_memory_mb();
                out.insert_int(HIVE_TEZ_CONTAINER_SIZE, container as u64);
                out.insert_text(
                    HIVE_TEZ_JAVA_OPTS,
                    format!(
                        "-server -Xmx{}m -Djava.net.preferIPv4Stack=true -XX:NewRatio=8 -XX:+UseNUMA -XX:+UseParallelGC",
                        heap_mb(container)
                    ),
                );
            }
        }
    }
}

impl fmt::Display for DefaultsVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Int(v) => write!(f, "{v}"),
            ConfigValue::Text(s) => f.write_str(s),
        }
    }
}

impl Recommendations {
    fn insert_int(&mut self, key: &str, value: u64) {
        self.0.insert(key.to_string(), ConfigValue::Int(value));
    }

    fn insert_text(&mut self, key: &str, value: String) {
        self.0.insert(key.to_string(), ConfigValue::Text(value));
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.0.get(key)
    }

    pub fn get_int(&self, key: &str) -> Option<u64> {
        match self.0.get(key)? {
            ConfigValue::Int(v) => Some(*v),
            ConfigValue::Text(_) => None,
        }
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        match self.0.get(key)? {
            ConfigValue::Text(s) => Some(s.as_str()),
            ConfigValue::Int(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl ContainerSizing {
    pub fn from_aggregate(aggregate: &ClusterAggregate) -> Self {
        let reserved = reserved_memory(aggregate.ram_gb);
        let min_container_mb = min_container_size_mb(aggregate.ram_gb);

        let mut usable_gb = aggregate.ram_gb - reserved.os_gb as f64;
        if aggregate.hbase_installed {
            usable_gb -= reserved.hbase_gb as f64;
        }
        let usable_ram_mb = usable_gb.max(1.0) * 1024.0;

        // unknown-as-zero cores or disks still leave room for one container
        let cpu = aggregate.cpu_cores.max(1) as f64;
        let disks = aggregate.disk_count.max(1) as f64;
        let containers = (2.0 * cpu)
            .min((1.8 * disks).ceil())
            .min(usable_ram_mb / min_container_mb as f64)
            .floor()
            .max(1.0) as u32;

        let per_container = (usable_ram_mb / containers as f64).floor();
        let rounded = if per_container > CONTAINER_ROUNDING_THRESHOLD_MB {
            (per_container / CONTAINER_ROUNDING_STEP_MB).floor() * CONTAINER_ROUNDING_STEP_MB
        } else {
            per_container
        };
        let ram_per_container_mb = rounded.max(min_container_mb as f64);

        Self {
            reserved,
            usable_ram_mb,
            min_container_mb,
            containers,
            ram_per_container_mb,
        }
    }

    pub fn node_memory_mb(&self) -> u64 {
        u64::from(self.containers) * self.ram_per_container_mb as u64
    }

    pub fn map_memory_mb(&self) -> f64 {
        (self.ram_per_container_mb / 2.0).floor()
    }

    pub fn reduce_memory_mb(&self) -> f64 {
        self.ram_per_container_mb
    }

    pub fn am_memory_mb(&self) -> f64 {
        self.map_memory_mb().max(self.reduce_memory_mb())
    }

    fn write_yarn(&self, out: &mut Recommendations) {
        let node_memory = self.node_memory_mb();
        let map = self.map_memory_mb();
        let reduce = self.reduce_memory_mb();
        let am = self.am_memory_mb();

        out.insert_int(NODEMANAGER_MEMORY_MB, node_memory);
        out.insert_int(SCHEDULER_MIN_ALLOCATION_MB, self.ram_per_container_mb.floor() as u64);
        out.insert_int(SCHEDULER_MAX_ALLOCATION_MB, node_memory);
        out.insert_int(AM_RESOURCE_MB, am.floor() as u64);
        out.insert_text(AM_COMMAND_OPTS, heap_opts(am));
        out.insert_int(MAP_MEMORY_MB, map.floor() as u64);
        out.insert_int(REDUCE_MEMORY_MB, reduce.floor() as u64);
        out.insert_text(MAP_JAVA_OPTS, heap_opts(map));
        out.insert_text(REDUCE_JAVA_OPTS, heap_opts(reduce));
        out.insert_int(
            TASK_IO_SORT_MB,
            (SORT_BUFFER_RATIO * map).min(SORT_BUFFER_CAP_MB).round() as u64,
        );
    }
}

fn heap_mb(container_mb: f64) -> u64 {
    (HEAP_RATIO * container_mb).round() as u64
}

fn heap_opts(container_mb: f64) -> String {
    format!("-Xmx{}m", heap_mb(container_mb))
}

/// Recommended configuration for `variant`, or `None` when the snapshot does
/// not hold enough data (the caller leaves the fields blank).
pub fn compute_defaults(snapshot: &HostTopologySnapshot, variant: DefaultsVariant) -> Option<Recommendations> {
    let aggregate = ClusterAggregate::from_snapshot(snapshot, variant.reference_role())?;
    let sizing = ContainerSizing::from_aggregate(&aggregate);
    debug!(
        "{} sizing: {} containers x {:.0} MB (min container {} MB, usable {:.0} MB)",
        variant, sizing.containers, sizing.ram_per_container_mb, sizing.min_container_mb, sizing.usable_ram_mb
    );

    let mut out = Recommendations::default();
    sizing.write_yarn(&mut out);
    variant.write_overlay(&sizing, &mut out);
    Some(out)
}

/// Same as [`compute_defaults`], straight from the wizard's local DB
pub fn compute_defaults_from_local_db(db: &LocalDb, variant: DefaultsVariant) -> Option<Recommendations> {
    match db.to_snapshot() {
        Ok(snapshot) => compute_defaults(&snapshot, variant),
        Err(e) => {
            warn!("cannot compute {} defaults: {}", variant, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{HostResources, HBASE_MASTER};
    use clusterwiz_devkit::{fixtures, init_test_logging};
    use serde_json::json;

    fn aggregate(ram_gb: f64, cpu_cores: u32, disk_count: u32, hbase_installed: bool) -> ClusterAggregate {
        ClusterAggregate { ram_gb, cpu_cores, disk_count, hbase_installed }
    }

    fn single_slave(cpu: u32, ram_gb: u64, disks: u32) -> HostTopologySnapshot {
        HostTopologySnapshot::new()
            .with_host("master", HostResources::with_ram_gb(8, 64, 8))
            .with_host("slave", HostResources::with_ram_gb(cpu, ram_gb, disks))
            .with_slave(NODEMANAGER, ["slave"])
    }

    fn node_memory(snapshot: &HostTopologySnapshot) -> u64 {
        compute_defaults(snapshot, DefaultsVariant::Yarn)
            .unwrap()
            .get_int(NODEMANAGER_MEMORY_MB)
            .unwrap()
    }

    fn local_db(value: serde_json::Value) -> LocalDb {
        LocalDb::from_value(value).unwrap()
    }

    #[test]
    fn test_container_count() {
        assert_eq!(ContainerSizing::from_aggregate(&aggregate(48.0, 12, 12, false)).containers, 21);
        assert_eq!(ContainerSizing::from_aggregate(&aggregate(48.0, 6, 6, true)).containers, 11);
    }

    #[test]
    fn test_ram_per_container() {
        let plain = ContainerSizing::from_aggregate(&aggregate(48.0, 12, 12, false));
        assert_eq!(plain.ram_per_container_mb, 2048.0);
        assert_eq!(plain.map_memory_mb(), 1024.0);
        assert_eq!(plain.am_memory_mb(), 2048.0);

        let hbase = ContainerSizing::from_aggregate(&aggregate(48.0, 6, 6, true));
        assert_eq!(hbase.ram_per_container_mb, 3072.0);
        assert_eq!(hbase.map_memory_mb(), 1536.0);
        assert_eq!(hbase.reduce_memory_mb(), 3072.0);
    }

    #[test]
    fn test_node_memory_is_whole_containers() {
        // 10240 MB over 6 containers leaves a fractional share
        let sizing = ContainerSizing::from_aggregate(&aggregate(12.0, 4, 3, false));
        assert_eq!(sizing.containers, 6);
        assert_eq!(sizing.ram_per_container_mb, 1706.0);
        assert_eq!(sizing.node_memory_mb(), 10236);

        let out = compute_defaults(&single_slave(4, 12, 3), DefaultsVariant::Yarn).unwrap();
        let node_memory = out.get_int(NODEMANAGER_MEMORY_MB).unwrap();
        let min_allocation = out.get_int(SCHEDULER_MIN_ALLOCATION_MB).unwrap();
        assert_eq!(node_memory, 10236);
        assert_eq!(min_allocation, 1706);
        assert_eq!(node_memory % min_allocation, 0);
        assert_eq!(out.get_int(MAP_MEMORY_MB), Some(853));
        assert_eq!(out.get_int(REDUCE_MEMORY_MB), Some(1706));
    }

    #[test]
    fn test_tiny_node_still_gets_one_container() {
        let sizing = ContainerSizing::from_aggregate(&aggregate(1.0, 0, 0, true));
        assert_eq!(sizing.usable_ram_mb, 1024.0);
        assert_eq!(sizing.containers, 2);
        assert_eq!(sizing.ram_per_container_mb, 512.0);

        let no_room = ContainerSizing::from_aggregate(&aggregate(30.0, 1, 1, true));
        assert!(no_room.containers >= 1);
        assert!(no_room.ram_per_container_mb >= no_room.min_container_mb as f64);
    }

    #[test]
    fn test_yarn_without_hbase() {
        init_test_logging();
        let out = compute_defaults_from_local_db(&local_db(fixtures::yarn_without_hbase()), DefaultsVariant::Yarn)
            .unwrap();

        assert_eq!(out.get_text(MAP_JAVA_OPTS), Some("-Xmx1024m"));
        assert_eq!(out.get_int(MAP_MEMORY_MB), Some(1280));
        assert_eq!(out.get_text(REDUCE_JAVA_OPTS), Some("-Xmx2048m"));
        assert_eq!(out.get_int(REDUCE_MEMORY_MB), Some(2560));
        assert_eq!(out.get_text(AM_COMMAND_OPTS), Some("-Xmx2048m"));
        assert_eq!(out.get_int(AM_RESOURCE_MB), Some(2560));
        assert_eq!(out.get_int(NODEMANAGER_MEMORY_MB), Some(20480));
        assert_eq!(out.get_int(SCHEDULER_MAX_ALLOCATION_MB), Some(20480));
        assert_eq!(out.get_int(SCHEDULER_MIN_ALLOCATION_MB), Some(2560));
        assert_eq!(out.get_int(TASK_IO_SORT_MB), Some(512));
        assert_eq!(out.len(), 10);
    }

    #[test]
    fn test_yarn_with_hbase() {
        init_test_logging();
        let out = compute_defaults_from_local_db(&local_db(fixtures::yarn_with_hbase()), DefaultsVariant::Yarn)
            .unwrap();

        assert_eq!(out.get_text(MAP_JAVA_OPTS), Some("-Xmx410m"));
        assert_eq!(out.get_int(MAP_MEMORY_MB), Some(512));
        assert_eq!(out.get_text(REDUCE_JAVA_OPTS), Some("-Xmx819m"));
        assert_eq!(out.get_int(REDUCE_MEMORY_MB), Some(1024));
        assert_eq!(out.get_text(AM_COMMAND_OPTS), Some("-Xmx819m"));
        assert_eq!(out.get_int(AM_RESOURCE_MB), Some(1024));
        assert_eq!(out.get_int(NODEMANAGER_MEMORY_MB), Some(8192));
        assert_eq!(out.get_int(SCHEDULER_MAX_ALLOCATION_MB), Some(8192));
        assert_eq!(out.get_int(SCHEDULER_MIN_ALLOCATION_MB), Some(1024));
        assert_eq!(out.get_int(TASK_IO_SORT_MB), Some(205));
    }

    #[test]
    fn test_large_node_sizing() {
        let out = compute_defaults(&single_slave(12, 48, 12), DefaultsVariant::Yarn).unwrap();
        assert_eq!(out.get_int(NODEMANAGER_MEMORY_MB), Some(43008));
        assert_eq!(out.get_int(SCHEDULER_MIN_ALLOCATION_MB), Some(2048));
        assert_eq!(out.get_text(MAP_JAVA_OPTS), Some("-Xmx819m"));
        assert_eq!(out.get_text(REDUCE_JAVA_OPTS), Some("-Xmx1638m"));
        assert_eq!(out.get_int(TASK_IO_SORT_MB), Some(410));

        let hbase = compute_defaults(&single_slave(6, 48, 6).with_master(HBASE_MASTER, "master"), DefaultsVariant::Yarn)
            .unwrap();
        assert_eq!(hbase.get_int(NODEMANAGER_MEMORY_MB), Some(33792));
        assert_eq!(hbase.get_int(MAP_MEMORY_MB), Some(1536));
        assert_eq!(hbase.get_text(MAP_JAVA_OPTS), Some("-Xmx1229m"));
        assert_eq!(hbase.get_text(REDUCE_JAVA_OPTS), Some("-Xmx2458m"));
        assert_eq!(hbase.get_int(TASK_IO_SORT_MB), Some(614));
    }

    #[test]
    fn test_tez_overlay() {
        let out = compute_defaults_from_local_db(&local_db(fixtures::yarn_without_hbase()), DefaultsVariant::Tez)
            .unwrap();
        assert_eq!(out.get_int(TEZ_AM_MEMORY_MB), Some(2560));
        assert_eq!(
            out.get_text(TEZ_AM_JAVA_OPTS),
            Some("-server -Xmx2048m -Djava.net.preferIPv4Stack=true -XX:+UseNUMA -XX:+UseParallelGC")
        );
        assert_eq!(out.get_int(NODEMANAGER_MEMORY_MB), Some(20480));
        assert!(out.get(HIVE_TEZ_CONTAINER_SIZE).is_none());
    }

    #[test]
    fn test_hive_overlay() {
        let out = compute_defaults_from_local_db(&local_db(fixtures::yarn_without_hbase()), DefaultsVariant::Hive)
            .unwrap();
        assert_eq!(out.get_int(HIVE_TEZ_CONTAINER_SIZE), Some(1280));
        assert_eq!(
            out.get_text(HIVE_TEZ_JAVA_OPTS),
            Some("-server -Xmx1024m -Djava.net.preferIPv4Stack=true -XX:NewRatio=8 -XX:+UseNUMA -XX:+UseParallelGC")
        );
        assert!(out.get(TEZ_AM_MEMORY_MB).is_none());
        assert!(out.get(TEZ_AM_JAVA_OPTS).is_none());
    }

    #[test]
    fn test_insufficient_local_db() {
        let cases = [
            json!({}),
            json!({ "masterComponentHosts": [] }),
            json!({ "hosts": {} }),
            json!({ "hosts": {}, "masterComponentHosts": [], "slaveComponentHosts": [] }),
        ];
        for case in cases {
            for variant in DefaultsVariant::ALL {
                assert!(compute_defaults_from_local_db(&local_db(case.clone()), variant).is_none());
            }
        }
    }

    #[test]
    fn test_non_numeric_memory_gives_no_result() {
        let mut db = fixtures::yarn_without_hbase();
        db["hosts"]["host2"]["memory"] = json!("unknown");
        assert!(compute_defaults_from_local_db(&local_db(db), DefaultsVariant::Yarn).is_none());
    }

    #[test]
    fn test_idempotent() {
        let snapshot = single_slave(8, 96, 10).with_master(HBASE_MASTER, "master");
        for variant in DefaultsVariant::ALL {
            assert_eq!(compute_defaults(&snapshot, variant), compute_defaults(&snapshot, variant));
        }
    }

    #[test]
    fn test_node_memory_grows_with_ram_within_bands() {
        let expected = [(4, 3072), (6, 4096), (8, 6144), (12, 10240), (16, 14336), (20, 16384), (24, 20480)];
        let mut previous = 0;
        for (ram, memory) in expected {
            let current = node_memory(&single_slave(4, ram, 4));
            assert_eq!(current, memory, "ram {ram} GB");
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn test_node_memory_drops_at_reservation_band_edge() {
        // crossing 24 GB raises the OS reservation and the minimum container size together
        assert_eq!(node_memory(&single_slave(4, 24, 4)), 20480);
        assert_eq!(node_memory(&single_slave(4, 25, 4)), 16384);
    }

    #[test]
    fn test_hbase_never_increases_node_memory() {
        for (cpu, ram, disks) in [(4, 12, 4), (4, 24, 4), (12, 48, 12), (6, 48, 6), (16, 128, 12)] {
            let plain = single_slave(cpu, ram, disks);
            let with_hbase = plain.clone().with_master(HBASE_MASTER, "master");
            assert!(
                node_memory(&with_hbase) <= node_memory(&plain),
                "{cpu} cores / {ram} GB / {disks} disks"
            );
        }
    }

    #[test]
    fn test_recommendations_serialize_flat() {
        let out = compute_defaults_from_local_db(&local_db(fixtures::yarn_with_hbase()), DefaultsVariant::Yarn)
            .unwrap();
        let value = serde_json::to_value(&out).unwrap();
        assert_eq!(value[NODEMANAGER_MEMORY_MB], json!(8192));
        assert_eq!(value[MAP_JAVA_OPTS], json!("-Xmx410m"));
    }
}
