//! Host topology snapshot and the derived cluster aggregate
//!
//! The snapshot is what the wizard knows about the cluster when it asks for
//! recommendations: host hardware plus master/slave role placement. The
//! aggregate condenses it into the weakest-node figures the sizing works from.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Master component whose presence reserves memory for HBase on slave nodes
pub const HBASE_MASTER: &str = "HBASE_MASTER";

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Hardware capacity of one host.
///
/// `None` means the inventory had no usable value for the field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostResources {
    pub cpu_cores: Option<u32>,
    pub ram_bytes: Option<u64>,
    pub disk_mount_count: Option<u32>,
}

/// Master role placement (one host per entry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterAssignment {
    pub component_name: String,
    pub host_id: String,
}

/// Slave role placement (set of hosts per entry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaveAssignment {
    pub component_name: String,
    pub host_ids: BTreeSet<String>,
}

/// Immutable view of the cluster handed to the calculator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostTopologySnapshot {
    pub hosts: BTreeMap<String, HostResources>,
    #[serde(default)]
    pub master_assignments: Vec<MasterAssignment>,
    #[serde(default)]
    pub slave_assignments: Vec<SlaveAssignment>,
}

/// Weakest-node capacity over the reference slave hosts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterAggregate {
    pub ram_gb: f64,
    pub cpu_cores: u32,
    pub disk_count: u32,
    pub hbase_installed: bool,
}

impl HostResources {
    pub fn new(cpu_cores: u32, ram_bytes: u64, disk_mount_count: u32) -> Self {
        Self {
            cpu_cores: Some(cpu_cores),
            ram_bytes: Some(ram_bytes),
            disk_mount_count: Some(disk_mount_count),
        }
    }

    /// Same as `new` with RAM given in whole GiB
    pub fn with_ram_gb(cpu_cores: u32, ram_gb: u64, disk_mount_count: u32) -> Self {
        Self::new(cpu_cores, ram_gb * 1024 * 1024 * 1024, disk_mount_count)
    }
}

impl HostTopologySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host<S: Into<String>>(mut self, host_id: S, resources: HostResources) -> Self {
        self.hosts.insert(host_id.into(), resources);
        self
    }

    pub fn with_master<C: Into<String>, H: Into<String>>(mut self, component: C, host_id: H) -> Self {
        self.master_assignments.push(MasterAssignment {
            component_name: component.into(),
            host_id: host_id.into(),
        });
        self
    }

    pub fn with_slave<C, I, H>(mut self, component: C, host_ids: I) -> Self
    where
        C: Into<String>,
        I: IntoIterator<Item = H>,
        H: Into<String>,
    {
        let component = component.into();
        let host_ids = host_ids.into_iter().map(Into::into);
        match self.slave_assignments.iter_mut().find(|s| s.component_name == component) {
            Some(existing) => existing.host_ids.extend(host_ids),
            None => self.slave_assignments.push(SlaveAssignment {
                component_name: component,
                host_ids: host_ids.collect(),
            }),
        }
        self
    }

    pub fn hbase_installed(&self) -> bool {
        self.master_assignments.iter().any(|m| m.component_name == HBASE_MASTER)
    }

    /// Hosts running `component` as a slave, `None` when no assignment names it
    pub fn slave_hosts(&self, component: &str) -> Option<BTreeSet<&str>> {
        let mut found = false;
        let mut hosts = BTreeSet::new();
        for assignment in self.slave_assignments.iter().filter(|s| s.component_name == component) {
            found = true;
            hosts.extend(assignment.host_ids.iter().map(String::as_str));
        }
        found.then_some(hosts)
    }

    /// Host ids referenced by an assignment but absent from `hosts`
    pub fn unknown_host_references(&self) -> BTreeSet<&str> {
        let masters = self.master_assignments.iter().map(|m| m.host_id.as_str());
        let slaves = self.slave_assignments.iter().flat_map(|s| s.host_ids.iter().map(String::as_str));
        masters
            .chain(slaves)
            .filter(|id| !self.hosts.contains_key(*id))
            .collect()
    }
}

impl ClusterAggregate {
    /// Minimum RAM / cores / disks over the hosts running `reference_role`.
    ///
    /// Returns `None` whenever the snapshot does not hold enough data to size
    /// conservatively: no hosts, dangling host references, no assignment for
    /// the role, or an unknown numeric field on one of its hosts.
    pub fn from_snapshot(snapshot: &HostTopologySnapshot, reference_role: &str) -> Option<Self> {
        if snapshot.hosts.is_empty() {
            warn!("topology has no hosts, cannot size {}", reference_role);
            return None;
        }

        let unknown = snapshot.unknown_host_references();
        if !unknown.is_empty() {
            warn!("assignments reference unknown hosts: {:?}", unknown);
            return None;
        }

        let Some(hosts) = snapshot.slave_hosts(reference_role) else {
            warn!("no slave assignment for {}", reference_role);
            return None;
        };

        let mut min_ram: Option<u64> = None;
        let mut min_cpu: Option<u32> = None;
        let mut min_disk: Option<u32> = None;

        for host_id in &hosts {
            let resources = snapshot.hosts.get(*host_id)?;
            let (Some(cpu), Some(ram), Some(disk)) =
                (resources.cpu_cores, resources.ram_bytes, resources.disk_mount_count)
            else {
                warn!("host {} has incomplete hardware data", host_id);
                return None;
            };
            min_cpu = Some(min_cpu.map_or(cpu, |m| m.min(cpu)));
            min_ram = Some(min_ram.map_or(ram, |m| m.min(ram)));
            min_disk = Some(min_disk.map_or(disk, |m| m.min(disk)));
        }

        let (Some(ram), Some(cpu_cores), Some(disk_count)) = (min_ram, min_cpu, min_disk) else {
            warn!("{} has no hosts assigned", reference_role);
            return None;
        };

        let aggregate = Self {
            ram_gb: ram as f64 / BYTES_PER_GB,
            cpu_cores,
            disk_count,
            hbase_installed: snapshot.hbase_installed(),
        };
        debug!(
            "cluster aggregate over {} {} hosts: {:.2} GB, {} cores, {} disks, hbase={}",
            hosts.len(),
            reference_role,
            aggregate.ram_gb,
            aggregate.cpu_cores,
            aggregate.disk_count,
            aggregate.hbase_installed
        );
        Some(aggregate)
    }
}
