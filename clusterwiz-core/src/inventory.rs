//! Local DB inventory
//!
//! The install wizard keeps host and component placement records in its
//! local DB. This module accepts that JSON shape as-is and converts it into a
//! [`HostTopologySnapshot`]:
//! - `cpu` may be a number or a numeric string
//! - `memory` is in kilobytes, number or numeric string
//! - only data disks count (home, device and tmp mounts are skipped)

use crate::topology::{HostResources, HostTopologySnapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Mount point prefixes that never hold data disks
const EXCLUDED_MOUNT_PREFIXES: [&str; 4] = ["/home/", "/homes/", "/dev/", "/tmp/"];

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("local DB has no hosts")]
    MissingHosts,
    #[error("local DB has neither master nor slave component hosts")]
    MissingComponentHosts,
    #[error("invalid local DB JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalDb {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts: Option<BTreeMap<String, HostRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_component_hosts: Option<Vec<MasterComponentHost>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slave_component_hosts: Option<Vec<SlaveComponentHosts>>,
}

/// Raw host record as registered by the agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cpu: Option<Value>,
    /// Kilobytes
    #[serde(default)]
    pub memory: Option<Value>,
    #[serde(default)]
    pub disk_info: Vec<DiskInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskInfo {
    #[serde(default)]
    pub mountpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterComponentHost {
    pub component: String,
    pub host_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaveComponentHosts {
    pub component_name: String,
    #[serde(default)]
    pub hosts: Vec<SlaveHost>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaveHost {
    pub host_name: String,
}

impl LocalDb {
    pub fn from_json(text: &str) -> Result<Self, InventoryError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_value(value: Value) -> Result<Self, InventoryError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Builds the topology snapshot the calculator works from
    pub fn to_snapshot(&self) -> Result<HostTopologySnapshot, InventoryError> {
        let hosts = self.hosts.as_ref().ok_or(InventoryError::MissingHosts)?;
        if self.master_component_hosts.is_none() && self.slave_component_hosts.is_none() {
            return Err(InventoryError::MissingComponentHosts);
        }

        let mut snapshot = HostTopologySnapshot::new();
        for (host_id, record) in hosts {
            snapshot = snapshot.with_host(host_id.clone(), record.resources());
        }
        for master in self.master_component_hosts.iter().flatten() {
            snapshot = snapshot.with_master(master.component.clone(), master.host_name.clone());
        }
        for slave in self.slave_component_hosts.iter().flatten() {
            snapshot = snapshot.with_slave(
                slave.component_name.clone(),
                slave.hosts.iter().map(|h| h.host_name.clone()),
            );
        }

        debug!(
            "local DB snapshot: {} hosts, {} master / {} slave assignments",
            snapshot.hosts.len(),
            snapshot.master_assignments.len(),
            snapshot.slave_assignments.len()
        );
        Ok(snapshot)
    }
}

impl HostRecord {
    pub fn resources(&self) -> HostResources {
        HostResources {
            cpu_cores: self.cpu.as_ref().and_then(parse_count),
            ram_bytes: self
                .memory
                .as_ref()
                .and_then(parse_number)
                .map(|kb| (kb * 1024.0).round() as u64),
            disk_mount_count: Some(usable_disk_mounts(&self.disk_info)),
        }
    }
}

/// Whether a mount point can hold a data disk
pub fn is_data_mount(mountpoint: &str) -> bool {
    !EXCLUDED_MOUNT_PREFIXES.iter().any(|prefix| mountpoint.starts_with(prefix))
}

pub fn usable_disk_mounts(disks: &[DiskInfo]) -> u32 {
    disks.iter().filter(|d| is_data_mount(&d.mountpoint)).count() as u32
}

fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (number.is_finite() && number >= 0.0).then_some(number)
}

fn parse_count(value: &Value) -> Option<u32> {
    parse_number(value).map(|n| n.trunc() as u32)
}
