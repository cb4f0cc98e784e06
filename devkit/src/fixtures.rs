/*!
Fixtures local DB

Construit des local DB JSON identiques à ce que le wizard enregistre:
`hosts` (mémoire en KB), `masterComponentHosts`, `slaveComponentHosts`.
*/

use serde_json::{json, Map, Value};

/// Builder de local DB pour les tests
#[derive(Debug, Default)]
pub struct LocalDbBuilder {
    hosts: Map<String, Value>,
    masters: Vec<Value>,
    slaves: Vec<(String, Vec<String>)>,
}

impl LocalDbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute un host avec ses points de montage
    pub fn host(self, name: &str, cpu: u32, memory_kb: &str, mountpoints: &[&str]) -> Self {
        let disks: Vec<Value> = mountpoints.iter().map(|m| json!({ "mountpoint": m })).collect();
        self.raw_host(
            name,
            json!({ "name": name, "cpu": cpu, "memory": memory_kb, "disk_info": disks }),
        )
    }

    /// Ajoute un host avec `disks` disques montés sur "/"
    pub fn host_with_disks(self, name: &str, cpu: u32, memory_kb: &str, disks: usize) -> Self {
        let mounts = vec!["/"; disks];
        self.host(name, cpu, memory_kb, &mounts)
    }

    /// Ajoute un enregistrement host brut (champs invalides, manquants...)
    pub fn raw_host(mut self, name: &str, record: Value) -> Self {
        self.hosts.insert(name.to_string(), record);
        self
    }

    pub fn master(mut self, component: &str, host: &str) -> Self {
        self.masters.push(json!({ "component": component, "hostName": host }));
        self
    }

    /// Ajoute des hosts à un composant slave (fusionne si déjà présent)
    pub fn slave(mut self, component: &str, hosts: &[&str]) -> Self {
        let hosts = hosts.iter().map(|h| h.to_string());
        match self.slaves.iter_mut().find(|(c, _)| c == component) {
            Some((_, existing)) => existing.extend(hosts),
            None => self.slaves.push((component.to_string(), hosts.collect())),
        }
        self
    }

    pub fn build(self) -> Value {
        let slaves: Vec<Value> = self
            .slaves
            .into_iter()
            .map(|(component, hosts)| {
                let hosts: Vec<Value> = hosts.into_iter().map(|h| json!({ "hostName": h })).collect();
                json!({ "componentName": component, "hosts": hosts })
            })
            .collect();

        json!({
            "hosts": Value::Object(self.hosts),
            "masterComponentHosts": self.masters,
            "slaveComponentHosts": slaves,
        })
    }
}

/// Mémoire en KB au format de l'agent (ex: 24 -> "25165824.00")
pub fn gb_as_kb(gb: u64) -> String {
    format!("{}.00", gb * 1024 * 1024)
}

/// Deux hosts 24 GB, NodeManager sur le host 4 cœurs, pas de HBase
pub fn yarn_without_hbase() -> Value {
    LocalDbBuilder::new()
        .host_with_disks("host1", 8, "25165824.00", 8)
        .host_with_disks("host2", 4, "25165824.00", 4)
        .slave("NODEMANAGER", &["host2"])
        .build()
}

/// HBase master sur host1, NodeManager sur un host 12 GB
pub fn yarn_with_hbase() -> Value {
    LocalDbBuilder::new()
        .host_with_disks("host1", 8, "25165824.00", 8)
        .host_with_disks("host2", 4, "12582912.00", 4)
        .master("HBASE_MASTER", "host1")
        .slave("NODEMANAGER", &["host2"])
        .build()
}

/// Liste de cibles de rolling restart `[{component_name, host_id}]`
pub fn restart_targets(component: &str, hosts: &[&str]) -> Value {
    Value::Array(
        hosts
            .iter()
            .map(|h| json!({ "component_name": component, "host_id": h }))
            .collect(),
    )
}
