use clusterwiz_core::DefaultsVariant;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct KernelConfig {
    pub local_db: PathBuf,
    #[serde(default = "all_variants")]
    pub variants: Vec<DefaultsVariant>,
    #[serde(default)]
    pub rolling: Option<RollingConf>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RollingConf {
    pub targets: PathBuf, // ex: "./data/restart_targets.json"
    // signed so that a zero or negative size still parses; it means one batch
    pub batch_size: Option<i64>,
    pub tolerate_failures: Option<i64>,
    pub inter_batch_wait_seconds: Option<i64>,
}

fn all_variants() -> Vec<DefaultsVariant> {
    DefaultsVariant::ALL.to_vec()
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            local_db: PathBuf::from("./data/local_db.json"),
            variants: all_variants(),
            rolling: None,
        }
    }
}

pub async fn load_config() -> KernelConfig {
    let path = std::env::var("CLUSTERWIZ_CONFIG").unwrap_or_else(|_| "kernel.yaml".into());
    load_config_from(&path).await
}

pub async fn load_config_from<P: AsRef<Path>>(path: P) -> KernelConfig {
    let path = path.as_ref();
    if path.exists() {
        let txt = fs::read_to_string(path).await.unwrap_or_default();
        if txt.trim().is_empty() { return KernelConfig::default(); }
        serde_yaml::from_str(&txt).unwrap_or_else(|e| {
            warn!("invalid config {}: {e}", path.display());
            KernelConfig::default()
        })
    } else {
        warn!("no {}, using default config", path.display());
        KernelConfig::default()
    }
}
