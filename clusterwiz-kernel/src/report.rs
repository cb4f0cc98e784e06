//! Report assembly: defaults per variant plus an optional rolling restart plan

use crate::config::{KernelConfig, RollingConf};
use anyhow::{Context, Result};
use clusterwiz_core::rolling::{effective_batch_size, initialize_batch_parameters, is_rolling_restart_supported};
use clusterwiz_core::{compute_defaults_from_local_db, BatchParameters, LocalDb, Recommendations, RestartBatchPlan, RestartTarget};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub struct Report {
    /// `null` per variant when the topology is insufficient
    pub defaults: BTreeMap<String, Option<Recommendations>>,
    pub rolling: Option<RollingReport>,
}

#[derive(Debug, Serialize)]
pub struct RollingReport {
    pub parameters: BatchParameters,
    /// Targets whose component cannot roll; they need a regular restart
    pub unsupported: Vec<RestartTarget>,
    pub errors: Vec<String>,
    pub plan: Option<RestartBatchPlan>,
}

pub async fn build_report(config: &KernelConfig) -> Result<Report> {
    let db = read_local_db(&config.local_db).await?;

    let mut defaults = BTreeMap::new();
    for variant in &config.variants {
        let recommendations = compute_defaults_from_local_db(&db, *variant);
        match &recommendations {
            Some(r) => info!("{} defaults: {} keys", variant, r.len()),
            None => warn!("{} defaults left blank, topology is insufficient", variant),
        }
        defaults.insert(variant.to_string(), recommendations);
    }

    let rolling = match &config.rolling {
        Some(conf) => {
            let targets = read_targets(&conf.targets).await?;
            Some(plan_rolling_restart(targets, conf))
        }
        None => None,
    };

    Ok(Report { defaults, rolling })
}

/// Splits off non-rolling components, fills parameters the operator left
/// out and plans batches only when the parameters check out. A zero,
/// negative or oversized batch size means a single batch.
pub fn plan_rolling_restart(targets: Vec<RestartTarget>, conf: &RollingConf) -> RollingReport {
    let (supported, unsupported): (Vec<_>, Vec<_>) = targets
        .into_iter()
        .partition(|t| is_rolling_restart_supported(&t.component_name));
    for target in &unsupported {
        warn!("{} on {} does not support rolling restart", target.component_name, target.host_id);
    }

    let proposed = initialize_batch_parameters(u32::try_from(supported.len()).unwrap_or(u32::MAX));
    let batch_size = match conf.batch_size {
        Some(requested) if !supported.is_empty() => {
            let size = effective_batch_size(requested, supported.len());
            if i64::from(size) != requested {
                warn!("batch size {} outside 1..={}, restarting in a single batch", requested, supported.len());
            }
            size
        }
        _ => proposed.batch_size,
    };
    let parameters = BatchParameters {
        batch_size,
        tolerate_failure_count: non_negative(conf.tolerate_failures, proposed.tolerate_failure_count),
        inter_batch_wait_seconds: non_negative(conf.inter_batch_wait_seconds, proposed.inter_batch_wait_seconds),
    };

    let errors: Vec<String> = parameters.validate(supported.len()).iter().map(ToString::to_string).collect();
    let plan = if errors.is_empty() {
        let plan = RestartBatchPlan::new(&supported, i64::from(parameters.batch_size));
        info!("rolling restart: {} targets in {} batches", plan.target_count(), plan.batch_count());
        Some(plan)
    } else {
        for error in &errors {
            warn!("rolling restart parameters rejected: {}", error);
        }
        None
    };

    RollingReport { parameters, unsupported, errors, plan }
}

fn non_negative(value: Option<i64>, default: u32) -> u32 {
    match value {
        Some(v) => u32::try_from(v.max(0)).unwrap_or(u32::MAX),
        None => default,
    }
}

async fn read_local_db(path: &Path) -> Result<LocalDb> {
    let txt = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read local DB {}", path.display()))?;
    LocalDb::from_json(&txt).with_context(|| format!("Failed to parse local DB {}", path.display()))
}

async fn read_targets(path: &Path) -> Result<Vec<RestartTarget>> {
    let txt = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read restart targets {}", path.display()))?;
    serde_json::from_str(&txt).with_context(|| format!("Failed to parse restart targets {}", path.display()))
}
