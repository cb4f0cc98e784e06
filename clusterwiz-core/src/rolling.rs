//! Rolling restart planning
//!
//! Decides which slave components may be restarted in batches, proposes batch
//! parameters for a target count, checks operator-entered parameters and cuts
//! the target list into ordered batches. Sending the per-batch restart
//! requests is left to the caller.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Components that tolerate being restarted a few hosts at a time
pub const ROLLING_RESTART_COMPONENTS: [&str; 5] =
    ["DATANODE", "NODEMANAGER", "TASKTRACKER", "HBASE_REGIONSERVER", "SUPERVISOR"];

/// Service -> the component restarted when the whole service rolls
const SERVICE_ROLLING_COMPONENTS: [(&str, &str); 5] = [
    ("HDFS", "DATANODE"),
    ("YARN", "NODEMANAGER"),
    ("MAPREDUCE", "TASKTRACKER"),
    ("HBASE", "HBASE_REGIONSERVER"),
    ("STORM", "SUPERVISOR"),
];

/// Targets per batch step when proposing defaults
const TARGETS_PER_DEFAULT_BATCH_STEP: u32 = 10;
pub const DEFAULT_INTER_BATCH_WAIT_SECONDS: u32 = 120;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RestartTarget {
    pub component_name: String,
    pub host_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub targets: Vec<RestartTarget>,
}

/// Ordered batches; their concatenation is the original target list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartBatchPlan {
    pub batches: Vec<Batch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchParameters {
    pub batch_size: u32,
    pub tolerate_failure_count: u32,
    pub inter_batch_wait_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchParameterError {
    #[error("there are no hosts to restart")]
    NoTargets,
    #[error("{field} must be an integer, got '{value}'")]
    NotAnInteger { field: String, value: String },
    #[error("batch size must be between 1 and {max}, got {value}")]
    BatchSizeOutOfRange { value: u32, max: u32 },
    #[error("tolerated failures must be between 0 and {max}, got {value}")]
    ToleranceOutOfRange { value: u32, max: u32 },
}

impl RestartTarget {
    pub fn new<C: Into<String>, H: Into<String>>(component_name: C, host_id: H) -> Self {
        Self {
            component_name: component_name.into(),
            host_id: host_id.into(),
        }
    }
}

impl Batch {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn host_ids(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|t| t.host_id.as_str())
    }
}

impl RestartBatchPlan {
    pub fn new(targets: &[RestartTarget], batch_size: i64) -> Self {
        Self {
            batches: partition_into_batches(targets, batch_size),
        }
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    pub fn target_count(&self) -> usize {
        self.batches.iter().map(Batch::len).sum()
    }

    /// Targets in restart order
    pub fn targets(&self) -> impl Iterator<Item = &RestartTarget> {
        self.batches.iter().flat_map(|b| b.targets.iter())
    }
}

impl BatchParameters {
    /// Checks operator-supplied parameters against the number of targets,
    /// reporting every problem at once.
    pub fn validate(&self, target_count: usize) -> Vec<BatchParameterError> {
        if target_count == 0 {
            return vec![BatchParameterError::NoTargets];
        }
        let max = u32::try_from(target_count).unwrap_or(u32::MAX);

        let mut errors = Vec::new();
        if self.batch_size < 1 || self.batch_size > max {
            errors.push(BatchParameterError::BatchSizeOutOfRange { value: self.batch_size, max });
        }
        if self.tolerate_failure_count > max {
            errors.push(BatchParameterError::ToleranceOutOfRange {
                value: self.tolerate_failure_count,
                max,
            });
        }
        errors
    }
}

/// Whether `component_name` can go through a rolling restart
pub fn is_rolling_restart_supported(component_name: &str) -> bool {
    ROLLING_RESTART_COMPONENTS.iter().any(|c| *c == component_name)
}

/// Component rolled when restarting the whole `service_name`
pub fn rolling_restart_component(service_name: &str) -> Option<&'static str> {
    SERVICE_ROLLING_COMPONENTS
        .iter()
        .find(|(service, _)| *service == service_name)
        .map(|(_, component)| *component)
}

/// Splits `targets` into contiguous batches of `batch_size`, the last one
/// holding the remainder. A non-positive size puts everything in one batch.
pub fn partition_into_batches(targets: &[RestartTarget], batch_size: i64) -> Vec<Batch> {
    if targets.is_empty() {
        return Vec::new();
    }
    let chunk = usize::try_from(batch_size)
        .ok()
        .filter(|size| *size > 0)
        .unwrap_or(targets.len());

    let batches: Vec<Batch> = targets
        .chunks(chunk)
        .map(|c| Batch { targets: c.to_vec() })
        .collect();
    debug!("{} restart targets split into {} batches of up to {}", targets.len(), batches.len(), chunk);
    batches
}

/// Batch size actually used for `target_count` targets: a non-positive or
/// oversized request means a single batch holding every target.
pub fn effective_batch_size(requested: i64, target_count: usize) -> u32 {
    let all = u32::try_from(target_count).unwrap_or(u32::MAX);
    match u32::try_from(requested) {
        Ok(size) if size > 0 && size <= all => size,
        _ => all,
    }
}

/// Proposed parameters for restarting `target_count` components: one host at
/// a time for small sets, otherwise about ten batches.
pub fn initialize_batch_parameters(target_count: u32) -> BatchParameters {
    let batch_size = if target_count > TARGETS_PER_DEFAULT_BATCH_STEP {
        target_count.div_ceil(TARGETS_PER_DEFAULT_BATCH_STEP)
    } else {
        1
    };
    BatchParameters {
        batch_size,
        tolerate_failure_count: batch_size,
        inter_batch_wait_seconds: DEFAULT_INTER_BATCH_WAIT_SECONDS,
    }
}

/// Parses an operator-entered parameter (surrounding whitespace allowed)
pub fn parse_parameter(field: &str, raw: &str) -> Result<u32, BatchParameterError> {
    raw.trim().parse::<u32>().map_err(|_| BatchParameterError::NotAnInteger {
        field: field.to_string(),
        value: raw.to_string(),
    })
}
