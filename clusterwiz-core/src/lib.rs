//! ClusterWiz core - computational pieces of the cluster install wizard
//!
//! Provides:
//! - Host topology snapshot and derived cluster aggregate
//! - Local DB inventory parsing (wizard host/component data)
//! - YARN / Tez / Hive configuration defaults sizing
//! - Rolling restart support checks and batch planning
//!
//! Every operation is a pure function over its arguments: nothing here does
//! I/O or keeps state between calls.

pub mod defaults;
pub mod inventory;
pub mod rolling;
pub mod topology;

pub use defaults::{compute_defaults, compute_defaults_from_local_db, ConfigValue, DefaultsVariant, Recommendations};
pub use inventory::{InventoryError, LocalDb};
pub use rolling::{
    initialize_batch_parameters, is_rolling_restart_supported, partition_into_batches, Batch,
    BatchParameterError, BatchParameters, RestartBatchPlan, RestartTarget,
};
pub use topology::{ClusterAggregate, HostResources, HostTopologySnapshot, MasterAssignment, SlaveAssignment};
