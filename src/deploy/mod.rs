// ABOUTME: Deployment orchestration using the type state pattern.
// ABOUTME: Exports the allocator, validator, waiters, strategies, and the Deployment state machine.

mod allocate;
mod bluegreen;
mod cutover;
mod deployment;
mod error;
mod monitor;
mod settings;
mod standard;
mod state;
mod strategy;
mod transitions;
mod validate;

pub use allocate::{AllocationContext, DEFAULT_MAX_PORT_PROBES, PortColorAllocator};
pub use bluegreen::{BlueGreenDeployment, PreparedApp, latest_stack};
pub use cutover::{CutoverOutcome, CutoverWaitContext, CutoverWaiter};
pub use deployment::Deployment;
pub use error::{DeployError, DeployErrorKind, FailureCause};
pub use monitor::{
    DeploymentStatus, FailureReason, MonitorOutcome, SchedulerDeploymentMonitor, deployment_status,
};
pub use settings::{DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT, DeploySettings};
pub use standard::StandardDeployment;
pub use state::{Completed, CutOver, Deployed, Prepared, Submitted};
pub use strategy::DeployStrategy;
pub use transitions::TransitionResult;
pub use validate::{
    PreflightValidator, REQUIRED_LABELS, ValidationError, check_cluster_state, check_labels,
    stacks_in_group,
};
