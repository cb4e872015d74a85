// ABOUTME: Deployment state marker types for the type state pattern.
// ABOUTME: Zero-sized types enforce valid state transitions at compile time.

use crate::scheduler::DeploymentHandle;

/// Prepared: definition validated and allocated, nothing submitted yet.
/// Available actions: `submit()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Prepared;

/// Submitted: the scheduler accepted the new stack and is rolling it out.
/// Available actions: `await_scheduler()`, `rollback()`
#[derive(Debug, Clone)]
pub struct Submitted {
    pub(crate) handle: DeploymentHandle,
}

/// Deployed: the scheduler reports the new stack healthy.
/// Available actions: `await_cutover()`, `rollback()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Deployed;

/// Cut over: the load balancer routes all traffic to the new stack.
/// Available actions: `retire_old()`
#[derive(Debug, Clone, Copy, Default)]
pub struct CutOver;

/// Completed: the old stack is gone.
/// Available actions: `finish()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Completed;
