// ABOUTME: Generic blue-green deployment of one application, parameterized by state marker.
// ABOUTME: Carries the allocated definition, the stack it replaces, and the shared deadline.

use std::time::Instant;

use crate::types::{AppDefinition, AppId};

use super::state::Prepared;

/// A deployment in progress, parameterized by its current state.
///
/// The state type parameter `S` carries state-specific data (like the
/// scheduler's deployment handle) directly in the state type, so the handle
/// exists exactly when a submission has happened.
#[derive(Debug)]
pub struct Deployment<S> {
    pub(crate) app: AppDefinition,
    pub(crate) old_app: Option<AppId>,
    pub(crate) deadline: Instant,
    pub(crate) state: S,
}

impl Deployment<Prepared> {
    /// Create a deployment for an allocated definition.
    ///
    /// `old_app` is the stack this one replaces, `None` on a group's first
    /// deploy. Every wait of this deployment ends at `deadline`.
    pub fn new(app: AppDefinition, old_app: Option<AppId>, deadline: Instant) -> Self {
        Deployment {
            app,
            old_app,
            deadline,
            state: Prepared,
        }
    }
}

impl<S> Deployment<S> {
    /// The allocated definition of the new stack.
    pub fn app(&self) -> &AppDefinition {
        &self.app
    }

    pub fn app_id(&self) -> &AppId {
        &self.app.id
    }

    /// The stack being replaced (None on first deploy).
    pub fn old_app(&self) -> Option<&AppId> {
        self.old_app.as_ref()
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}
