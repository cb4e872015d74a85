// ABOUTME: Narrows merged load balancer listeners down to one blue-green application.
// ABOUTME: Matches listeners to scheduler tasks by HAProxy's server naming convention.

use crate::scheduler::{AppState, Task};
use crate::types::{AppDefinition, labels};

use super::stats::{Listener, ListenerStatus};

/// HAProxy proxy name for a blue-green app: `{deployment_group}_{primary_port}`.
///
/// Both colors of a group share the primary port label, so the same proxy
/// carries the listeners of the old and the new stack. Returns `None` when
/// either label is missing, in which case nothing matches.
pub fn proxy_name(app: &AppDefinition) -> Option<String> {
    let group = app.deployment_group()?;
    let port = app.label(labels::PRIMARY_PORT)?;
    Some(format!("{}_{}", group, port.trim()))
}

/// HAProxy server name for a task: host with dots replaced by underscores,
/// then its first port, e.g. `10_0_6_25_16916`.
pub fn task_service_name(task: &Task) -> Option<String> {
    let port = task.ports.first()?;
    Some(format!("{}_{}", task.host.replace('.', "_"), port))
}

/// The listeners belonging to one application, across every load balancer replica.
#[derive(Debug)]
pub struct ApplicationStats<'a> {
    listeners: Vec<&'a Listener>,
}

impl<'a> ApplicationStats<'a> {
    /// Select the listeners under the application's proxy.
    pub fn new(app: &AppDefinition, all: &'a [Listener]) -> Self {
        let listeners = match proxy_name(app) {
            Some(proxy) => all.iter().filter(|l| l.proxy_name == proxy).collect(),
            None => {
                tracing::debug!("{} has no proxy labels, no listeners match", app.id);
                Vec::new()
            }
        };
        Self { listeners }
    }

    pub fn listeners(&self) -> &[&'a Listener] {
        &self.listeners
    }

    pub fn listeners_with_status(&self, status: &ListenerStatus) -> Vec<&'a Listener> {
        self.listeners
            .iter()
            .copied()
            .filter(|l| &l.status == status)
            .collect()
    }

    /// Every task of the app has exactly one UP listener per replica, and the
    /// app runs as many tasks as its target instance label asks for.
    pub fn new_app_is_up(&self, app: &AppState, replicas: usize) -> bool {
        let target = match app.definition.target_instances() {
            Ok(Some(target)) => target as usize,
            Ok(None) => {
                tracing::debug!("{} has no target instance label", app.definition.id);
                return false;
            }
            Err(e) => {
                tracing::warn!("{}", e);
                return false;
            }
        };
        if app.tasks.len() != target {
            tracing::debug!(
                "{} runs {} of {} target tasks",
                app.definition.id,
                app.tasks.len(),
                target
            );
            return false;
        }

        let up = self.listeners_with_status(&ListenerStatus::Up);
        tasks_have_listeners(&app.tasks, &up, replicas)
    }

    /// Every task of the app has exactly one drained MAINT listener per replica.
    pub fn old_app_is_drained(&self, app: &AppState, replicas: usize) -> bool {
        let drained: Vec<&Listener> = self
            .listeners
            .iter()
            .copied()
            .filter(|l| l.is_drained())
            .collect();
        tasks_have_listeners(&app.tasks, &drained, replicas)
    }
}

/// Each task must be matched by exactly `replicas` listeners.
///
/// A task whose name cannot be derived, or whose listeners are missing,
/// fails the check. With no replicas known nothing can be confirmed.
fn tasks_have_listeners(tasks: &[Task], listeners: &[&Listener], replicas: usize) -> bool {
    if replicas == 0 {
        return false;
    }

    tasks.iter().all(|task| {
        let Some(name) = task_service_name(task) else {
            tracing::debug!("task {} has no ports", task.id);
            return false;
        };
        let matched = listeners.iter().filter(|l| l.service_name == name).count();
        if matched != replicas {
            tracing::debug!(
                "task {} has {} matching listeners, expected {}",
                task.id,
                matched,
                replicas
            );
        }
        matched == replicas
    })
}
