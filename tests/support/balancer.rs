// ABOUTME: Load balancer fake that renders HAProxy CSV stats from the fake scheduler's state.
// ABOUTME: Can hold old listeners busy, report reloads, or fail stats fetches.

use super::scheduler::FakeScheduler;
use async_trait::async_trait;
use palette::balancer::{LoadBalancerClient, task_service_name};
use palette::http::ClientError;
use palette::scheduler::AppState;
use palette::types::labels;
use parking_lot::Mutex;
use std::sync::Arc;

const HEADER: &str = "# pxname,svname,qcur,qmax,scur,smax,status,\n";

/// How the replaced stack's listeners look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OldListeners {
    /// In maintenance with nothing in flight.
    Drained,
    /// Still serving a session.
    Busy,
}

struct Inner {
    reloads_remaining: u32,
    failed_fetches_remaining: u32,
    fetches: u32,
}

pub struct FakeLoadBalancer {
    scheduler: Arc<FakeScheduler>,
    replicas: usize,
    old_listeners: OldListeners,
    inner: Mutex<Inner>,
}

impl FakeLoadBalancer {
    pub fn new(scheduler: Arc<FakeScheduler>, replicas: usize, old_listeners: OldListeners) -> Self {
        Self {
            scheduler,
            replicas,
            old_listeners,
            inner: Mutex::new(Inner {
                reloads_remaining: 0,
                failed_fetches_remaining: 0,
                fetches: 0,
            }),
        }
    }

    pub fn reloading_for(self, polls: u32) -> Self {
        self.inner.lock().reloads_remaining = polls;
        self
    }

    pub fn failing_fetches(self, count: u32) -> Self {
        self.inner.lock().failed_fetches_remaining = count;
        self
    }

    pub fn fetches(&self) -> u32 {
        self.inner.lock().fetches
    }

    fn render(&self) -> String {
        let Some(new_app) = self.scheduler.latest_submission() else {
            return HEADER.to_string();
        };
        let definition = &new_app.definition;
        let (Some(group), Some(port)) = (
            definition.deployment_group(),
            definition.label(labels::PRIMARY_PORT),
        ) else {
            return HEADER.to_string();
        };
        let proxy = format!("{group}_{port}");

        let mut csv = String::from(HEADER);
        csv.push_str(&format!("{proxy},FRONTEND,,,0,0,OPEN,\n"));
        push_rows(&mut csv, &proxy, &new_app, "UP", 0);

        let (status, sessions) = match self.old_listeners {
            OldListeners::Drained => ("MAINT", 0),
            OldListeners::Busy => ("UP", 3),
        };
        for old in self.scheduler.apps() {
            if old.id() != new_app.id() && old.definition.deployment_group() == Some(group) {
                push_rows(&mut csv, &proxy, &old, status, sessions);
            }
        }
        csv.push_str(&format!("{proxy},BACKEND,0,0,0,0,UP,\n"));
        csv
    }
}

fn push_rows(csv: &mut String, proxy: &str, app: &AppState, status: &str, sessions: u32) {
    for task in &app.tasks {
        if let Some(service) = task_service_name(task) {
            csv.push_str(&format!("{proxy},{service},0,0,{sessions},0,{status},\n"));
        }
    }
}

#[async_trait]
impl LoadBalancerClient for FakeLoadBalancer {
    async fn fetch_stats(&self) -> Result<Vec<String>, ClientError> {
        {
            let mut inner = self.inner.lock();
            inner.fetches += 1;
            if inner.failed_fetches_remaining > 0 {
                inner.failed_fetches_remaining -= 1;
                return Err(ClientError::Status {
                    url: "http://marathon-lb.test:9090/haproxy?stats;csv".to_string(),
                    status: 503,
                    body: "Service Unavailable".to_string(),
                });
            }
        }
        let csv = self.render();
        Ok(vec![csv; self.replicas])
    }

    async fn is_reloading(&self) -> Result<bool, ClientError> {
        let mut inner = self.inner.lock();
        if inner.reloads_remaining > 0 {
            inner.reloads_remaining -= 1;
            return Ok(true);
        }
        Ok(false)
    }

    async fn instance_count(&self) -> Result<usize, ClientError> {
        Ok(self.replicas)
    }
}
