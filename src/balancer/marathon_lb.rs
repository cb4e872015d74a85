// ABOUTME: HTTP client for a DNS-balanced set of Marathon-LB instances.
// ABOUTME: Resolves every replica behind one URL and queries each for pids and stats.

use async_trait::async_trait;
use futures::future::{join_all, try_join_all};
use parking_lot::Mutex;

use crate::http::{ClientError, Endpoint, NoAddressesSnafu, ResolveSnafu};
use snafu::ResultExt;

use super::LoadBalancerClient;

const PIDS_PATH: &str = "/_haproxy_getpids";
const STATS_PATH: &str = "/haproxy?stats;csv";

/// Marathon-LB client addressing every replica individually.
///
/// Marathon-LB is usually load-balanced with DNS, so one URL stands for
/// several instances. Readiness decisions must hold on each of them.
#[derive(Debug)]
pub struct MarathonLb {
    endpoint: Endpoint,
    replicas: Mutex<Option<Vec<Endpoint>>>,
}

impl MarathonLb {
    pub fn new(url: &str) -> Result<Self, ClientError> {
        Ok(Self::with_endpoint(Endpoint::parse(url)?))
    }

    pub fn with_endpoint(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            replicas: Mutex::new(None),
        }
    }

    /// One endpoint per resolved IPv4 address, resolved once per client.
    pub async fn replicas(&self) -> Result<Vec<Endpoint>, ClientError> {
        let cached = self.replicas.lock().clone();
        if let Some(replicas) = cached {
            return Ok(replicas);
        }

        let resolved = resolve_replicas(&self.endpoint).await?;
        tracing::debug!(
            "resolved {} to {} Marathon-LB replica(s)",
            self.endpoint.host(),
            resolved.len()
        );
        *self.replicas.lock() = Some(resolved.clone());
        Ok(resolved)
    }
}

#[async_trait]
impl LoadBalancerClient for MarathonLb {
    async fn fetch_stats(&self) -> Result<Vec<String>, ClientError> {
        let replicas = self.replicas().await?;
        try_join_all(replicas.iter().map(|replica| async move {
            let response = replica.get(STATS_PATH).await?.error_for_status()?;
            Ok::<_, ClientError>(response.text())
        }))
        .await
    }

    async fn is_reloading(&self) -> Result<bool, ClientError> {
        let replicas = self.replicas().await?;
        let answers = join_all(replicas.iter().map(|replica| replica.get(PIDS_PATH))).await;

        for (replica, answer) in replicas.iter().zip(answers) {
            // An instance that is unreachable, starting, or mid-reload does
            // not report exactly one pid.
            let pids = match answer {
                Ok(response) if response.is_success() => response.text().split_whitespace().count(),
                Ok(response) => {
                    tracing::debug!("{} returned {}", replica.url(PIDS_PATH), response.status);
                    0
                }
                Err(e) => {
                    tracing::debug!("{}", e);
                    0
                }
            };
            if pids != 1 {
                tracing::debug!("{} reports {} pid(s)", replica.host(), pids);
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn instance_count(&self) -> Result<usize, ClientError> {
        Ok(self.replicas().await?.len())
    }
}

/// Resolve the endpoint's host to all of its IPv4 addresses.
async fn resolve_replicas(endpoint: &Endpoint) -> Result<Vec<Endpoint>, ClientError> {
    let host = endpoint.host();
    let addrs = tokio::net::lookup_host((host, endpoint.port()))
        .await
        .context(ResolveSnafu { host })?;

    let mut ips: Vec<String> = addrs
        .filter(|addr| addr.is_ipv4())
        .map(|addr| addr.ip().to_string())
        .collect();
    ips.sort();
    ips.dedup();

    if ips.is_empty() {
        return NoAddressesSnafu { host }.fail();
    }
    Ok(ips.into_iter().map(|ip| endpoint.with_host(ip)).collect())
}
