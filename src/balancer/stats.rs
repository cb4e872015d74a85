// ABOUTME: Parser for HAProxy's CSV statistics as served by Marathon-LB.
// ABOUTME: Produces one Listener per backend server row, skipping comments and pseudo-services.

use std::collections::HashMap;
use thiserror::Error;

/// Pseudo-service rows HAProxy emits per proxy alongside real servers.
const PSEUDO_SERVICES: [&str; 2] = ["FRONTEND", "BACKEND"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatsError {
    #[error("stats output is empty")]
    Empty,

    #[error("stats header is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("stats row {row} has {found} columns, header declares {expected}")]
    ShortRow {
        row: usize,
        found: usize,
        expected: usize,
    },
}

/// Load balancer health state of one listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerStatus {
    Up,
    Maint,
    Other(String),
}

impl ListenerStatus {
    fn parse(raw: &str) -> Self {
        match raw.trim() {
            "UP" => ListenerStatus::Up,
            "MAINT" => ListenerStatus::Maint,
            other => ListenerStatus::Other(other.to_string()),
        }
    }
}

/// One backend server entry as tracked by a single load balancer instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listener {
    /// Proxy name, `{deployment_group}_{port}` for blue-green apps.
    pub proxy_name: String,
    /// Server name, `{host_with_underscores}_{port}` for scheduler tasks.
    pub service_name: String,
    pub status: ListenerStatus,
    /// Currently queued requests.
    pub queued: u64,
    /// Currently active sessions.
    pub sessions: u64,
}

impl Listener {
    /// Whether requests are still queued on, or being served by, this listener.
    pub fn has_pending_requests(&self) -> bool {
        self.queued > 0 || self.sessions > 0
    }

    /// In maintenance with nothing in flight.
    pub fn is_drained(&self) -> bool {
        self.status == ListenerStatus::Maint && !self.has_pending_requests()
    }
}

/// Parse the CSV stats of a single load balancer instance.
///
/// The first line is the header (`# pxname,svname,...`). Later lines starting
/// with `#` are comments. `FRONTEND` and `BACKEND` rows are aggregates, not
/// servers, and are dropped.
pub fn parse_instance_stats(raw: &str) -> Result<Vec<Listener>, StatsError> {
    let mut lines = raw.lines().filter(|l| !l.trim().is_empty());
    let header = lines.next().ok_or(StatsError::Empty)?;
    let columns = Columns::from_header(header)?;

    let mut listeners = Vec::new();
    for (index, line) in lines.enumerate() {
        if line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split(',').collect();
        let proxy_name = columns.field(&fields, columns.pxname, index)?;
        let service_name = columns.field(&fields, columns.svname, index)?;
        if PSEUDO_SERVICES.contains(&service_name) {
            continue;
        }

        listeners.push(Listener {
            proxy_name: proxy_name.to_string(),
            service_name: service_name.to_string(),
            status: ListenerStatus::parse(columns.field(&fields, columns.status, index)?),
            queued: columns.counter(&fields, columns.qcur),
            sessions: columns.counter(&fields, columns.scur),
        });
    }

    Ok(listeners)
}

/// Parse and merge the stats of every load balancer instance.
pub fn parse_stats<S: AsRef<str>>(instances: &[S]) -> Result<Vec<Listener>, StatsError> {
    let mut merged = Vec::new();
    for raw in instances {
        merged.extend(parse_instance_stats(raw.as_ref())?);
    }
    Ok(merged)
}

/// Column positions resolved from the header line.
struct Columns {
    pxname: usize,
    svname: usize,
    status: usize,
    qcur: Option<usize>,
    scur: Option<usize>,
}

impl Columns {
    fn from_header(header: &str) -> Result<Self, StatsError> {
        let names: HashMap<&str, usize> = header
            .trim_start_matches('#')
            .trim()
            .trim_end_matches(',')
            .split(',')
            .enumerate()
            .map(|(i, name)| (name.trim(), i))
            .collect();

        let required = |name: &'static str| {
            names
                .get(name)
                .copied()
                .ok_or(StatsError::MissingColumn(name))
        };

        Ok(Self {
            pxname: required("pxname")?,
            svname: required("svname")?,
            status: required("status")?,
            qcur: names.get("qcur").copied(),
            scur: names.get("scur").copied(),
        })
    }

    fn field<'a>(
        &self,
        fields: &[&'a str],
        column: usize,
        row: usize,
    ) -> Result<&'a str, StatsError> {
        fields
            .get(column)
            .map(|f| f.trim())
            .ok_or(StatsError::ShortRow {
                row,
                found: fields.len(),
                expected: column + 1,
            })
    }

    /// Numeric counters are blank for some rows; blank and absent read as zero.
    fn counter(&self, fields: &[&str], column: Option<usize>) -> u64 {
        column
            .and_then(|c| fields.get(c))
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATS: &str = "\
# pxname,svname,qcur,qmax,scur,smax,slim,stot,status,
stats,FRONTEND,,,0,1,2000,5,OPEN,
http-in,FRONTEND,,,1,3,2000,40,OPEN,
http-in,IPv4-direct,0,0,0,0,,0,no check,
# a comment that should be skipped
my-app_11090,10_0_6_25_16916,0,0,0,1,,10,UP,
my-app_11090,10_0_6_25_31184,0,0,2,4,,12,MAINT,
my-app_11090,10_0_6_26_23336,,0,,0,,0,MAINT,
my-app_11090,BACKEND,0,0,2,5,200,22,UP,
";

    #[test]
    fn skips_pseudo_services_and_comments() {
        let listeners = parse_instance_stats(STATS).unwrap();
        assert_eq!(listeners.len(), 4);
        assert!(listeners.iter().all(|l| l.service_name != "FRONTEND"));
        assert!(listeners.iter().all(|l| l.service_name != "BACKEND"));
        assert!(listeners.iter().all(|l| !l.proxy_name.starts_with('#')));
    }

    #[test]
    fn reads_status_and_counters() {
        let listeners = parse_instance_stats(STATS).unwrap();
        let up = &listeners[1];
        assert_eq!(up.proxy_name, "my-app_11090");
        assert_eq!(up.service_name, "10_0_6_25_16916");
        assert_eq!(up.status, ListenerStatus::Up);

        let busy = &listeners[2];
        assert_eq!(busy.status, ListenerStatus::Maint);
        assert_eq!(busy.sessions, 2);
        assert!(!busy.is_drained());
    }

    #[test]
    fn blank_counters_default_to_zero() {
        let listeners = parse_instance_stats(STATS).unwrap();
        let idle = &listeners[3];
        assert_eq!(idle.queued, 0);
        assert_eq!(idle.sessions, 0);
        assert!(idle.is_drained());
    }

    #[test]
    fn other_statuses_are_preserved() {
        let listeners = parse_instance_stats(STATS).unwrap();
        assert_eq!(
            listeners[0].status,
            ListenerStatus::Other("no check".to_string())
        );
    }

    #[test]
    fn merges_instances() {
        let listeners = parse_stats(&[STATS, STATS]).unwrap();
        assert_eq!(listeners.len(), 8);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(parse_instance_stats(""), Err(StatsError::Empty));
    }

    #[test]
    fn header_without_status_is_an_error() {
        assert_eq!(
            parse_instance_stats("# pxname,svname,scur,\n"),
            Err(StatsError::MissingColumn("status"))
        );
    }
}
