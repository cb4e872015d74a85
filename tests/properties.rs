// ABOUTME: Property tests for port/color allocation and listener readiness decisions.
// ABOUTME: Uses proptest to cover purity, color round-trips, and per-replica listener counts.

use chrono::{TimeZone, Utc};
use palette::balancer::{ApplicationStats, Listener, ListenerStatus};
use palette::deploy::{AllocationContext, PortColorAllocator};
use palette::scheduler::{AppState, PortRange, Task};
use palette::types::{AppDefinition, TaskId, labels};
use proptest::prelude::*;
use serde_json::json;

fn template(instances: u32, service_port: u16) -> AppDefinition {
    serde_json::from_value(json!({
        "id": "/my-app",
        "instances": instances,
        "labels": {"HAPROXY_DEPLOYMENT_GROUP": "my-app"},
        "container": {"docker": {"portMappings": [{"containerPort": 8080, "servicePort": service_port}]}}
    }))
    .unwrap()
}

fn context(seed: u64) -> AllocationContext<'static> {
    AllocationContext {
        cluster_apps: &[],
        started_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        seed,
    }
}

const RANGE: PortRange = PortRange {
    min: 20000,
    max: 20999,
};

fn allocator() -> PortColorAllocator {
    PortColorAllocator::new(Some(RANGE), 100)
}

proptest! {
    #[test]
    fn allocation_is_pure(
        instances in 0u32..20,
        service_port in 1000u16..10000,
        seed in any::<u64>(),
    ) {
        let new_app = template(instances, service_port);
        let first = allocator().allocate(&new_app, None, &context(seed)).unwrap();
        let second = allocator().allocate(&new_app, None, &context(seed)).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn colors_alternate_and_return(
        instances in 1u32..20,
        service_port in 1000u16..10000,
        seed in any::<u64>(),
    ) {
        let new_app = template(instances, service_port);
        let ctx = context(seed);

        let blue = allocator().allocate(&new_app, None, &ctx).unwrap();
        let green = allocator().allocate(&new_app, Some(&blue), &ctx).unwrap();
        let blue_again = allocator().allocate(&new_app, Some(&green), &ctx).unwrap();

        prop_assert_eq!(blue.label(labels::DEPLOYMENT_COLOUR), Some("blue"));
        prop_assert_eq!(green.label(labels::DEPLOYMENT_COLOUR), Some("green"));
        prop_assert_ne!(blue.service_port(), green.service_port());
        prop_assert_eq!(&blue_again, &blue);
    }

    #[test]
    fn alternate_port_stays_in_range_and_off_primary(seed in any::<u64>()) {
        let app = allocator().allocate(&template(1, 20500), None, &context(seed)).unwrap();
        let alt: u16 = app.label(labels::ALT_PORT).unwrap().parse().unwrap();
        prop_assert!((RANGE.min..=RANGE.max).contains(&alt));
        prop_assert_ne!(alt, 20500);
    }

    #[test]
    fn new_app_is_up_iff_every_task_has_one_up_listener_per_replica(
        counts in prop::collection::vec(0usize..4, 0..6),
        replicas in 1usize..4,
    ) {
        let state = app_with_tasks(counts.len());
        let listeners = listeners_for(&counts, ListenerStatus::Up, 0);
        let stats = ApplicationStats::new(&state.definition, &listeners);

        let expected = counts.iter().all(|&c| c == replicas);
        prop_assert_eq!(stats.new_app_is_up(&state, replicas), expected);
    }

    #[test]
    fn old_app_is_drained_iff_every_task_has_idle_maint_listeners(
        counts in prop::collection::vec(0usize..4, 1..6),
        replicas in 1usize..4,
        sessions in 0u64..3,
    ) {
        let state = app_with_tasks(counts.len());
        let listeners = listeners_for(&counts, ListenerStatus::Maint, sessions);
        let stats = ApplicationStats::new(&state.definition, &listeners);

        let expected = sessions == 0 && counts.iter().all(|&c| c == replicas);
        prop_assert_eq!(stats.old_app_is_drained(&state, replicas), expected);
    }
}

fn app_with_tasks(n: usize) -> AppState {
    let mut definition = template(n as u32, 10000);
    definition.set_label(labels::PRIMARY_PORT, "10000");
    definition.set_label(labels::TARGET_INSTANCES, n.to_string());
    let tasks = (0..n)
        .map(|i| Task {
            id: TaskId::new(format!("my-app.{i}")),
            host: format!("10.0.0.{}", i + 1),
            ports: vec![31000],
        })
        .collect();
    AppState {
        definition,
        version: "v1".to_string(),
        deployments: Vec::new(),
        tasks_unhealthy: 0,
        tasks,
    }
}

/// `counts[i]` listeners for task `i`, as if seen by that many replicas.
fn listeners_for(counts: &[usize], status: ListenerStatus, sessions: u64) -> Vec<Listener> {
    counts
        .iter()
        .enumerate()
        .flat_map(|(i, &count)| {
            let status = status.clone();
            (0..count).map(move |_| Listener {
                proxy_name: "my-app_10000".to_string(),
                service_name: format!("10_0_0_{}_31000", i + 1),
                status: status.clone(),
                queued: 0,
                sessions,
            })
        })
        .collect()
}
