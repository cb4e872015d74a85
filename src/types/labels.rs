// ABOUTME: Label keys shared with Marathon-LB's blue-green conventions.
// ABOUTME: These names are a wire contract with the load balancer and must not change.

/// Groups the blue and green stacks of one logical application.
pub const DEPLOYMENT_GROUP: &str = "HAPROXY_DEPLOYMENT_GROUP";

/// Colour of the stack (`blue` or `green`).
pub const DEPLOYMENT_COLOUR: &str = "HAPROXY_DEPLOYMENT_COLOUR";

/// The group's primary service port. Also names the load balancer frontend.
pub const PRIMARY_PORT: &str = "HAPROXY_0_PORT";

/// The group's alternate service port.
pub const ALT_PORT: &str = "HAPROXY_DEPLOYMENT_ALT_PORT";

/// Instance count the load balancer must observe before cutover completes.
pub const TARGET_INSTANCES: &str = "HAPROXY_DEPLOYMENT_TARGET_INSTANCES";

/// ISO-8601 timestamp of when the stack's deploy started.
pub const STARTED_AT: &str = "HAPROXY_DEPLOYMENT_STARTED_AT";

/// Application ID before the colour suffix was added.
pub const ORIGINAL_APP_ID: &str = "HAPROXY_APP_ID";
