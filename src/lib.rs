// ABOUTME: Library root for palette - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod balancer;
pub mod clock;
pub mod config;
pub mod deploy;
pub mod error;
pub mod http;
pub mod output;
pub mod scheduler;
pub mod types;
