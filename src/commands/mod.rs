// ABOUTME: Command module aggregator for the palette CLI.
// ABOUTME: Re-exports the deploy command handler.

mod deploy;

pub use deploy::{DeployRequest, deploy};
