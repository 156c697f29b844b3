// Storefront login probing: transport, signal detection, and the redirect-following flow.

pub mod core;
pub mod detectors;
pub mod login_flow;
pub mod user_agents;
