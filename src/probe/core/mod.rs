//! Core utilities shared by the login flow, the body rules, and callers.

pub mod reqwest_client;
pub mod transport;
pub mod types;

pub use reqwest_client::ReqwestProbeClient;
pub use transport::{
    PendingBody, ProbeHttpClient, ProbeHttpClientError, ProbeHttpResponse, resolve_location,
};
pub use types::{AccountType, CheckResult};
