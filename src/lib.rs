//! # storefront-probe
//!
//! Classifies Shopify storefronts by the customer-account system they run:
//! the hosted "new" accounts, the theme-rendered "legacy" login, a
//! password-protected storefront, or not Shopify at all.
//!
//! Each store is probed at `/account/login` with redirects followed by hand,
//! so every hop can be inspected before the next request goes out.
//!
//! ## Example
//!
//! ```no_run
//! use storefront_probe::StoreProber;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let prober = StoreProber::new()?;
//!     let result = prober.classify("example.myshopify.com").await;
//!     println!("{} {}", result.kind().emoji(), result.kind().label());
//!     Ok(())
//! }
//! ```

mod prober;

pub mod batch;
pub mod cli;
pub mod config;
pub mod logging;
pub mod modules;
pub mod normalize;
pub mod probe;
pub mod server;

pub use crate::prober::{ProbeError, ProbeResult, StoreProber, StoreProberBuilder};

pub use crate::probe::core::{
    AccountType,
    CheckResult,
    PendingBody,
    ProbeHttpClient,
    ProbeHttpClientError,
    ProbeHttpResponse,
    ReqwestProbeClient,
};

pub use crate::probe::detectors::{BODY_RULES, BodyRule, classify_from_body};
pub use crate::probe::login_flow::{DEFAULT_MAX_REDIRECTS, LOGIN_PATH, LoginProbe};

pub use crate::batch::{classify_in_groups, spawn_batch};
pub use crate::config::{ConfigError, ProbeConfig, ProbeConfigBuilder};
pub use crate::normalize::{normalize_all, normalize_and_split, normalize_url};

/// Crate version, reported by the health endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
