//! High level probe orchestration.
//!
//! Wires together the transport, the login flow, and the cross-cutting
//! services (events, metrics) to expose a single `classify` entry point
//! shared by the CLI and the batch server.

use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;

use crate::config::{ConfigError, ProbeConfig};
use crate::modules::events::{EventDispatcher, EventHandler, LoggingHandler, MetricsHandler};
use crate::modules::metrics::MetricsCollector;
use crate::normalize::normalize_url;
use crate::probe::core::{CheckResult, ProbeHttpClient, ProbeHttpClientError, ReqwestProbeClient};
use crate::probe::login_flow::LoginProbe;

/// Result alias used across the orchestration layer.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors raised while assembling a prober. Probing itself never fails.
#[derive(Debug, Error)]
pub enum ProbeError {
	#[error("http client error: {0}")]
	Client(#[from] ProbeHttpClientError),
	#[error("configuration error: {0}")]
	Config(#[from] ConfigError),
}

/// Fluent builder for [`StoreProber`].
pub struct StoreProberBuilder {
	config: ProbeConfig,
	client: Option<Arc<dyn ProbeHttpClient>>,
	handlers: Vec<Arc<dyn EventHandler>>,
	enable_logging: bool,
	enable_metrics: bool,
}

impl StoreProberBuilder {
	pub fn new() -> Self {
		Self {
			config: ProbeConfig::default(),
			client: None,
			handlers: Vec::new(),
			enable_logging: true,
			enable_metrics: true,
		}
	}

	pub fn with_config(mut self, config: ProbeConfig) -> Self {
		self.config = config;
		self
	}

	/// Replace the reqwest transport (tests, custom TLS setups). The client
	/// must not follow redirects on its own.
	pub fn with_client(mut self, client: Arc<dyn ProbeHttpClient>) -> Self {
		self.client = Some(client);
		self
	}

	pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
		self.handlers.push(handler);
		self
	}

	pub fn disable_logging(mut self) -> Self {
		self.enable_logging = false;
		self
	}

	pub fn disable_metrics(mut self) -> Self {
		self.enable_metrics = false;
		self
	}

	pub fn build(self) -> ProbeResult<StoreProber> {
		let client: Arc<dyn ProbeHttpClient> = match self.client {
			Some(client) => client,
			None => Arc::new(ReqwestProbeClient::new(&self.config)?),
		};

		let metrics = self.enable_metrics.then(MetricsCollector::new);

		let mut events = EventDispatcher::new();
		if self.enable_logging {
			events.register_handler(Arc::new(LoggingHandler));
		}
		if let Some(ref collector) = metrics {
			events.register_handler(Arc::new(MetricsHandler::new(collector.clone())));
		}
		for handler in self.handlers {
			events.register_handler(handler);
		}

		Ok(StoreProber {
			config: self.config,
			client,
			events,
			metrics,
		})
	}
}

impl Default for StoreProberBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Main probe orchestrator. Cheap to share behind an `Arc`; holds no
/// per-store state, so any number of classifications may run concurrently.
pub struct StoreProber {
	config: ProbeConfig,
	client: Arc<dyn ProbeHttpClient>,
	events: EventDispatcher,
	metrics: Option<MetricsCollector>,
}

impl StoreProber {
	/// Construct a prober with default configuration and the reqwest transport.
	pub fn new() -> ProbeResult<Self> {
		StoreProberBuilder::new().build()
	}

	/// Construct a prober from configuration.
	pub fn with_config(config: ProbeConfig) -> ProbeResult<Self> {
		StoreProberBuilder::new().with_config(config).build()
	}

	/// Obtain a builder to customise the prober instance.
	pub fn builder() -> StoreProberBuilder {
		StoreProberBuilder::new()
	}

	pub fn config(&self) -> &ProbeConfig {
		&self.config
	}

	/// Metrics collected so far, unless disabled on the builder.
	pub fn metrics(&self) -> Option<&MetricsCollector> {
		self.metrics.as_ref()
	}

	/// Classify one store. Never fails: transport problems come back as
	/// `error` results.
	///
	/// `url` is expected to be normalized already; normalizing again is a
	/// no-op, so raw input is accepted too.
	pub async fn classify(&self, url: &str) -> CheckResult {
		let store_url = normalize_url(url).unwrap_or_else(|| url.trim().to_string());
		LoginProbe::new(self.client.as_ref(), &self.events)
			.with_max_redirects(self.config.max_redirects)
			.classify(&store_url)
			.await
	}

	/// Classify a group of stores concurrently, returning results in input order.
	pub async fn classify_group(&self, urls: &[String]) -> Vec<CheckResult> {
		join_all(urls.iter().map(|url| self.classify(url))).await
	}
}
