//! Event system for probe activity.
//!
//! Provides hooks for metrics, logging, and custom reactions around each
//! request the login flow issues and each classification it produces.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::metrics::MetricsCollector;
use crate::probe::core::AccountType;

/// Emitted right before a probe request is sent.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    pub store: String,
    pub url: Url,
    pub hop: usize,
    pub timestamp: DateTime<Utc>,
}

/// Emitted once status and headers have been received.
#[derive(Debug, Clone)]
pub struct ResponseEvent {
    pub store: String,
    pub url: Url,
    pub status: u16,
    pub location: Option<String>,
    pub latency: Duration,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ClassifiedEvent {
    pub store: String,
    pub account_type: AccountType,
    pub status: Option<u16>,
    pub hops: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FailedEvent {
    pub store: String,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum ProbeEvent {
    Request(RequestEvent),
    Response(ResponseEvent),
    Classified(ClassifiedEvent),
    Failed(FailedEvent),
}

/// Trait implemented by event handlers.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &ProbeEvent);
}

/// Dispatcher that broadcasts events to registered handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    pub fn register_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn dispatch(&self, event: ProbeEvent) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Logs events using the `log` crate.
#[derive(Debug)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn handle(&self, event: &ProbeEvent) {
        match event {
            ProbeEvent::Request(req) => {
                log::debug!("-> GET {} (hop {})", req.url, req.hop);
            }
            ProbeEvent::Response(resp) => {
                log::debug!(
                    "<- {} {} ({:.2}s){}",
                    resp.status,
                    resp.url,
                    resp.latency.as_secs_f64(),
                    resp.location
                        .as_deref()
                        .map(|loc| format!(" location={loc}"))
                        .unwrap_or_default()
                );
            }
            ProbeEvent::Classified(done) => {
                log::info!(
                    "{} classified as {} after {} request(s)",
                    done.store,
                    done.account_type,
                    done.hops
                );
            }
            ProbeEvent::Failed(failed) => {
                log::warn!("probe of {} failed: {}", failed.store, failed.error);
            }
        }
    }
}

/// Metrics handler that feeds the metrics collector.
#[derive(Clone, Debug)]
pub struct MetricsHandler {
    metrics: MetricsCollector,
}

impl MetricsHandler {
    pub fn new(metrics: MetricsCollector) -> Self {
        Self { metrics }
    }
}

impl EventHandler for MetricsHandler {
    fn handle(&self, event: &ProbeEvent) {
        match event {
            ProbeEvent::Response(resp) => {
                self.metrics
                    .record_response(resp.url.host_str().unwrap_or(""), resp.status, resp.latency);
            }
            ProbeEvent::Classified(done) => {
                self.metrics.record_classification(done.account_type);
            }
            ProbeEvent::Failed(_) => {
                self.metrics.record_classification(AccountType::Error);
            }
            ProbeEvent::Request(_) => {}
        }
    }
}
