//! Cross-cutting services module
//!
//! Probe lifecycle events and the metrics fed from them.

pub mod events;
pub mod metrics;

pub use events::{
    ClassifiedEvent, EventDispatcher, EventHandler, FailedEvent, LoggingHandler, MetricsHandler,
    ProbeEvent, RequestEvent, ResponseEvent,
};
pub use metrics::{GlobalStats, HostStats, MetricsCollector, MetricsSnapshot};
