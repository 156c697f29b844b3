//! Probe metrics.
//!
//! Request counts and latency windows per storefront host, plus a tally of
//! how many stores landed in each account type. Only the most recently seen
//! hosts are kept; older ones are evicted once the host limit is reached.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::probe::core::AccountType;

const DEFAULT_WINDOW: usize = 128;
const MIN_WINDOW: usize = 16;
const DEFAULT_MAX_HOSTS: usize = 256;

/// Totals across every host seen by the collector.
#[derive(Debug, Clone)]
pub struct GlobalStats {
    pub started_at: DateTime<Utc>,
    pub total_requests: u64,
    pub redirects: u64,
    /// Mean over every response recorded since start.
    pub average_latency: Option<Duration>,
    /// 95th percentile over the most recent window of responses.
    pub p95_latency: Option<Duration>,
}

/// Per-host view in a snapshot.
#[derive(Debug, Clone)]
pub struct HostStats {
    pub host: String,
    pub total_requests: u64,
    /// Responses keyed by status class (`2`, `3`, `4`, `5`).
    pub status_classes: BTreeMap<u16, u64>,
    pub last_status: Option<u16>,
    pub average_latency: Option<Duration>,
    pub p95_latency: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub global: GlobalStats,
    /// Sorted by host name.
    pub hosts: Vec<HostStats>,
    pub classifications: HashMap<AccountType, u64>,
}

impl MetricsSnapshot {
    pub fn count(&self, kind: AccountType) -> u64 {
        self.classifications.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_classified(&self) -> u64 {
        self.classifications.values().sum()
    }

    pub fn host(&self, host: &str) -> Option<&HostStats> {
        self.hosts.iter().find(|stats| stats.host == host)
    }
}

/// Bounded FIFO of latency samples.
#[derive(Debug)]
struct LatencyWindow {
    samples: VecDeque<Duration>,
    capacity: usize,
}

impl LatencyWindow {
    fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            capacity,
        }
    }

    fn push(&mut self, latency: Duration) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(latency);
    }

    fn mean(&self) -> Option<Duration> {
        let count = u32::try_from(self.samples.len()).ok().filter(|n| *n > 0)?;
        Some(self.samples.iter().sum::<Duration>() / count)
    }

    fn p95(&self) -> Option<Duration> {
        let mut sorted: Vec<Duration> = self.samples.iter().copied().collect();
        sorted.sort_unstable();
        let rank = (sorted.len() * 95).div_ceil(100);
        sorted.get(rank.checked_sub(1)?).copied()
    }
}

#[derive(Debug)]
struct HostEntry {
    last_seen: u64,
    total_requests: u64,
    status_classes: BTreeMap<u16, u64>,
    last_status: Option<u16>,
    window: LatencyWindow,
}

impl HostEntry {
    fn new(capacity: usize) -> Self {
        Self {
            last_seen: 0,
            total_requests: 0,
            status_classes: BTreeMap::new(),
            last_status: None,
            window: LatencyWindow::new(capacity),
        }
    }

    fn stats(&self, host: &str) -> HostStats {
        HostStats {
            host: host.to_string(),
            total_requests: self.total_requests,
            status_classes: self.status_classes.clone(),
            last_status: self.last_status,
            average_latency: self.window.mean(),
            p95_latency: self.window.p95(),
        }
    }
}

#[derive(Debug)]
struct Counters {
    started_at: DateTime<Utc>,
    total_requests: u64,
    redirects: u64,
    latency_sum: Duration,
    recent: LatencyWindow,
    window: usize,
    max_hosts: usize,
    hosts: HashMap<String, HostEntry>,
    classifications: HashMap<AccountType, u64>,
}

impl Counters {
    fn new(window: usize, max_hosts: usize) -> Self {
        Self {
            started_at: Utc::now(),
            total_requests: 0,
            redirects: 0,
            latency_sum: Duration::ZERO,
            recent: LatencyWindow::new(window),
            window,
            max_hosts,
            hosts: HashMap::new(),
            classifications: HashMap::new(),
        }
    }

    fn host_entry(&mut self, host: &str) -> &mut HostEntry {
        if !self.hosts.contains_key(host) && self.hosts.len() >= self.max_hosts {
            let stalest = self
                .hosts
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(name, _)| name.clone());
            if let Some(stalest) = stalest {
                self.hosts.remove(&stalest);
            }
        }
        let window = self.window;
        self.hosts
            .entry(host.to_string())
            .or_insert_with(|| HostEntry::new(window))
    }

    fn global(&self) -> GlobalStats {
        let average_latency = u32::try_from(self.total_requests)
            .ok()
            .filter(|n| *n > 0)
            .map(|n| self.latency_sum / n);
        GlobalStats {
            started_at: self.started_at,
            total_requests: self.total_requests,
            redirects: self.redirects,
            average_latency,
            p95_latency: self.recent.p95(),
        }
    }
}

/// Cloneable handle; all clones feed the same counters.
#[derive(Clone, Debug)]
pub struct MetricsCollector {
    inner: Arc<Mutex<Counters>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_WINDOW, DEFAULT_MAX_HOSTS)
    }

    /// Collector keeping `window` latency samples per host (at least 16).
    pub fn with_window(window: usize) -> Self {
        Self::with_limits(window, DEFAULT_MAX_HOSTS)
    }

    /// Collector tracking at most `max_hosts` hosts (at least 1), each with
    /// `window` latency samples.
    pub fn with_limits(window: usize, max_hosts: usize) -> Self {
        let counters = Counters::new(window.max(MIN_WINDOW), max_hosts.max(1));
        Self {
            inner: Arc::new(Mutex::new(counters)),
        }
    }

    // Plain counters: a panic mid-update cannot leave them unusable.
    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_response(&self, host: &str, status: u16, latency: Duration) {
        let mut counters = self.lock();
        counters.total_requests += 1;
        if (300..400).contains(&status) {
            counters.redirects += 1;
        }
        counters.latency_sum += latency;
        counters.recent.push(latency);

        let seen = counters.total_requests;
        let entry = counters.host_entry(host);
        entry.last_seen = seen;
        entry.total_requests += 1;
        *entry.status_classes.entry(status / 100).or_insert(0) += 1;
        entry.last_status = Some(status);
        entry.window.push(latency);
    }

    pub fn record_classification(&self, kind: AccountType) {
        *self.lock().classifications.entry(kind).or_insert(0) += 1;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self.lock();
        let mut hosts: Vec<HostStats> = counters
            .hosts
            .iter()
            .map(|(host, entry)| entry.stats(host))
            .collect();
        hosts.sort_by(|a, b| a.host.cmp(&b.host));
        MetricsSnapshot {
            global: counters.global(),
            hosts,
            classifications: counters.classifications.clone(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
