//! Fixed-size group runner shared by the CLI and the batch endpoint.
//!
//! Input URLs are cut into consecutive groups of `concurrency` entries. A
//! group is launched together and fully awaited before the next one starts,
//! which bounds simultaneous sockets and in-flight bodies. Results are
//! emitted group by group, in input order within each group.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::prober::StoreProber;
use crate::probe::core::CheckResult;

/// Default number of stores probed at once.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Default cap on URLs accepted by one batch request.
pub const DEFAULT_MAX_BATCH_URLS: usize = 100;

/// Keep at most `max` entries; report how many were dropped.
pub fn cap_urls(mut urls: Vec<String>, max: usize) -> (Vec<String>, usize) {
    let dropped = urls.len().saturating_sub(max);
    urls.truncate(max);
    (urls, dropped)
}

/// Run `urls` through `prober` group by group, handing each result to `emit`.
///
/// Stops at the first error returned by `emit`; the group in flight still
/// completes before that error is seen.
pub async fn classify_in_groups<F, E>(prober: &StoreProber, urls: &[String], mut emit: F) -> Result<(), E>
where
    F: FnMut(CheckResult) -> Result<(), E>,
{
    let group_size = prober.config().concurrency.max(1);
    for (index, group) in urls.chunks(group_size).enumerate() {
        log::debug!("starting group {} ({} store(s))", index + 1, group.len());
        for result in prober.classify_group(group).await {
            emit(result)?;
        }
    }
    Ok(())
}

/// Spawn the group runner on the runtime and stream results over a channel.
///
/// If the receiver goes away (client disconnected) the runner stops after the
/// group that is currently in flight.
pub fn spawn_batch(prober: Arc<StoreProber>, urls: Vec<String>) -> mpsc::Receiver<CheckResult> {
    let group_size = prober.config().concurrency.max(1);
    let (tx, rx) = mpsc::channel(group_size);

    tokio::spawn(async move {
        let total = urls.len();
        for group in urls.chunks(group_size) {
            for result in prober.classify_group(group).await {
                if tx.send(result).await.is_err() {
                    log::debug!("batch receiver dropped, abandoning remaining stores");
                    return;
                }
            }
        }
        log::info!("batch of {total} store(s) complete");
        if let Some(metrics) = prober.metrics() {
            let snapshot = metrics.snapshot();
            log::debug!(
                "probe totals: {} request(s), {} classification(s)",
                snapshot.global.total_requests,
                snapshot.total_classified()
            );
        }
    });

    rx
}
