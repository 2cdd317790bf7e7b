use crate::net::Bitmap;
use crate::probe;
use crate::registry::{Blacklist, RegistrationSet};
use futures_util::stream::{self, StreamExt};
use std::net::Ipv4Addr;
use std::time::Instant;
use tracing::info;

/// Run a single scan round over the cached address range.
///
/// Probes are issued with a bounded concurrency equal to the subnet prefix
/// length (24 parallel probes on a /24). Every candidate resolves to a bit;
/// a per-host failure shows up as an unset bit, never as an aborted round.
/// The caller owns scheduling and the atomic swap of the published bitmap.
pub async fn run_scan(
    http: &reqwest::Client,
    addresses: &[Ipv4Addr],
    blacklist: &Blacklist,
    registered: &RegistrationSet,
    concurrency: usize,
) -> Bitmap {
    let start = Instant::now();

    let results: Vec<(usize, bool)> = stream::iter(addresses.iter().copied().enumerate())
        .map(|(index, addr)| async move {
            (index, probe::identify(http, blacklist, registered, addr).await)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut bitmap = Bitmap::new(addresses.len());
    for (index, active) in results {
        if active {
            bitmap.set(index);
        }
    }

    let duration = start.elapsed().as_secs_f64();
    info!(
        "scan: round completed, candidates={}, active={}, duration={:.3}s",
        addresses.len(),
        bitmap.count(),
        duration,
    );
    metrics::counter!("scout_scan_rounds_total").increment(1);
    metrics::gauge!("scout_scan_active_hosts").set(bitmap.count() as f64);
    metrics::histogram!("scout_scan_duration_seconds").record(duration);

    bitmap
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::build_probe_client;
    use crate::store::HealthStore;

    // Probes against the blacklist/registration short-circuits only; no
    // listener is involved, so every bit state is decided without I/O.
    #[tokio::test]
    async fn test_scan_short_circuits_classified_hosts() {
        let http = build_probe_client(50, 50).unwrap();
        let blacklist = Blacklist::new();
        let registered = RegistrationSet::new(HealthStore::memory());

        let addresses = [
            Ipv4Addr::new(10, 0, 0, 0),
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
            Ipv4Addr::new(10, 0, 0, 3),
        ];
        // Pre-classify everything so the round performs zero network I/O.
        registered.register(addresses[1]).await;
        for addr in [addresses[0], addresses[2], addresses[3]] {
            blacklist.insert(addr);
        }

        let bitmap = run_scan(&http, &addresses, &blacklist, &registered, 30).await;
        assert_eq!(bitmap.len(), 4);
        assert!(bitmap.test(1));
        assert_eq!(bitmap.count(), 1);
        assert_eq!(bitmap.ones().collect::<Vec<_>>(), vec![1]);
    }
}
