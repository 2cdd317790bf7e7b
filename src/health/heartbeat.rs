use crate::client::now_ms;
use crate::registry::{Blacklist, RegistrationSet};
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::{debug, warn};

/// Entries silently expire this long after their last write.
const ENTRY_TTL: Duration = Duration::from_secs(600);
/// Upper bound on tracked hosts.
const MAX_TRACKED: u64 = 1000;

/// Last-successful-update timestamps, one entry per registered host.
///
/// Bounded and TTL'd: a host that stops being stamped falls out of the map
/// after ten minutes, which the monitor reports as a missing entry rather
/// than treating as fresh. This is the long-term liveness signal; the
/// [0,5] counter in the store is the short-term one. The two are never
/// merged.
#[derive(Clone)]
pub struct HeartbeatMap {
    cache: moka::sync::Cache<Ipv4Addr, u64>,
}

impl Default for HeartbeatMap {
    fn default() -> Self {
        Self::new()
    }
}

impl HeartbeatMap {
    pub fn new() -> Self {
        Self {
            cache: moka::sync::Cache::builder()
                .max_capacity(MAX_TRACKED)
                .time_to_live(ENTRY_TTL)
                .build(),
        }
    }

    /// Record a successful update at the current wall-clock time.
    pub fn stamp(&self, addr: Ipv4Addr) {
        self.stamp_at(addr, now_ms());
    }

    /// Record (or re-record) an update at an explicit timestamp. Re-writing
    /// the existing value keeps a responsive host's entry from TTL-expiring
    /// without faking a newer update.
    pub fn stamp_at(&self, addr: Ipv4Addr, millis: u64) {
        self.cache.insert(addr, millis);
    }

    pub fn last_update(&self, addr: Ipv4Addr) -> Option<u64> {
        self.cache.get(&addr)
    }
}

/// Outcome of one monitor pass, per host classification.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MonitorReport {
    pub responsive: Vec<Ipv4Addr>,
    pub unresponsive: Vec<Ipv4Addr>,
    pub missing: Vec<Ipv4Addr>,
}

/// Walk the registration set and compare each host's last update against
/// the responsiveness threshold. Reporting only; nothing is evicted here.
pub fn run_monitor_pass(
    registered: &RegistrationSet,
    blacklist: &Blacklist,
    heartbeats: &HeartbeatMap,
    threshold_ms: u64,
) -> MonitorReport {
    let now = now_ms();
    let mut report = MonitorReport::default();

    for addr in registered.addresses() {
        if blacklist.contains(addr) {
            continue;
        }

        let Some(last) = heartbeats.last_update(addr) else {
            warn!("monitor: no heartbeat entry, addr={}", addr);
            report.missing.push(addr);
            continue;
        };

        let age_ms = now.saturating_sub(last);
        if age_ms <= threshold_ms {
            heartbeats.stamp_at(addr, last);
            debug!("monitor: responsive, addr={}, age_ms={}", addr, age_ms);
            report.responsive.push(addr);
        } else {
            warn!(
                "monitor: unresponsive, addr={}, age_ms={}, threshold_ms={}",
                addr, age_ms, threshold_ms
            );
            report.unresponsive.push(addr);
        }
    }

    metrics::gauge!("scout_hosts_responsive").set(report.responsive.len() as f64);
    metrics::gauge!("scout_hosts_unresponsive").set(report.unresponsive.len() as f64);

    report
}
