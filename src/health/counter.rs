use crate::net::Bitmap;
use crate::probe;
use crate::registry::RegistrationSet;
use crate::store::HealthStore;
use std::net::Ipv4Addr;
use tracing::debug;

/// Per-minute probe-agreement pass over the active bitmap.
///
/// Each registered active host is re-checked against its identification
/// endpoint; agreement moves the [0,5] counter up, disagreement moves it
/// down, and the derived alive flag (counter > 0) is published under the
/// bare address key. Hosts that are active but not yet registered have no
/// counter lifecycle and are skipped.
pub async fn run_health_pass(
    http: &reqwest::Client,
    addresses: &[Ipv4Addr],
    active: &Bitmap,
    registered: &RegistrationSet,
    store: &HealthStore,
) {
    for index in active.ones() {
        let Some(&addr) = addresses.get(index) else {
            continue;
        };
        if !registered.contains(addr) {
            continue;
        }

        let agreed = probe::check_endpoint(http, addr).await.is_ok();
        let counter = if agreed {
            store.incr_health(addr).await
        } else {
            store.decr_health(addr).await
        };
        store.set_alive(addr, counter > 0).await;

        debug!(
            "health: pass, addr={}, agreed={}, counter={}",
            addr, agreed, counter
        );
        metrics::gauge!("scout_health_counter", "addr" => addr.to_string()).set(counter as f64);
    }
}
