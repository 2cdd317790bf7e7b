use crate::store::HealthStore;
use dashmap::DashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::info;

/// Confirmed-and-accepted controllers, write-through to the health store.
///
/// Membership reads are served from the in-process set and may trail a peer
/// instance's writes by at most one registrar cadence. Writes go through to
/// the store's alive flag before the in-memory set is updated, so a crash
/// between the two leaves the store as the authority. Entries leave the set
/// only via [`RegistrationSet::unregister`].
#[derive(Clone)]
pub struct RegistrationSet {
    inner: Arc<DashSet<Ipv4Addr>>,
    store: HealthStore,
}

impl RegistrationSet {
    pub fn new(store: HealthStore) -> Self {
        Self {
            inner: Arc::new(DashSet::new()),
            store,
        }
    }

    /// Returns `true` if the address was newly registered.
    pub async fn register(&self, addr: Ipv4Addr) -> bool {
        self.store.set_alive(addr, true).await;
        let inserted = self.inner.insert(addr);
        if inserted {
            info!("registry: registered, addr={}", addr);
            metrics::gauge!("scout_registered_hosts").set(self.inner.len() as f64);
        }
        inserted
    }

    /// Explicit eviction, the only path that removes a registration.
    pub async fn unregister(&self, addr: Ipv4Addr) -> bool {
        let removed = self.inner.remove(&addr).is_some();
        if removed {
            self.store.remove(addr).await;
            info!("registry: unregistered, addr={}", addr);
            metrics::gauge!("scout_registered_hosts").set(self.inner.len() as f64);
        }
        removed
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.inner.contains(&addr)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn addresses(&self) -> Vec<Ipv4Addr> {
        self.inner.iter().map(|e| *e.key()).collect()
    }
}
