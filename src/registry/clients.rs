use crate::client::{AuthenticatedClient, UnauthenticatedClient};
use dashmap::DashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// Snapshot registry for registered controllers, keyed by iLO UUID.
///
/// Both maps are concurrent; the updaters read cloned snapshots, refresh
/// them off-map, and write the result back, so no entry is ever locked
/// across network I/O. Every entry's address is expected to be present in
/// the registration set; `remove_by_address` is called from the
/// un-register path to keep that pairing.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    unauthenticated: Arc<DashMap<String, UnauthenticatedClient>>,
    authenticated: Arc<DashMap<String, AuthenticatedClient>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_unauthenticated(&self, client: UnauthenticatedClient) {
        self.unauthenticated.insert(client.uuid.clone(), client);
    }

    pub fn insert_authenticated(&self, client: AuthenticatedClient) {
        self.authenticated.insert(client.uuid.clone(), client);
    }

    pub fn unauthenticated_snapshot(&self) -> Vec<UnauthenticatedClient> {
        self.unauthenticated
            .iter()
            .map(|e| e.value().clone())
            .collect()
    }

    pub fn authenticated_snapshot(&self) -> Vec<AuthenticatedClient> {
        self.authenticated
            .iter()
            .map(|e| e.value().clone())
            .collect()
    }

    pub fn contains_uuid(&self, uuid: &str) -> bool {
        self.unauthenticated.contains_key(uuid) || self.authenticated.contains_key(uuid)
    }

    pub fn unauthenticated_len(&self) -> usize {
        self.unauthenticated.len()
    }

    pub fn authenticated_len(&self) -> usize {
        self.authenticated.len()
    }

    /// Drop every snapshot belonging to `addr`. Returns how many entries
    /// were removed across both maps.
    pub fn remove_by_address(&self, addr: Ipv4Addr) -> usize {
        let before = self.unauthenticated.len() + self.authenticated.len();
        self.unauthenticated.retain(|_, c| c.ilo_address != addr);
        self.authenticated.retain(|_, c| c.ilo_address != addr);
        before - (self.unauthenticated.len() + self.authenticated.len())
    }
}
