use dashmap::DashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// Addresses known to be unreachable or not an iLO controller.
///
/// Append-only for the process lifetime: entries are never removed, so a
/// host that fails identification once is skipped by every later scan.
/// Not persisted: a restart re-classifies the subnet from scratch.
#[derive(Clone, Default)]
pub struct Blacklist {
    inner: Arc<DashSet<Ipv4Addr>>,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the address was newly blacklisted.
    pub fn insert(&self, addr: Ipv4Addr) -> bool {
        self.inner.insert(addr)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_contains() {
        let bl = Blacklist::new();
        let addr = Ipv4Addr::new(10, 0, 0, 2);
        assert!(!bl.contains(addr));
        assert!(bl.insert(addr));
        assert!(bl.contains(addr));
        // Second insert is a no-op.
        assert!(!bl.insert(addr));
        assert_eq!(bl.len(), 1);
    }
}
