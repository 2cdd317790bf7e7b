use crate::config::ScoutConfig;
use crate::health::HeartbeatMap;
use crate::metrics::Metrics;
use crate::net::{Bitmap, Subnet};
use crate::probe;
use crate::queue::Publisher;
use crate::registry::{Blacklist, ClientRegistry, RegistrationSet};
use crate::store::HealthStore;
use anyhow::Result;
use arc_swap::ArcSwap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::info;

/// Shared daemon state, cheaply cloneable.
///
/// `addresses` is enumerated once at boot and read-only afterwards; the
/// scanner replaces `active` wholesale, so readers always see one complete
/// scan result. Everything else is a concurrent structure safe to touch
/// from any loop.
#[derive(Clone)]
pub struct ScoutState {
    pub config: Arc<ArcSwap<ScoutConfig>>,
    pub subnet: Subnet,
    pub addresses: Arc<Vec<Ipv4Addr>>,
    pub active: Arc<ArcSwap<Bitmap>>,
    pub blacklist: Blacklist,
    pub registered: RegistrationSet,
    pub clients: ClientRegistry,
    pub heartbeats: HeartbeatMap,
    pub store: HealthStore,
    pub publisher: Publisher,
    pub http: reqwest::Client,
    pub metrics: Metrics,
}

impl ScoutState {
    pub async fn new(config: ScoutConfig) -> Result<Self> {
        // Invalid base IP or mask is fatal here; the process exits non-zero
        // before any scheduler starts.
        let subnet = Subnet::new(&config.ilo.network.base_ip, &config.ilo.network.subnet_mask)
            .map_err(|e| anyhow::anyhow!(e))?;
        let addresses = Arc::new(subnet.addresses());
        info!(
            "state: subnet enumerated, start={}, end={}, candidates={}",
            subnet.network_start(),
            subnet.network_end(),
            addresses.len(),
        );

        let http = probe::build_probe_client(
            config.ilo.client_timeout_connect_ms,
            config.ilo.client_timeout_read_ms,
        )
        .map_err(|e| anyhow::anyhow!(e))?;

        let store = match &config.redis.url {
            Some(url) => {
                let store = HealthStore::connect_redis(url).await?;
                info!("store: connected to redis");
                store
            }
            None => {
                info!("store: no redis url configured, using in-memory store");
                HealthStore::memory()
            }
        };

        let publisher = match &config.nats.url {
            Some(url) => {
                let publisher = Publisher::connect_nats(url)
                    .await
                    .map_err(|e| anyhow::anyhow!(e))?;
                info!("queue: connected to nats, url={}", url);
                publisher
            }
            None => {
                info!("queue: no broker url configured, using in-memory sink");
                Publisher::memory()
            }
        };

        let registered = RegistrationSet::new(store.clone());
        let active = Arc::new(ArcSwap::new(Arc::new(Bitmap::new(addresses.len()))));
        let metrics = Metrics::install();

        Ok(Self {
            config: Arc::new(ArcSwap::new(Arc::new(config))),
            subnet,
            addresses,
            active,
            blacklist: Blacklist::new(),
            registered,
            clients: ClientRegistry::new(),
            heartbeats: HeartbeatMap::new(),
            store,
            publisher,
            http,
            metrics,
        })
    }

    /// Probe fan-out width: the subnet prefix length, a proxy for the log
    /// of the address-space size.
    pub fn scan_concurrency(&self) -> usize {
        (self.subnet.prefix_len() as usize).max(1)
    }

    /// Explicitly evict a host: drop the registration, its store keys, and
    /// every registry snapshot for the address. The only removal path for a
    /// registered host.
    pub async fn unregister_host(&self, addr: Ipv4Addr) -> bool {
        let removed = self.registered.unregister(addr).await;
        if removed {
            let dropped = self.clients.remove_by_address(addr);
            info!(
                "state: host unregistered, addr={}, snapshots_dropped={}",
                addr, dropped
            );
        }
        removed
    }
}
