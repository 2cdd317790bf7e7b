use crate::error::ScoutError;
use dashmap::DashMap;
use redis::AsyncCommands;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::warn;

/// Health counter range. A freshly registered controller starts at the top.
pub const HEALTH_MAX: i64 = 5;
pub const HEALTH_MIN: i64 = 0;

/// Key/value store for per-host liveness state.
///
/// Key scheme: `<addr>` holds the boolean alive flag (`"1"` / `"0"`; reads
/// also accept the literal `"true"`), `<addr>-health` holds the [0,5]
/// counter. A store failure is never fatal to a scheduler tick: operations
/// log at warn and return neutral defaults (alive = false, health = 0).
#[derive(Clone)]
pub enum HealthStore {
    Redis(RedisStore),
    Memory(MemoryStore),
}

impl HealthStore {
    pub async fn connect_redis(url: &str) -> Result<Self, ScoutError> {
        let store = RedisStore::connect(url)
            .await
            .map_err(|e| ScoutError::Store(e.to_string()))?;
        Ok(Self::Redis(store))
    }

    pub fn memory() -> Self {
        Self::Memory(MemoryStore::default())
    }

    pub async fn get_alive(&self, addr: Ipv4Addr) -> bool {
        match self {
            Self::Redis(store) => match store.get(&alive_key(addr)).await {
                Ok(v) => parse_alive(v.as_deref()),
                Err(e) => {
                    warn!("store: alive read failed, addr={}, error={}", addr, e);
                    metrics::counter!("scout_store_errors_total", "op" => "get").increment(1);
                    false
                }
            },
            Self::Memory(store) => parse_alive(store.get(&alive_key(addr)).as_deref()),
        }
    }

    pub async fn set_alive(&self, addr: Ipv4Addr, alive: bool) {
        let value = if alive { "1" } else { "0" };
        match self {
            Self::Redis(store) => {
                if let Err(e) = store.set(&alive_key(addr), value).await {
                    warn!("store: alive write failed, addr={}, error={}", addr, e);
                    metrics::counter!("scout_store_errors_total", "op" => "set").increment(1);
                }
            }
            Self::Memory(store) => store.set(&alive_key(addr), value),
        }
    }

    pub async fn get_health(&self, addr: Ipv4Addr) -> i64 {
        match self {
            Self::Redis(store) => match store.get(&health_key(addr)).await {
                Ok(v) => v.and_then(|s| s.parse().ok()).unwrap_or(HEALTH_MIN),
                Err(e) => {
                    warn!("store: health read failed, addr={}, error={}", addr, e);
                    metrics::counter!("scout_store_errors_total", "op" => "get").increment(1);
                    HEALTH_MIN
                }
            },
            Self::Memory(store) => store
                .get(&health_key(addr))
                .and_then(|s| s.parse().ok())
                .unwrap_or(HEALTH_MIN),
        }
    }

    pub async fn set_health(&self, addr: Ipv4Addr, value: i64) {
        let value = value.clamp(HEALTH_MIN, HEALTH_MAX);
        match self {
            Self::Redis(store) => {
                if let Err(e) = store.set(&health_key(addr), &value.to_string()).await {
                    warn!("store: health write failed, addr={}, error={}", addr, e);
                    metrics::counter!("scout_store_errors_total", "op" => "set").increment(1);
                }
            }
            Self::Memory(store) => store.set(&health_key(addr), &value.to_string()),
        }
    }

    /// Increment the health counter, clamped to [`HEALTH_MAX`].
    pub async fn incr_health(&self, addr: Ipv4Addr) -> i64 {
        match self {
            Self::Redis(store) => match store.incr(&health_key(addr)).await {
                Ok(v) if v > HEALTH_MAX => {
                    // INCR overshot the ceiling; settle the stored value back.
                    self.set_health(addr, HEALTH_MAX).await;
                    HEALTH_MAX
                }
                Ok(v) => v,
                Err(e) => {
                    warn!("store: health incr failed, addr={}, error={}", addr, e);
                    metrics::counter!("scout_store_errors_total", "op" => "incr").increment(1);
                    HEALTH_MIN
                }
            },
            Self::Memory(store) => store.add_health(&health_key(addr), 1),
        }
    }

    /// Decrement the health counter, clamped to [`HEALTH_MIN`].
    pub async fn decr_health(&self, addr: Ipv4Addr) -> i64 {
        match self {
            Self::Redis(store) => match store.decr(&health_key(addr)).await {
                Ok(v) if v < HEALTH_MIN => {
                    self.set_health(addr, HEALTH_MIN).await;
                    HEALTH_MIN
                }
                Ok(v) => v,
                Err(e) => {
                    warn!("store: health decr failed, addr={}, error={}", addr, e);
                    metrics::counter!("scout_store_errors_total", "op" => "decr").increment(1);
                    HEALTH_MIN
                }
            },
            Self::Memory(store) => store.add_health(&health_key(addr), -1),
        }
    }

    /// Drop both keys for an un-registered host.
    pub async fn remove(&self, addr: Ipv4Addr) {
        match self {
            Self::Redis(store) => {
                if let Err(e) = store.del(&[alive_key(addr), health_key(addr)]).await {
                    warn!("store: remove failed, addr={}, error={}", addr, e);
                    metrics::counter!("scout_store_errors_total", "op" => "del").increment(1);
                }
            }
            Self::Memory(store) => {
                store.del(&alive_key(addr));
                store.del(&health_key(addr));
            }
        }
    }
}

fn alive_key(addr: Ipv4Addr) -> String {
    addr.to_string()
}

fn health_key(addr: Ipv4Addr) -> String {
    format!("{}-health", addr)
}

fn parse_alive(value: Option<&str>) -> bool {
    matches!(value, Some("1") | Some("true"))
}

/// Redis backend. Cheaply cloneable; the `ConnectionManager` multiplexes
/// one reconnecting connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: redis::aio::ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> redis::RedisResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = redis::aio::ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    async fn get(&self, key: &str) -> redis::RedisResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> redis::RedisResult<()> {
        let mut conn = self.conn.clone();
        conn.set(key, value).await
    }

    async fn incr(&self, key: &str) -> redis::RedisResult<i64> {
        let mut conn = self.conn.clone();
        conn.incr(key, 1).await
    }

    async fn decr(&self, key: &str) -> redis::RedisResult<i64> {
        let mut conn = self.conn.clone();
        conn.decr(key, 1).await
    }

    async fn del(&self, keys: &[String]) -> redis::RedisResult<()> {
        let mut conn = self.conn.clone();
        conn.del(keys).await
    }
}

/// In-memory backend for tests and store-less deployments.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, String>>,
}

impl MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn add_health(&self, key: &str, delta: i64) -> i64 {
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| "0".to_string());
        let current: i64 = entry.value().parse().unwrap_or(HEALTH_MIN);
        let next = (current + delta).clamp(HEALTH_MIN, HEALTH_MAX);
        *entry.value_mut() = next.to_string();
        next
    }

    fn del(&self, key: &str) {
        self.entries.remove(key);
    }
}
