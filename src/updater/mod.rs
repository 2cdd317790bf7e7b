use crate::health::HeartbeatMap;
use crate::queue::Publisher;
use crate::registry::{ClientRegistry, RegistrationSet};
use dashmap::DashSet;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Per-entry overlap guard. An entry whose previous update is still running
/// when its feed ticks again is skipped for that tick.
#[derive(Clone, Default)]
pub struct InFlightGuard {
    inner: Arc<DashSet<String>>,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the entry is already being updated.
    pub fn begin(&self, uuid: &str) -> bool {
        self.inner.insert(uuid.to_string())
    }

    pub fn end(&self, uuid: &str) {
        self.inner.remove(uuid);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Shared handles for one updater feed.
#[derive(Clone)]
pub struct UpdaterContext {
    pub http: reqwest::Client,
    pub registered: RegistrationSet,
    pub clients: ClientRegistry,
    pub heartbeats: HeartbeatMap,
    pub publisher: Publisher,
    pub queue: String,
    pub gzip_frame: bool,
    pub in_flight: InFlightGuard,
}

/// One tick of the unauthenticated feed: refresh every eligible snapshot
/// and publish the result. Entries are dispatched onto the runtime's
/// work-stealing pool, with no ordering between entries; an entry still
/// mid-update from a previous tick is skipped.
pub fn run_unauthenticated_tick(ctx: &UpdaterContext) {
    for client in ctx.clients.unauthenticated_snapshot() {
        if !ctx.registered.contains(client.ilo_address) {
            continue;
        }
        if !client.can_update() {
            continue;
        }
        if !ctx.in_flight.begin(&client.uuid) {
            debug!("updater: update in flight, skipping, uuid={}", client.uuid);
            metrics::counter!("scout_updates_total", "feed" => "unauthenticated", "result" => "skipped")
                .increment(1);
            continue;
        }

        let ctx = ctx.clone();
        tokio::spawn(async move {
            let uuid = client.uuid.clone();
            match client.refresh(&ctx.http).await {
                Ok(next) => {
                    ctx.heartbeats.stamp(next.ilo_address);
                    ctx.clients.insert_unauthenticated(next.clone());
                    if let Err(e) = ctx
                        .publisher
                        .publish_json(&ctx.queue, &next, ctx.gzip_frame)
                        .await
                    {
                        error!("updater: publish failed, uuid={}, error={}", uuid, e);
                    }
                    metrics::counter!("scout_updates_total", "feed" => "unauthenticated", "result" => "ok")
                        .increment(1);
                }
                Err(e) => {
                    warn!("updater: refresh failed, uuid={}, error={}", uuid, e);
                    metrics::counter!("scout_updates_total", "feed" => "unauthenticated", "result" => "error")
                        .increment(1);
                }
            }
            ctx.in_flight.end(&uuid);
        });
    }
}

/// One tick of the authenticated feed. Same dispatch rules as the
/// unauthenticated feed, on its own cadence and queue.
pub fn run_authenticated_tick(ctx: &UpdaterContext) {
    for client in ctx.clients.authenticated_snapshot() {
        if !ctx.registered.contains(client.ilo_address) {
            continue;
        }
        if !client.can_update() {
            continue;
        }
        if !ctx.in_flight.begin(&client.uuid) {
            debug!("updater: update in flight, skipping, uuid={}", client.uuid);
            metrics::counter!("scout_updates_total", "feed" => "authenticated", "result" => "skipped")
                .increment(1);
            continue;
        }

        let ctx = ctx.clone();
        tokio::spawn(async move {
            let uuid = client.uuid.clone();
            match client.refresh(&ctx.http).await {
                Ok(next) => {
                    ctx.heartbeats.stamp(next.ilo_address);
                    ctx.clients.insert_authenticated(next.clone());
                    if let Err(e) = ctx
                        .publisher
                        .publish_json(&ctx.queue, &next, ctx.gzip_frame)
                        .await
                    {
                        error!("updater: publish failed, uuid={}, error={}", uuid, e);
                    }
                    metrics::counter!("scout_updates_total", "feed" => "authenticated", "result" => "ok")
                        .increment(1);
                }
                Err(e) => {
                    warn!("updater: refresh failed, uuid={}, error={}", uuid, e);
                    metrics::counter!("scout_updates_total", "feed" => "authenticated", "result" => "error")
                        .increment(1);
                }
            }
            ctx.in_flight.end(&uuid);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_guard() {
        let guard = InFlightGuard::new();
        assert!(guard.begin("U-1"));
        assert!(!guard.begin("U-1"));
        assert!(guard.begin("U-2"));
        guard.end("U-1");
        assert!(guard.begin("U-1"));
        assert_eq!(guard.len(), 2);
    }
}
