use crate::client::{AuthenticatedClient, UnauthenticatedClient};
use crate::error::ScoutError;
use crate::health::HeartbeatMap;
use crate::net::{ping, Bitmap};
use crate::probe;
use crate::queue::{Publisher, QueueNames};
use crate::registry::{Blacklist, ClientRegistry, RegistrationSet};
use crate::secret::Secret;
use crate::store::{HealthStore, HEALTH_MAX};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Registration event for a newly-active host. Published on the new-client
/// queue for sibling services and consumed by the in-process worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub ilo_address: Ipv4Addr,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_hint: Option<String>,
}

impl RegistrationRequest {
    pub fn new(ilo_address: Ipv4Addr) -> Self {
        Self {
            ilo_address,
            client_hint: None,
        }
    }
}

/// Everything a registration needs, bundled once at bootstrap. All fields
/// are cheap clones of shared handles.
#[derive(Clone)]
pub struct RegistrarContext {
    pub http: reqwest::Client,
    pub blacklist: Blacklist,
    pub registered: RegistrationSet,
    pub store: HealthStore,
    pub heartbeats: HeartbeatMap,
    pub clients: ClientRegistry,
    pub publisher: Publisher,
    pub queues: QueueNames,
    pub gzip_frame: bool,
    pub username: String,
    pub password: Secret,
    pub ping_timeout: Duration,
}

/// One registrar tick: walk the active bitmap and hand every unclassified
/// active host to the registration pipeline. Returns as soon as everything
/// is enqueued; the worker does the slow part.
pub async fn run_registrar_tick(
    ctx: &RegistrarContext,
    addresses: &[Ipv4Addr],
    active: &Bitmap,
    worker_tx: &mpsc::Sender<RegistrationRequest>,
) {
    for index in active.ones() {
        let Some(&addr) = addresses.get(index) else {
            continue;
        };
        if ctx.blacklist.contains(addr) || ctx.registered.contains(addr) {
            continue;
        }

        let request = RegistrationRequest::new(addr);

        if let Err(e) = ctx
            .publisher
            .publish_json(&ctx.queues.new_client, &request, ctx.gzip_frame)
            .await
        {
            error!("registrar: request publish failed, addr={}, error={}", addr, e);
        }

        match worker_tx.try_send(request) {
            Ok(()) => {
                debug!("registrar: enqueued, addr={}", addr);
                metrics::counter!("scout_registration_requests_total").increment(1);
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                // The host stays in the active bitmap; next tick retries.
                debug!("registrar: worker queue full, addr={}", addr);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => return,
        }
    }
}

/// Process one registration request end to end.
///
/// Order per host, observed by downstream consumers: register → first
/// snapshot publish → heartbeat stamp precedes both. A failed snapshot
/// build rolls the registration back so the host can retry on a later tick.
pub async fn process_registration(ctx: &RegistrarContext, request: RegistrationRequest) -> Result<(), ScoutError> {
    let addr = request.ilo_address;

    if ctx.registered.contains(addr) {
        debug!("registrar: duplicate request dropped, addr={}", addr);
        return Ok(());
    }
    if ctx.blacklist.contains(addr) {
        // The host failed a probe between enqueue and processing.
        debug!("registrar: blacklisted since enqueue, addr={}", addr);
        return Ok(());
    }

    if !ping::ping(addr, ctx.ping_timeout).await {
        debug!("registrar: not reachable, addr={}", addr);
        metrics::counter!("scout_registrations_total", "result" => "unreachable").increment(1);
        return Err(ScoutError::Unreachable);
    }

    ctx.registered.register(addr).await;
    ctx.store.set_health(addr, HEALTH_MAX).await;
    ctx.heartbeats.stamp(addr);

    let unauthenticated = match build_snapshot(ctx, addr).await {
        Ok(client) => client,
        Err(e) => {
            // Roll back so the next active tick can retry the host.
            ctx.registered.unregister(addr).await;
            metrics::counter!("scout_registrations_total", "result" => "snapshot_failed")
                .increment(1);
            return Err(e);
        }
    };

    ctx.clients.insert_unauthenticated(unauthenticated.clone());
    if let Err(e) = ctx
        .publisher
        .publish_json(&ctx.queues.unauthenticated, &unauthenticated, ctx.gzip_frame)
        .await
    {
        error!("registrar: snapshot publish failed, addr={}, error={}", addr, e);
    }

    match AuthenticatedClient::handshake(&ctx.http, &ctx.username, &ctx.password, &unauthenticated)
        .await
    {
        Ok(authenticated) => {
            ctx.clients.insert_authenticated(authenticated.clone());
            if let Err(e) = ctx
                .publisher
                .publish_json(&ctx.queues.authenticated, &authenticated, ctx.gzip_frame)
                .await
            {
                error!("registrar: snapshot publish failed, addr={}, error={}", addr, e);
            }
            info!(
                "registrar: registered with credentials, addr={}, uuid={}",
                addr, unauthenticated.uuid
            );
            metrics::counter!("scout_registrations_total", "result" => "authenticated")
                .increment(1);
        }
        Err(e) => {
            info!(
                "registrar: registered unauthenticated only, addr={}, uuid={}, reason={}",
                addr, unauthenticated.uuid, e
            );
            metrics::counter!("scout_registrations_total", "result" => "unauthenticated")
                .increment(1);
        }
    }

    Ok(())
}

async fn build_snapshot(
    ctx: &RegistrarContext,
    addr: Ipv4Addr,
) -> Result<UnauthenticatedClient, ScoutError> {
    let rimp = probe::check_endpoint(&ctx.http, addr).await?;
    UnauthenticatedClient::from_rimp(addr, &rimp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_ilo_address() {
        let request = RegistrationRequest::new(Ipv4Addr::new(10, 0, 0, 1));
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"iloAddress":"10.0.0.1"}"#);
    }

    #[test]
    fn test_request_roundtrip_with_hint() {
        let mut request = RegistrationRequest::new(Ipv4Addr::new(10, 0, 0, 1));
        request.client_hint = Some("rack-4".to_string());
        let json = serde_json::to_string(&request).unwrap();
        let parsed: RegistrationRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.ilo_address, request.ilo_address);
        assert_eq!(parsed.client_hint.as_deref(), Some("rack-4"));
    }
}
