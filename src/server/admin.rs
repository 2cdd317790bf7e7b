use super::ScoutState;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response};
use std::net::SocketAddr;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn handle_admin(
    req: Request<Incoming>,
    state: ScoutState,
    peer: SocketAddr,
) -> Result<Response<BoxBody>, hyper::Error> {
    // Optional source allowlist for the whole admin surface.
    if let Some(allowed) = state.config.load().system.allowed_ip.as_deref() {
        if peer.ip().to_string() != allowed {
            return Ok(Response::builder()
                .status(403)
                .body(full_body(r#"{"error":"forbidden"}"#))
                .unwrap());
        }
    }

    match req.uri().path() {
        "/health" | "/healthz" => Ok(Response::builder()
            .status(200)
            .body(full_body(r#"{"status":"ok"}"#))
            .unwrap()),

        "/ready" | "/readyz" => {
            let active = state.active.load();
            Ok(Response::builder()
                .status(200)
                .body(full_body(format!(
                    r#"{{"status":"ready","candidates":{},"active":{},"registered":{},"blacklisted":{}}}"#,
                    state.addresses.len(),
                    active.count(),
                    state.registered.len(),
                    state.blacklist.len(),
                )))
                .unwrap())
        }

        "/metrics" => {
            let body = state.metrics.render();
            Ok(Response::builder()
                .status(200)
                .header("content-type", "text/plain; version=0.0.4; charset=utf-8")
                .body(full_body(body))
                .unwrap())
        }

        "/clients" => {
            let snapshot = serde_json::json!({
                "unauthenticated": state.clients.unauthenticated_snapshot(),
                "authenticated": state.clients.authenticated_snapshot(),
            });
            let body = serde_json::to_string_pretty(&snapshot).unwrap_or_default();
            Ok(Response::builder()
                .status(200)
                .header("content-type", "application/json")
                .body(full_body(body))
                .unwrap())
        }

        "/blacklist" => {
            let mut addresses: Vec<String> = state
                .blacklist
                .addresses()
                .iter()
                .map(|a| a.to_string())
                .collect();
            addresses.sort();
            let body = serde_json::to_string_pretty(&addresses).unwrap_or_default();
            Ok(Response::builder()
                .status(200)
                .header("content-type", "application/json")
                .body(full_body(body))
                .unwrap())
        }

        _ => Ok(Response::builder()
            .status(404)
            .body(full_body(r#"{"error":"not found"}"#))
            .unwrap()),
    }
}
