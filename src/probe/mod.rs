pub mod client;
pub mod rimp;

pub use client::build_probe_client;
pub use rimp::Rimp;

use crate::error::ScoutError;
use crate::registry::{Blacklist, RegistrationSet};
use std::net::Ipv4Addr;
use tracing::{debug, info};

pub fn xmldata_url(addr: Ipv4Addr) -> String {
    format!("https://{}/xmldata?item=all", addr)
}

/// Fetch and validate the identification document. No classification side
/// effects; this is the raw check shared by the scanner probe, the
/// snapshot builder, and the health-counter pass.
pub async fn check_endpoint(http: &reqwest::Client, addr: Ipv4Addr) -> Result<Rimp, ScoutError> {
    let resp = http
        .get(xmldata_url(addr))
        .send()
        .await
        .map_err(classify_transport_error)?;

    let status = resp.status();
    if status.as_u16() != 200 {
        return Err(ScoutError::ProbeStatus(status.as_u16()));
    }

    let body = resp.text().await.map_err(classify_transport_error)?;
    rimp::parse_rimp(&body)
}

/// Classify a candidate address as a live iLO controller.
///
/// Blacklisted addresses answer `false` and already-registered addresses
/// answer `true`, both without network I/O. Any probe failure blacklists
/// the address; the registration set is never touched here. Timeouts and
/// refused connections are the expected common case on a sparse subnet and
/// are kept off the info log.
pub async fn identify(
    http: &reqwest::Client,
    blacklist: &Blacklist,
    registered: &RegistrationSet,
    addr: Ipv4Addr,
) -> bool {
    if blacklist.contains(addr) {
        return false;
    }
    if registered.contains(addr) {
        return true;
    }

    match check_endpoint(http, addr).await {
        Ok(_) => {
            debug!("probe: identified iLO, addr={}", addr);
            metrics::counter!("scout_probe_total", "result" => "hit").increment(1);
            true
        }
        Err(ScoutError::ProbeTimeout) => {
            blacklist.insert(addr);
            debug!("probe: no answer, addr={}", addr);
            metrics::counter!("scout_probe_total", "result" => "timeout").increment(1);
            false
        }
        Err(e) => {
            blacklist.insert(addr);
            info!("probe: rejected, addr={}, reason={}", addr, e);
            metrics::counter!("scout_probe_total", "result" => "rejected").increment(1);
            false
        }
    }
}

fn classify_transport_error(e: reqwest::Error) -> ScoutError {
    if e.is_timeout() || e.is_connect() {
        ScoutError::ProbeTimeout
    } else {
        ScoutError::ProbeBadBody(e.to_string())
    }
}
