use crate::error::ScoutError;
use crate::probe::{self, Rimp};
use crate::secret::Secret;
use base64::Engine;
use http::header;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch; the timestamp unit used by snapshots
/// and the heartbeat map.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Controller snapshot built from the public identification endpoint.
///
/// Keyed in the registry by the UUID parsed out of the XML document; a
/// snapshot without a UUID is never registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnauthenticatedClient {
    pub uuid: String,
    pub ilo_address: Ipv4Addr,
    pub serial_number: Option<String>,
    pub product_name: Option<String>,
    /// Management processor product line, e.g. "Integrated Lights-Out 4 (iLO 4)".
    pub ilo_type: Option<String>,
    pub firmware: Option<String>,
    pub fetched_at_ms: u64,
    #[serde(default = "default_update_enabled")]
    update_enabled: bool,
}

fn default_update_enabled() -> bool {
    true
}

impl UnauthenticatedClient {
    pub fn from_rimp(addr: Ipv4Addr, rimp: &Rimp) -> Result<Self, ScoutError> {
        let uuid = rimp
            .uuid()
            .ok_or_else(|| ScoutError::Snapshot(format!("controller at {addr} reported no uuid")))?
            .to_string();

        let hsi = rimp.hsi.as_ref();
        let mp = rimp.mp.as_ref();

        Ok(Self {
            uuid,
            ilo_address: addr,
            serial_number: hsi.and_then(|h| h.serial_number.clone()),
            product_name: hsi.and_then(|h| h.product_name.clone()),
            ilo_type: mp.and_then(|m| m.product_name.clone()),
            firmware: mp.and_then(|m| m.firmware.clone()),
            fetched_at_ms: now_ms(),
            update_enabled: true,
        })
    }

    /// Gate consulted by the updater before each refresh.
    pub fn can_update(&self) -> bool {
        self.update_enabled
    }

    pub fn set_update_enabled(&mut self, enabled: bool) {
        self.update_enabled = enabled;
    }

    /// Re-fetch the identification endpoint and rebuild the snapshot.
    pub async fn refresh(&self, http: &reqwest::Client) -> Result<Self, ScoutError> {
        let rimp = probe::check_endpoint(http, self.ilo_address).await?;
        let mut next = Self::from_rimp(self.ilo_address, &rimp)?;
        next.update_enabled = self.update_enabled;
        Ok(next)
    }
}

/// Controller snapshot enriched through the credentialed management API.
///
/// Exists only for controllers whose auth handshake succeeded at
/// registration; the refresh call is an opaque "fetch latest telemetry"
/// against the Redfish system resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedClient {
    pub uuid: String,
    pub ilo_address: Ipv4Addr,
    pub username: String,
    #[serde(skip)]
    password: Secret,
    pub model: Option<String>,
    pub power_state: Option<String>,
    pub health_rollup: Option<String>,
    pub fetched_at_ms: u64,
    #[serde(default = "default_update_enabled")]
    update_enabled: bool,
}

impl AuthenticatedClient {
    /// Try the default credentials against the controller. A rejected or
    /// failed handshake leaves the host registered with only its
    /// unauthenticated snapshot.
    pub async fn handshake(
        http: &reqwest::Client,
        username: &str,
        password: &Secret,
        unauthenticated: &UnauthenticatedClient,
    ) -> Result<Self, ScoutError> {
        let addr = unauthenticated.ilo_address;
        let telemetry = fetch_telemetry(http, addr, username, password).await?;

        Ok(Self {
            uuid: unauthenticated.uuid.clone(),
            ilo_address: addr,
            username: username.to_string(),
            password: password.clone(),
            model: telemetry.model,
            power_state: telemetry.power_state,
            health_rollup: telemetry.health_rollup,
            fetched_at_ms: now_ms(),
            update_enabled: true,
        })
    }

    pub fn can_update(&self) -> bool {
        self.update_enabled
    }

    pub fn set_update_enabled(&mut self, enabled: bool) {
        self.update_enabled = enabled;
    }

    pub async fn refresh(&self, http: &reqwest::Client) -> Result<Self, ScoutError> {
        let telemetry =
            fetch_telemetry(http, self.ilo_address, &self.username, &self.password).await?;
        let mut next = self.clone();
        next.model = telemetry.model;
        next.power_state = telemetry.power_state;
        next.health_rollup = telemetry.health_rollup;
        next.fetched_at_ms = now_ms();
        Ok(next)
    }
}

struct Telemetry {
    model: Option<String>,
    power_state: Option<String>,
    health_rollup: Option<String>,
}

async fn fetch_telemetry(
    http: &reqwest::Client,
    addr: Ipv4Addr,
    username: &str,
    password: &Secret,
) -> Result<Telemetry, ScoutError> {
    let url = format!("https://{}/redfish/v1/Systems/1/", addr);
    let resp = http
        .get(url)
        .header(header::AUTHORIZATION, basic_auth(username, password))
        .send()
        .await
        .map_err(|e| ScoutError::Snapshot(e.to_string()))?;

    let status = resp.status();
    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(ScoutError::AuthHandshake(format!(
            "credentials rejected with status {status}"
        )));
    }
    if !status.is_success() {
        return Err(ScoutError::Snapshot(format!(
            "telemetry fetch got status {status}"
        )));
    }

    let body: serde_json::Value = resp
        .json()
        .await
        .map_err(|e| ScoutError::Snapshot(e.to_string()))?;

    Ok(Telemetry {
        model: json_str(&body, "/Model"),
        power_state: json_str(&body, "/PowerState"),
        health_rollup: json_str(&body, "/Status/HealthRollup")
            .or_else(|| json_str(&body, "/Status/Health")),
    })
}

fn json_str(value: &serde_json::Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

fn basic_auth(username: &str, password: &Secret) -> String {
    let token = base64::engine::general_purpose::STANDARD
        .encode(format!("{}:{}", username, password.expose()));
    format!("Basic {token}")
}
