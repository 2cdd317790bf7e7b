use crate::secret::Secret;
use serde::Deserialize;

/// Top-level daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoutConfig {
    #[serde(default)]
    pub system: SystemConfig,

    #[serde(default)]
    pub ilo: IloConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub registrar: RegistrarConfig,

    #[serde(default)]
    pub updater: UpdaterConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub redis: RedisConfig,

    #[serde(default)]
    pub nats: NatsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    /// Mask credential material on operator-facing surfaces.
    #[serde(default = "default_true")]
    pub obfuscate_secrets: bool,

    /// When set, only this source address may call the admin endpoints.
    #[serde(default)]
    pub allowed_ip: Option<String>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            obfuscate_secrets: true,
            allowed_ip: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IloConfig {
    /// Default credentials tried for the authenticated session.
    #[serde(default = "default_ilo_username")]
    pub username: String,

    #[serde(default)]
    pub password: Secret,

    /// Probe connect deadline (milliseconds).
    #[serde(default = "default_connect_timeout_ms")]
    pub client_timeout_connect_ms: u64,

    /// Probe read deadline (milliseconds).
    #[serde(default = "default_read_timeout_ms")]
    pub client_timeout_read_ms: u64,

    #[serde(default)]
    pub network: NetworkConfig,
}

impl Default for IloConfig {
    fn default() -> Self {
        Self {
            username: default_ilo_username(),
            password: Secret::default(),
            client_timeout_connect_ms: default_connect_timeout_ms(),
            client_timeout_read_ms: default_read_timeout_ms(),
            network: NetworkConfig::default(),
        }
    }
}

fn default_ilo_username() -> String {
    "Administrator".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    2000
}

fn default_read_timeout_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_base_ip")]
    pub base_ip: String,

    #[serde(default = "default_subnet_mask")]
    pub subnet_mask: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            base_ip: default_base_ip(),
            subnet_mask: default_subnet_mask(),
        }
    }
}

fn default_base_ip() -> String {
    "192.168.1.0".to_string()
}

fn default_subnet_mask() -> String {
    "255.255.255.0".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Milliseconds since the last successful update before a host is
    /// reported unresponsive.
    #[serde(default = "default_responsiveness_threshold_ms")]
    pub responsiveness_threshold_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            responsiveness_threshold_ms: default_responsiveness_threshold_ms(),
        }
    }
}

fn default_responsiveness_threshold_ms() -> u64 {
    300_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_scan_startup_delay")]
    pub startup_delay_secs: u64,

    #[serde(default = "default_scan_interval")]
    pub interval_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            startup_delay_secs: default_scan_startup_delay(),
            interval_secs: default_scan_interval(),
        }
    }
}

fn default_scan_startup_delay() -> u64 {
    5
}

fn default_scan_interval() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrarConfig {
    #[serde(default = "default_registrar_startup_delay")]
    pub startup_delay_secs: u64,

    #[serde(default = "default_registrar_interval")]
    pub interval_secs: u64,

    /// ICMP reachability deadline (seconds).
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_secs: u64,
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self {
            startup_delay_secs: default_registrar_startup_delay(),
            interval_secs: default_registrar_interval(),
            ping_timeout_secs: default_ping_timeout(),
        }
    }
}

fn default_registrar_startup_delay() -> u64 {
    30
}

fn default_registrar_interval() -> u64 {
    30
}

fn default_ping_timeout() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdaterConfig {
    #[serde(default = "default_unauthenticated_interval")]
    pub unauthenticated_interval_secs: u64,

    #[serde(default = "default_authenticated_interval")]
    pub authenticated_interval_secs: u64,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            unauthenticated_interval_secs: default_unauthenticated_interval(),
            authenticated_interval_secs: default_authenticated_interval(),
        }
    }
}

fn default_unauthenticated_interval() -> u64 {
    15
}

fn default_authenticated_interval() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_monitor_startup_delay")]
    pub startup_delay_secs: u64,

    #[serde(default = "default_monitor_interval")]
    pub interval_secs: u64,

    /// Cadence of the health-counter pass over the active bitmap.
    #[serde(default = "default_health_interval")]
    pub health_interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            startup_delay_secs: default_monitor_startup_delay(),
            interval_secs: default_monitor_interval(),
            health_interval_secs: default_health_interval(),
        }
    }
}

fn default_monitor_startup_delay() -> u64 {
    10
}

fn default_monitor_interval() -> u64 {
    60
}

fn default_health_interval() -> u64 {
    60
}

/// Key/value store connection. Absent URL runs the daemon on the in-memory
/// store (tests, lab setups without shared state).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedisConfig {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// Broker URL. Absent URL collects messages in the in-memory sink.
    #[serde(default)]
    pub url: Option<String>,

    /// Gzip-frame queue payloads. Consumers accept both forms either way.
    #[serde(default)]
    pub gzip_frame: bool,

    #[serde(default = "default_new_client_queue")]
    pub new_client_queue: String,

    #[serde(default = "default_unauthenticated_queue")]
    pub unauthenticated_queue: String,

    #[serde(default = "default_authenticated_queue")]
    pub authenticated_queue: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: None,
            gzip_frame: false,
            new_client_queue: default_new_client_queue(),
            unauthenticated_queue: default_unauthenticated_queue(),
            authenticated_queue: default_authenticated_queue(),
        }
    }
}

fn default_new_client_queue() -> String {
    "newClientRequestQueue".to_string()
}

fn default_unauthenticated_queue() -> String {
    "unauthenticatedIloClientQueue".to_string()
}

fn default_authenticated_queue() -> String {
    "authenticatedIloClientQueue".to_string()
}

fn default_true() -> bool {
    true
}
