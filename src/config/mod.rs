pub mod types;

#[cfg(test)]
mod tests;

pub use types::*;

use crate::net::Subnet;
use crate::secret::Secret;
use anyhow::Result;
use std::path::Path;

impl ScoutConfig {
    /// Load configuration from a file (if it exists) and apply environment
    /// variable overrides. When the file does not exist, built-in defaults
    /// are used so the daemon can start with zero configuration against the
    /// default lab subnet.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: ScoutConfig = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            match path.extension().and_then(|e| e.to_str()) {
                Some("toml") => toml::from_str(&content)?,
                Some("json") => serde_json::from_str(&content)?,
                Some(ext) => anyhow::bail!("unsupported config format: .{ext}, use .toml or .json"),
                None => anyhow::bail!("config file has no extension, use .toml or .json"),
            }
        } else {
            tracing::info!("config file not found at {}, using defaults", path.display());
            ScoutConfig::default()
        };

        config.apply_env_overrides();

        config.validate()?;
        tracing::info!("loaded scout configuration");
        Ok(config)
    }

    /// Apply environment variable overrides for credentials and
    /// infrastructure endpoints.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("SCOUT_ILO_USERNAME") {
            self.ilo.username = v;
        }
        if let Ok(v) = std::env::var("SCOUT_ILO_PASSWORD") {
            self.ilo.password = Secret::new(v);
        }
        if let Ok(v) = std::env::var("SCOUT_BASE_IP") {
            self.ilo.network.base_ip = v;
        }
        if let Ok(v) = std::env::var("SCOUT_SUBNET_MASK") {
            self.ilo.network.subnet_mask = v;
        }

        if let Ok(v) = std::env::var("SCOUT_REDIS_URL") {
            self.redis.url = Some(v);
        }

        if let Ok(v) = std::env::var("SCOUT_NATS_URL") {
            self.nats.url = Some(v);
        }
        if let Ok(v) = std::env::var("SCOUT_NATS_GZIP_FRAME") {
            self.nats.gzip_frame = v == "true" || v == "1";
        }

        if let Ok(v) = std::env::var("SCOUT_ALLOWED_IP") {
            self.system.allowed_ip = Some(v);
        }
    }

    pub fn validate(&self) -> Result<()> {
        // Network configuration must yield a usable subnet before any
        // scheduler starts; the process exits non-zero otherwise.
        Subnet::new(&self.ilo.network.base_ip, &self.ilo.network.subnet_mask)
            .map_err(|e| anyhow::anyhow!(e))?;

        if self.ilo.client_timeout_connect_ms == 0 || self.ilo.client_timeout_read_ms == 0 {
            anyhow::bail!("ilo client timeouts must be positive");
        }

        for name in [
            &self.nats.new_client_queue,
            &self.nats.unauthenticated_queue,
            &self.nats.authenticated_queue,
        ] {
            if name.is_empty() {
                anyhow::bail!("queue name cannot be empty");
            }
        }

        Ok(())
    }
}
