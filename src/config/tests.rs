use super::ScoutConfig;
use std::path::Path;

#[test]
fn test_load_toml_config() {
    let cfg = ScoutConfig::load(Path::new("config.toml")).unwrap();
    assert!(!cfg.ilo.network.base_ip.is_empty());
    assert!(!cfg.nats.new_client_queue.is_empty());
}

#[test]
fn test_load_json_config() {
    let json = r#"{
        "ilo": {
            "username": "Administrator",
            "password": "secret",
            "network": { "base_ip": "10.20.0.0", "subnet_mask": "255.255.252.0" }
        },
        "redis": { "url": "redis://127.0.0.1:6379" }
    }"#;
    let tmp = std::env::temp_dir().join("scout_test_config.json");
    std::fs::write(&tmp, json).unwrap();
    let cfg = ScoutConfig::load(&tmp).unwrap();
    assert_eq!(cfg.ilo.network.base_ip, "10.20.0.0");
    assert_eq!(cfg.ilo.network.subnet_mask, "255.255.252.0");
    assert_eq!(cfg.redis.url.as_deref(), Some("redis://127.0.0.1:6379"));
    std::fs::remove_file(&tmp).ok();
}

#[test]
fn test_deserialize_defaults() {
    let toml_str = r#"
[ilo.network]
base_ip = "10.0.0.0"
subnet_mask = "255.255.255.252"
"#;
    let cfg: ScoutConfig = toml::from_str(toml_str).unwrap();
    assert_eq!(cfg.ilo.username, "Administrator");
    assert_eq!(cfg.ilo.client_timeout_connect_ms, 2000);
    assert_eq!(cfg.ilo.client_timeout_read_ms, 1000);
    assert_eq!(cfg.client.responsiveness_threshold_ms, 300_000);
    assert_eq!(cfg.scan.startup_delay_secs, 5);
    assert_eq!(cfg.scan.interval_secs, 300);
    assert_eq!(cfg.registrar.interval_secs, 30);
    assert_eq!(cfg.updater.unauthenticated_interval_secs, 15);
    assert_eq!(cfg.updater.authenticated_interval_secs, 5);
    assert_eq!(cfg.monitor.interval_secs, 60);
    assert_eq!(cfg.nats.new_client_queue, "newClientRequestQueue");
    assert_eq!(cfg.nats.unauthenticated_queue, "unauthenticatedIloClientQueue");
    assert_eq!(cfg.nats.authenticated_queue, "authenticatedIloClientQueue");
    assert!(cfg.system.obfuscate_secrets);
    assert!(!cfg.nats.gzip_frame);
}

#[test]
fn test_validate_rejects_bad_base_ip() {
    let mut cfg = ScoutConfig::default();
    cfg.ilo.network.base_ip = "300.1.2.3".to_string();
    assert!(cfg.validate().is_err());
}

#[test]
fn test_validate_rejects_non_contiguous_mask() {
    let mut cfg = ScoutConfig::default();
    cfg.ilo.network.subnet_mask = "255.0.255.0".to_string();
    assert!(cfg.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_timeouts() {
    let mut cfg = ScoutConfig::default();
    cfg.ilo.client_timeout_read_ms = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn test_validate_rejects_empty_queue_name() {
    let mut cfg = ScoutConfig::default();
    cfg.nats.new_client_queue = String::new();
    assert!(cfg.validate().is_err());
}

#[test]
fn test_password_never_renders_in_debug() {
    let toml_str = r#"
[ilo]
password = "topsecret"
"#;
    let cfg: ScoutConfig = toml::from_str(toml_str).unwrap();
    let rendered = format!("{:?}", cfg);
    assert!(!rendered.contains("topsecret"));
    assert_eq!(cfg.ilo.password.expose(), "topsecret");
}

#[test]
fn test_unsupported_format() {
    let tmp = std::env::temp_dir().join("scout_test.yml");
    std::fs::write(&tmp, "key: value").unwrap();
    assert!(ScoutConfig::load(&tmp).is_err());
    std::fs::remove_file(&tmp).ok();
}
