//! Integration tests for the redis-backed health store.
//!
//! These tests require Docker (via testcontainers). Run with:
//! `cargo test --test redis_integration -- --ignored`

use ilo_scout::registry::RegistrationSet;
use ilo_scout::store::HealthStore;
use std::net::Ipv4Addr;
use testcontainers::core::IntoContainerPort;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage};

async fn start_redis() -> (HealthStore, ContainerAsync<GenericImage>) {
    let container = GenericImage::new("redis", "7-alpine")
        .with_exposed_port(6379_u16.tcp())
        .start()
        .await
        .expect("failed to start redis container");

    let host = container.get_host().await.expect("get host");
    let port = container.get_host_port_ipv4(6379).await.expect("get port");
    let url = format!("redis://{}:{}", host, port);

    // Wait for redis to accept connections.
    let mut store = None;
    for _ in 0..30 {
        match HealthStore::connect_redis(&url).await {
            Ok(s) => {
                store = Some(s);
                break;
            }
            Err(_) => tokio::time::sleep(std::time::Duration::from_millis(200)).await,
        }
    }

    (store.expect("connect to redis"), container)
}

#[tokio::test]
#[ignore]
async fn test_health_counter_lifecycle() {
    let (store, _container) = start_redis().await;
    let addr = Ipv4Addr::new(10, 0, 0, 1);

    assert_eq!(store.get_health(addr).await, 0);
    store.set_health(addr, 5).await;
    assert_eq!(store.get_health(addr).await, 5);

    // INCR is clamped at the ceiling.
    assert_eq!(store.incr_health(addr).await, 5);

    for expected in [4, 3, 2, 1, 0] {
        assert_eq!(store.decr_health(addr).await, expected);
    }
    // DECR is clamped at the floor.
    assert_eq!(store.decr_health(addr).await, 0);
}

#[tokio::test]
#[ignore]
async fn test_alive_flag_and_registration_write_through() {
    let (store, _container) = start_redis().await;
    let set = RegistrationSet::new(store.clone());
    let addr = Ipv4Addr::new(10, 0, 0, 2);

    assert!(!store.get_alive(addr).await);
    set.register(addr).await;
    assert!(store.get_alive(addr).await);

    set.unregister(addr).await;
    assert!(!store.get_alive(addr).await);
    assert_eq!(store.get_health(addr).await, 0);
}
