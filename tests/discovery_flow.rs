//! End-to-end exercises for the discovery-and-liveness pipeline using the
//! in-memory store and queue sink. Network-facing paths run against
//! RFC 5737 TEST-NET addresses with short timeouts, so every probe resolves
//! deterministically without a live controller.

use ilo_scout::client::now_ms;
use ilo_scout::health::heartbeat::{run_monitor_pass, MonitorReport};
use ilo_scout::health::{counter, HeartbeatMap};
use ilo_scout::net::{Bitmap, Subnet};
use ilo_scout::probe::{self, build_probe_client};
use ilo_scout::queue::{decode_payload, encode_payload, Publisher, QueueNames};
use ilo_scout::registrar::{self, RegistrarContext, RegistrationRequest};
use ilo_scout::registry::{Blacklist, ClientRegistry, RegistrationSet};
use ilo_scout::scan::run_scan;
use ilo_scout::secret::Secret;
use ilo_scout::store::HealthStore;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn test_net(last_octet: u8) -> Ipv4Addr {
    Ipv4Addr::new(192, 0, 2, last_octet)
}

fn registrar_context(
    store: &HealthStore,
    publisher: &Publisher,
) -> (RegistrarContext, Blacklist, RegistrationSet, ClientRegistry) {
    let blacklist = Blacklist::new();
    let registered = RegistrationSet::new(store.clone());
    let clients = ClientRegistry::new();
    let ctx = RegistrarContext {
        http: build_probe_client(50, 50).unwrap(),
        blacklist: blacklist.clone(),
        registered: registered.clone(),
        store: store.clone(),
        heartbeats: HeartbeatMap::new(),
        clients: clients.clone(),
        publisher: publisher.clone(),
        queues: QueueNames {
            new_client: "newClientRequestQueue".to_string(),
            unauthenticated: "unauthenticatedIloClientQueue".to_string(),
            authenticated: "authenticatedIloClientQueue".to_string(),
        },
        gzip_frame: false,
        username: "Administrator".to_string(),
        password: Secret::new(""),
        ping_timeout: Duration::from_millis(100),
    };
    (ctx, blacklist, registered, clients)
}

fn memory_sink(publisher: &Publisher) -> &ilo_scout::queue::MemorySink {
    match publisher {
        Publisher::Memory(sink) => sink,
        _ => panic!("expected memory publisher"),
    }
}

// Subnet enumeration properties over a handful of prefix lengths.
#[test]
fn enumeration_is_complete_distinct_and_ordered() {
    for (base, mask, expected) in [
        ("10.0.0.0", "255.255.255.252", 4usize),
        ("10.0.0.0", "255.255.255.240", 16),
        ("172.16.4.0", "255.255.255.0", 256),
    ] {
        let subnet = Subnet::new(base, mask).unwrap();
        let addrs = subnet.addresses();
        assert_eq!(addrs.len(), expected);
        for pair in addrs.windows(2) {
            assert!(u32::from(pair[0]) < u32::from(pair[1]));
        }
        for addr in &addrs {
            assert!(subnet.contains(*addr));
        }
        assert!(!subnet.contains(Ipv4Addr::from(u32::from(addrs[expected - 1]) + 1)));
    }
}

// A scan over a /30-sized range where nothing answers: every candidate is
// probed, fails, and lands in the blacklist. A second scan answers entirely
// from the blacklist.
#[tokio::test]
async fn scan_blacklists_unresponsive_range_and_sticks() {
    let http = build_probe_client(50, 50).unwrap();
    let store = HealthStore::memory();
    let blacklist = Blacklist::new();
    let registered = RegistrationSet::new(store.clone());

    let addresses: Vec<Ipv4Addr> = (0..4).map(test_net).collect();

    let bitmap = run_scan(&http, &addresses, &blacklist, &registered, 30).await;
    assert_eq!(bitmap.len(), 4);
    assert_eq!(bitmap.count(), 0);
    for addr in &addresses {
        assert!(blacklist.contains(*addr));
    }

    // Second round with a deliberately slow client: answered from the
    // blacklist without sockets, so it finishes far inside the timeout.
    let slow_http = build_probe_client(5000, 5000).unwrap();
    let start = std::time::Instant::now();
    let bitmap = run_scan(&slow_http, &addresses, &blacklist, &registered, 30).await;
    assert_eq!(bitmap.count(), 0);
    assert!(start.elapsed() < Duration::from_secs(1));
}

// Registered hosts short-circuit to active without I/O; the produced bitmap
// matches the classification exactly even when other hosts error out.
#[tokio::test]
async fn scan_isolates_per_host_failures() {
    let http = build_probe_client(50, 50).unwrap();
    let store = HealthStore::memory();
    let blacklist = Blacklist::new();
    let registered = RegistrationSet::new(store.clone());

    let addresses: Vec<Ipv4Addr> = (10..14).map(test_net).collect();
    registered.register(addresses[2]).await;

    let bitmap = run_scan(&http, &addresses, &blacklist, &registered, 4).await;
    assert_eq!(bitmap.len(), 4);
    assert_eq!(bitmap.ones().collect::<Vec<_>>(), vec![2]);
    // The failing hosts were classified, not skipped.
    for (i, addr) in addresses.iter().enumerate() {
        assert_eq!(blacklist.contains(*addr), i != 2);
    }
}

// The registrar tick publishes exactly one request per unclassified active
// host and nothing for hosts already classified.
#[tokio::test]
async fn registrar_tick_publishes_one_request_per_new_host() {
    let store = HealthStore::memory();
    let publisher = Publisher::memory();
    let (ctx, blacklist, registered, _clients) = registrar_context(&store, &publisher);

    let addresses: Vec<Ipv4Addr> = (20..24).map(test_net).collect();
    let mut active = Bitmap::new(4);
    active.set(0); // new host
    active.set(1); // blacklisted
    active.set(2); // already registered

    blacklist.insert(addresses[1]);
    registered.register(addresses[2]).await;

    let (tx, mut rx) = mpsc::channel::<RegistrationRequest>(8);
    registrar::run_registrar_tick(&ctx, &addresses, &active, &tx).await;

    let sink = memory_sink(&publisher);
    let published = sink.messages_for("newClientRequestQueue");
    assert_eq!(published.len(), 1);

    let body = decode_payload(&published[0]).unwrap();
    let request: RegistrationRequest = serde_json::from_slice(&body).unwrap();
    assert_eq!(request.ilo_address, addresses[0]);

    // Exactly one request reached the worker channel too.
    let queued = rx.try_recv().unwrap();
    assert_eq!(queued.ilo_address, addresses[0]);
    assert!(rx.try_recv().is_err());
}

// Consumers must accept framed and unframed request bodies alike.
#[tokio::test]
async fn registrar_requests_decode_under_both_framings() {
    for gzip_frame in [false, true] {
        let store = HealthStore::memory();
        let publisher = Publisher::memory();
        let (mut ctx, _blacklist, _registered, _clients) = registrar_context(&store, &publisher);
        ctx.gzip_frame = gzip_frame;

        let addresses = vec![test_net(30)];
        let mut active = Bitmap::new(1);
        active.set(0);

        let (tx, _rx) = mpsc::channel::<RegistrationRequest>(8);
        registrar::run_registrar_tick(&ctx, &addresses, &active, &tx).await;

        let published = memory_sink(&publisher).messages_for("newClientRequestQueue");
        let body = decode_payload(&published[0]).unwrap();
        let request: RegistrationRequest = serde_json::from_slice(&body).unwrap();
        assert_eq!(request.ilo_address, addresses[0]);
    }
}

// Duplicate registration requests: the in-set check drops the second one
// before any reachability probe or queue traffic.
#[tokio::test]
async fn duplicate_registration_request_is_dropped() {
    let store = HealthStore::memory();
    let publisher = Publisher::memory();
    let (ctx, _blacklist, registered, clients) = registrar_context(&store, &publisher);

    let addr = test_net(40);
    registered.register(addr).await;
    let sink_len_before = memory_sink(&publisher).len();

    let result = registrar::process_registration(&ctx, RegistrationRequest::new(addr)).await;
    assert!(result.is_ok());

    assert_eq!(memory_sink(&publisher).len(), sink_len_before);
    assert_eq!(clients.unauthenticated_len(), 0);
    assert_eq!(registered.len(), 1);
}

// An unreachable host is dropped without being registered or blacklisted,
// so it can recover on a later tick.
#[tokio::test]
async fn unreachable_host_is_dropped_not_blacklisted() {
    let store = HealthStore::memory();
    let publisher = Publisher::memory();
    let (ctx, blacklist, registered, _clients) = registrar_context(&store, &publisher);

    let addr = test_net(41);
    let result = registrar::process_registration(&ctx, RegistrationRequest::new(addr)).await;
    assert!(result.is_err());

    assert!(!registered.contains(addr));
    assert!(!blacklist.contains(addr));
    assert!(!store.get_alive(addr).await);
}

// Health decay over consecutive failing passes: 5 → 4 → 3 → 2 with the
// alive flag holding true the whole way.
#[tokio::test]
async fn health_counter_decays_but_host_stays_alive() {
    let http = build_probe_client(50, 50).unwrap();
    let store = HealthStore::memory();
    let registered = RegistrationSet::new(store.clone());

    let addr = test_net(50);
    let addresses = vec![addr];
    registered.register(addr).await;
    store.set_health(addr, 5).await;
    store.set_alive(addr, true).await;

    let mut active = Bitmap::new(1);
    active.set(0);

    for expected in [4i64, 3, 2] {
        counter::run_health_pass(&http, &addresses, &active, &registered, &store).await;
        assert_eq!(store.get_health(addr).await, expected);
        assert!(store.get_alive(addr).await);
    }
}

// Heartbeat silence beyond the threshold is reported, and the host stays
// registered.
#[tokio::test]
async fn stale_heartbeat_is_reported_not_evicted() {
    let store = HealthStore::memory();
    let registered = RegistrationSet::new(store.clone());
    let blacklist = Blacklist::new();
    let heartbeats = HeartbeatMap::new();

    let addr = test_net(60);
    registered.register(addr).await;
    heartbeats.stamp_at(addr, now_ms().saturating_sub(300_001));

    let report = run_monitor_pass(&registered, &blacklist, &heartbeats, 300_000);
    assert_eq!(report.unresponsive, vec![addr]);
    assert!(report.responsive.is_empty());
    assert!(registered.contains(addr));
}

// Blacklist and registration stay disjoint through the probe path: a
// registered host is never blacklisted by identify, and a blacklisted one
// is never reported active.
#[tokio::test]
async fn classification_stays_disjoint() {
    let http = build_probe_client(50, 50).unwrap();
    let store = HealthStore::memory();
    let blacklist = Blacklist::new();
    let registered = RegistrationSet::new(store.clone());

    let registered_addr = test_net(70);
    let blacklisted_addr = test_net(71);
    registered.register(registered_addr).await;
    blacklist.insert(blacklisted_addr);

    assert!(probe::identify(&http, &blacklist, &registered, registered_addr).await);
    assert!(!probe::identify(&http, &blacklist, &registered, blacklisted_addr).await);

    assert!(!blacklist.contains(registered_addr));
    assert!(!registered.contains(blacklisted_addr));
}

// The published active bitmap is replaced atomically: a reader holding the
// previous snapshot keeps a complete bitmap while a new one lands.
#[tokio::test]
async fn active_bitmap_swaps_atomically() {
    let swap = arc_swap::ArcSwap::new(Arc::new(Bitmap::new(8)));

    let before = swap.load_full();
    let mut next = Bitmap::new(8);
    next.set(3);
    next.set(5);
    swap.store(Arc::new(next));

    // Old snapshot is unchanged and still complete.
    assert_eq!(before.count(), 0);
    assert_eq!(before.len(), 8);

    let after = swap.load();
    assert_eq!(after.ones().collect::<Vec<_>>(), vec![3, 5]);
}

// Snapshot payloads published by the updater path stay parseable under the
// gzip framing choice.
#[test]
fn snapshot_payload_framing_roundtrip() {
    let json = br#"{"uuid":"U-1","iloAddress":"10.0.0.1"}"#;
    for gzip in [false, true] {
        let framed = encode_payload(json, gzip);
        assert_eq!(decode_payload(&framed).unwrap(), json);
    }
}

// Monitor report is empty when every host is fresh.
#[tokio::test]
async fn monitor_reports_fresh_hosts_responsive() {
    let store = HealthStore::memory();
    let registered = RegistrationSet::new(store.clone());
    let heartbeats = HeartbeatMap::new();

    let addr = test_net(80);
    registered.register(addr).await;
    heartbeats.stamp(addr);

    let report = run_monitor_pass(&registered, &Blacklist::new(), &heartbeats, 300_000);
    assert_eq!(
        report,
        MonitorReport {
            responsive: vec![addr],
            unresponsive: vec![],
            missing: vec![],
        }
    );
}
