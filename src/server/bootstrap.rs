use crate::config;
use crate::health::{counter, heartbeat};
use crate::queue::QueueNames;
use crate::registrar::{self, RegistrarContext, RegistrationRequest};
use crate::scan;
use crate::server::{self, ScoutState};
use crate::updater::{self, InFlightGuard, UpdaterContext};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::time::MissedTickBehavior;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// CLI arguments forwarded from `main()`.
pub struct BootstrapArgs {
    pub config_path: std::path::PathBuf,
    pub admin_listen: String,
}

/// Daemon lifecycle: init → enumerate → start loops → serve admin → shutdown.
pub async fn run(args: BootstrapArgs) -> Result<()> {
    init_tracing();

    // Phase 1: configuration and shared state. Invalid network config or a
    // failed TLS context is fatal here: non-zero exit before any timer.
    let config = config::ScoutConfig::load(&args.config_path)?;
    let state = ScoutState::new(config).await?;

    // Phase 2: registration pipeline channel. Registrar ticks enqueue,
    // one worker drains.
    let (worker_tx, worker_rx) = mpsc::channel::<RegistrationRequest>(1024);

    // Phase 3: loop owners. Each periodic task uses skip-if-busy ticks; the
    // modules only provide single-shot operations.
    let shutdown = Arc::new(Notify::new());
    start_scanner_loop(&state, &shutdown);
    start_registrar_loop(&state, &shutdown, worker_tx);
    start_registration_worker(&state, &shutdown, worker_rx);
    start_unauthenticated_updater(&state, &shutdown);
    start_authenticated_updater(&state, &shutdown);
    start_heartbeat_monitor(&state, &shutdown);
    start_health_pass(&state, &shutdown);

    start_admin_server(&state, &args);

    info!(
        "server: scout running, subnet={}..{}, admin={}",
        state.subnet.network_start(),
        state.subnet.network_end(),
        args.admin_listen,
    );

    // Phase 4: block until signal, then stop every loop.
    wait_for_shutdown(&shutdown).await;

    info!("server: shutdown complete");
    Ok(())
}

fn init_tracing() {
    let (non_blocking, _guard) = tracing_appender::non_blocking::NonBlockingBuilder::default()
        .buffered_lines_limit(128_000)
        .lossy(true)
        .finish(std::io::stdout());

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false)
                .json(),
        )
        .init();

    std::mem::forget(_guard);
}

// ---------------------------------------------------------------------------
// Loop owners, one function per periodic task. A tick only fires when the
// previous invocation has finished (sequential await + skipped missed
// ticks), so scans never overlap and a slow pass stretches its own cadence
// instead of stacking up.
// ---------------------------------------------------------------------------

fn interval_with_delay(startup_delay_secs: u64, interval_secs: u64) -> tokio::time::Interval {
    let mut interval = tokio::time::interval_at(
        tokio::time::Instant::now() + Duration::from_secs(startup_delay_secs),
        Duration::from_secs(interval_secs.max(1)),
    );
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

fn start_scanner_loop(state: &ScoutState, shutdown: &Arc<Notify>) {
    let state = state.clone();
    let shutdown = shutdown.clone();

    tokio::spawn(async move {
        let (delay, period) = {
            let cfg = state.config.load();
            (cfg.scan.startup_delay_secs, cfg.scan.interval_secs)
        };
        let mut interval = interval_with_delay(delay, period);
        let concurrency = state.scan_concurrency();

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.notified() => return,
            }

            let bitmap = scan::run_scan(
                &state.http,
                &state.addresses,
                &state.blacklist,
                &state.registered,
                concurrency,
            )
            .await;
            state.active.store(Arc::new(bitmap));
        }
    });
}

fn registrar_context(state: &ScoutState) -> RegistrarContext {
    let cfg = state.config.load();
    RegistrarContext {
        http: state.http.clone(),
        blacklist: state.blacklist.clone(),
        registered: state.registered.clone(),
        store: state.store.clone(),
        heartbeats: state.heartbeats.clone(),
        clients: state.clients.clone(),
        publisher: state.publisher.clone(),
        queues: QueueNames {
            new_client: cfg.nats.new_client_queue.clone(),
            unauthenticated: cfg.nats.unauthenticated_queue.clone(),
            authenticated: cfg.nats.authenticated_queue.clone(),
        },
        gzip_frame: cfg.nats.gzip_frame,
        username: cfg.ilo.username.clone(),
        password: cfg.ilo.password.clone(),
        ping_timeout: Duration::from_secs(cfg.registrar.ping_timeout_secs),
    }
}

fn start_registrar_loop(
    state: &ScoutState,
    shutdown: &Arc<Notify>,
    worker_tx: mpsc::Sender<RegistrationRequest>,
) {
    let ctx = registrar_context(state);
    let state = state.clone();
    let shutdown = shutdown.clone();

    tokio::spawn(async move {
        let (delay, period) = {
            let cfg = state.config.load();
            (cfg.registrar.startup_delay_secs, cfg.registrar.interval_secs)
        };
        let mut interval = interval_with_delay(delay, period);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.notified() => return,
            }

            let active = state.active.load_full();
            registrar::run_registrar_tick(&ctx, &state.addresses, &active, &worker_tx).await;
        }
    });
}

fn start_registration_worker(
    state: &ScoutState,
    shutdown: &Arc<Notify>,
    mut worker_rx: mpsc::Receiver<RegistrationRequest>,
) {
    let ctx = registrar_context(state);
    let shutdown = shutdown.clone();

    tokio::spawn(async move {
        loop {
            let request = tokio::select! {
                request = worker_rx.recv() => request,
                _ = shutdown.notified() => return,
            };

            let Some(request) = request else { return };
            let addr = request.ilo_address;
            if let Err(e) = registrar::process_registration(&ctx, request).await {
                info!("registrar: registration dropped, addr={}, reason={}", addr, e);
            }
        }
    });
}

fn updater_context(state: &ScoutState, queue: String) -> UpdaterContext {
    let cfg = state.config.load();
    UpdaterContext {
        http: state.http.clone(),
        registered: state.registered.clone(),
        clients: state.clients.clone(),
        heartbeats: state.heartbeats.clone(),
        publisher: state.publisher.clone(),
        queue,
        gzip_frame: cfg.nats.gzip_frame,
        in_flight: InFlightGuard::new(),
    }
}

fn start_unauthenticated_updater(state: &ScoutState, shutdown: &Arc<Notify>) {
    let cfg = state.config.load();
    let ctx = updater_context(state, cfg.nats.unauthenticated_queue.clone());
    let period = cfg.updater.unauthenticated_interval_secs;
    drop(cfg);
    let shutdown = shutdown.clone();

    tokio::spawn(async move {
        let mut interval = interval_with_delay(period, period);
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.notified() => return,
            }
            updater::run_unauthenticated_tick(&ctx);
        }
    });
}

fn start_authenticated_updater(state: &ScoutState, shutdown: &Arc<Notify>) {
    let cfg = state.config.load();
    let ctx = updater_context(state, cfg.nats.authenticated_queue.clone());
    let period = cfg.updater.authenticated_interval_secs;
    drop(cfg);
    let shutdown = shutdown.clone();

    tokio::spawn(async move {
        let mut interval = interval_with_delay(period, period);
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.notified() => return,
            }
            updater::run_authenticated_tick(&ctx);
        }
    });
}

fn start_heartbeat_monitor(state: &ScoutState, shutdown: &Arc<Notify>) {
    let state = state.clone();
    let shutdown = shutdown.clone();

    tokio::spawn(async move {
        let (delay, period, threshold_ms) = {
            let cfg = state.config.load();
            (
                cfg.monitor.startup_delay_secs,
                cfg.monitor.interval_secs,
                cfg.client.responsiveness_threshold_ms,
            )
        };
        let mut interval = interval_with_delay(delay, period);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.notified() => return,
            }
            heartbeat::run_monitor_pass(
                &state.registered,
                &state.blacklist,
                &state.heartbeats,
                threshold_ms,
            );
        }
    });
}

fn start_health_pass(state: &ScoutState, shutdown: &Arc<Notify>) {
    let state = state.clone();
    let shutdown = shutdown.clone();

    tokio::spawn(async move {
        let period = state.config.load().monitor.health_interval_secs;
        let mut interval = interval_with_delay(period, period);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.notified() => return,
            }

            let active = state.active.load_full();
            counter::run_health_pass(
                &state.http,
                &state.addresses,
                &active,
                &state.registered,
                &state.store,
            )
            .await;
        }
    });
}

fn start_admin_server(state: &ScoutState, args: &BootstrapArgs) {
    let s = state.clone();
    let admin_addr = args.admin_listen.clone();
    tokio::spawn(async move {
        if let Err(e) = server::run_admin_server(&admin_addr, s).await {
            tracing::error!("server: admin failed, error={}", e);
        }
    });
}

async fn wait_for_shutdown(shutdown: &Arc<Notify>) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("server: received SIGINT, shutting down"),
        _ = terminate => info!("server: received SIGTERM, shutting down"),
    }

    shutdown.notify_waiters();
}
