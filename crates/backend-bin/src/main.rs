use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use recruit_auth::{
    auth::{AuthRateLimiter, DefaultAuth},
    clock::{Clock, SystemClock},
    config::{LogFormat, Settings, StorageBackend},
    housekeeping,
    middleware::RateLimiter,
    notify::{Dispatcher, LogGateway, NotificationGateway, SmtpGateway},
    router,
    storage::{CredentialStore, FlatFileStore, MemoryStore},
    AppState,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Email and password authentication server
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Config file; defaults to config/default.{toml,yaml,json} if present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the bind address
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(settings: &Settings, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    if json || settings.log_format == LogFormat::Json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}

fn build_store(settings: &Settings) -> anyhow::Result<Arc<dyn CredentialStore>> {
    let store: Arc<dyn CredentialStore> = match settings.storage.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::FlatFile => Arc::new(
            FlatFileStore::new(&settings.storage.path).with_context(|| {
                format!("opening store at {}", settings.storage.path.display())
            })?,
        ),
    };
    Ok(store)
}

fn build_gateway(settings: &Settings) -> anyhow::Result<Arc<dyn NotificationGateway>> {
    let gateway: Arc<dyn NotificationGateway> = match &settings.email.smtp {
        Some(smtp) => Arc::new(SmtpGateway::new(smtp, &settings.email.from)?),
        None => Arc::new(LogGateway),
    };
    Ok(gateway)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load_from(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        settings.bind_addr = bind;
    }
    init_tracing(&settings, args.json_logs);

    let store = build_store(&settings)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (dispatcher, _email_worker) =
        Dispatcher::from_settings(build_gateway(&settings)?, &settings.email);

    let auth = Arc::new(DefaultAuth::new(
        store.clone(),
        clock.clone(),
        dispatcher,
        &settings,
    ));
    auth.warm_up().await.context("preparing password hasher")?;

    let rate_limiter = Arc::new(RateLimiter::from_settings(&settings.rate_limit));
    let auth_limiter = Arc::new(AuthRateLimiter::from_settings(&settings.auth_lockout));
    let _housekeeping = housekeeping::spawn(
        store,
        clock,
        Some((rate_limiter.clone(), auth_limiter.clone())),
        Duration::from_secs(settings.housekeeping_interval_secs),
    );

    let addr = settings.bind_addr;
    let state = Arc::new(
        AppState::new(auth, settings)
            .with_rate_limiter(rate_limiter)
            .with_auth_limiter(auth_limiter),
    );
    let app = router::create_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
