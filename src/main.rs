use anyhow::Context;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use secrets_keeper::{
    config::{AppConfig, DatabaseConfig},
    db::{self, DbPool, MemorySecretRepository, SecretRepository, SqliteSecretRepository},
    passhash::PassphraseHasher,
    secrets::{SecretService, SystemClock},
    web,
};
use sqlx::sqlite::SqlitePoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// In-flight requests get this long to finish once shutdown starts.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is normal outside development
    let _ = dotenvy::dotenv();

    // Initialize logging first
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "secrets_keeper=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Secrets Keeper v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::init()?;
    info!("Configuration loaded");

    let (repo, pool) = open_repository(&config.database).await?;

    let secrets = SecretService::new(
        repo,
        Arc::new(SystemClock),
        PassphraseHasher::new(config.passphrase),
    )
    .with_limits(config.secrets);

    let app = web::create_router(web::AppState { secrets }, &config.web);
    let web_addr = config.web.bind_addr();

    if let Some((cert, key)) = config.web.tls()? {
        let tls_config = RustlsConfig::from_pem_file(cert, key)
            .await
            .context("Failed to load TLS certificate and key")?;
        let address: SocketAddr = web_addr
            .parse()
            .with_context(|| format!("Invalid bind address {}", web_addr))?;

        let handle = Handle::<SocketAddr>::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });

        info!("Web server listening on https://{}", address);
        axum_server::bind_rustls(address, tls_config)
            .handle(handle)
            .serve(app.into_make_service())
            .await
            .context("HTTPS server failed")?;
    } else {
        let listener = TcpListener::bind(&web_addr).await?;
        info!("Web server listening on http://{}", web_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    }

    if let Some(pool) = pool {
        pool.close().await;
        info!("Database pool closed");
    }

    info!("Shutdown complete");
    Ok(())
}

/// Open the configured secret store. The pool is returned so it can be
/// closed on shutdown.
async fn open_repository(
    config: &DatabaseConfig,
) -> anyhow::Result<(Arc<dyn SecretRepository>, Option<DbPool>)> {
    if config.is_memory() {
        warn!("Using in-process secret store; secrets are lost on restart");
        return Ok((Arc::new(MemorySecretRepository::new()), None));
    }

    // Every connection to sqlite::memory: opens its own empty database
    let max_connections = if config.url.contains(":memory:") {
        1
    } else {
        config.max_connections
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(&config.url)
        .await?;
    info!("Database connected: {}", config.url);

    db::init_db(&pool).await?;

    Ok((Arc::new(SqliteSecretRepository::new(pool.clone())), Some(pool)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
