//! Employee Portal Gateway

mod auth;
mod directory;
mod error;
mod middleware;
mod routing;
mod security_headers;
mod state;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use portal_adapter_postgres::{PgUserStore, PostgresConfig, create_pool, run_migrations};
use portal_auth_core::{CredentialHasher, Guard, IdentityResolver, SessionCarrier, SessionCodec};
use portal_config::AppConfig;
use portal_ports::UserStore;
use secrecy::ExposeSecret;
use tracing::{error, info};

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // 加载配置
    let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let config = AppConfig::load(&config_dir)?;

    portal_telemetry::init(&config.telemetry.log_level, config.telemetry.json);
    let metrics = portal_telemetry::init_metrics()?;

    info!(
        app_name = %config.app_name,
        app_env = %config.app_env,
        "Configuration loaded"
    );

    // 数据库
    let pg_config = PostgresConfig::new(config.database.url.expose_secret().clone())
        .with_max_connections(config.database.max_connections)
        .with_min_connections(config.database.min_connections)
        .with_acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
        .with_idle_timeout(Duration::from_secs(config.database.idle_timeout_secs));
    let pool = create_pool(&pg_config).await?;

    if config.database.run_migrations {
        run_migrations(&pool).await?;
        info!("Database migrations applied");
    }

    // 认证
    CredentialHasher::warm_up()?;
    let store: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool.clone()));
    let codec = SessionCodec::new(config.session.signing_secret.expose_secret().as_bytes());
    let carrier = SessionCarrier::new(config.session.cookie_name.clone())
        .with_secure(config.session.secure);
    let resolver = IdentityResolver::new(codec, carrier, store.clone())
        .with_lookup_timeout(Duration::from_secs(config.session.lookup_timeout_secs));

    let state = AppState::new(
        Guard::new(resolver),
        store,
        chrono::Duration::seconds(config.session.ttl_secs),
    )
    .with_pool(pool)
    .with_metrics(metrics);

    let app = routing::app(
        state,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(%addr, "Starting gateway");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

/// 等待关闭信号
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
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
