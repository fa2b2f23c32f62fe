//! 病历服务入口

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use medrec_adapter_postgres::{
    MigrationManager, PostgresAuditStore, PostgresConfig, create_pool, medrec_migrations,
};
use medrec_audit_core::AuditRecorder;
use medrec_auth_core::{Authorizer, PermissionMatrix, TokenService};
use medrec_config::{AppConfig, CorsConfig, LogFormat};
use medrec_telemetry::{init_metrics, init_tracing, init_tracing_json};
use records_api::build_router;
use records_api::state::{AppState, Repositories};
use secrecy::ExposeSecret;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};

/// 请求体上限
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// 停机时等待后台审计写入的上限
const AUDIT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // 加载配置
    let config_dir = std::env::var("APP_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let config = AppConfig::load(&config_dir)?;

    // 初始化 tracing
    match config.telemetry.format {
        LogFormat::Json => init_tracing_json(&config.telemetry.log_level),
        LogFormat::Text => init_tracing(&config.telemetry.log_level),
    }
    info!(app = %config.app_name, env = %config.app_env, "Starting records service");

    let metrics = if config.telemetry.metrics_enabled {
        Some(init_metrics()?)
    } else {
        None
    };

    // 数据库
    let pool = create_pool(
        &PostgresConfig::new(config.database.url.expose_secret().as_str())
            .with_max_connections(config.database.max_connections),
    )
    .await?;

    if config.database.run_migrations {
        let result = MigrationManager::new(pool.clone())
            .migrate(&medrec_migrations())
            .await?;
        info!(
            applied = result.applied_count(),
            skipped = result.skipped.len(),
            "Database migrations complete"
        );
    }

    // 授权、令牌、审计
    let authorizer = Authorizer::new(Arc::new(PermissionMatrix::hospital_default()));
    let tokens = TokenService::new(
        config.jwt.secret.expose_secret(),
        config.jwt.expires_in,
        config.jwt.issuer.clone(),
        config.jwt.audience.clone(),
    );
    let audit = AuditRecorder::from_config(
        Arc::new(PostgresAuditStore::new(pool.clone())),
        &config.audit,
    );

    let mut state = AppState::new(Repositories::postgres(pool.clone()), authorizer, tokens, audit)
        .with_database(pool);
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }

    let recorder = state.audit.clone();
    let app = build_router(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(cors_layer(&config.cors));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if tokio::time::timeout(AUDIT_DRAIN_TIMEOUT, recorder.drain())
        .await
        .is_err()
    {
        warn!("Timed out waiting for pending audit writes");
    }

    info!("Records service stopped");
    Ok(())
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.allowed_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// 等待 Ctrl+C 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => warn!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
