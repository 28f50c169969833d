use actix_web::{web, App, HttpResponse, HttpServer};
use anyhow::{anyhow, Context};
use blob_store::S3BlobStore;
use posting_service::db::{PgContentItemStore, MIGRATOR};
use posting_service::jobs::{start_orphan_sweeper, OrphanSweeper};
use posting_service::services::AttachmentEngine;
use posting_service::Config;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct HealthState {
    db_pool: Pool<Postgres>,
    blobs: Arc<S3BlobStore>,
}

async fn health_summary(state: web::Data<HealthState>) -> HttpResponse {
    if let Err(e) = sqlx::query("SELECT 1").fetch_one(&state.db_pool).await {
        return HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("PostgreSQL connection failed: {}", e),
            "service": "posting-service"
        }));
    }

    if let Err(e) = state.blobs.health_check().await {
        return HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("Blob store check failed: {}", e),
            "service": "posting-service"
        }));
    }

    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "posting-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
                return;
            }
            Err(e) => tracing::warn!("Failed to install SIGTERM handler: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
    }
}

/// Posting Service
///
/// Hosts the attachment core for posts and messages. The binary itself
/// serves only operational endpoints:
///
/// - `/health` - PostgreSQL and blob store reachability
/// - `/metrics` - Prometheus metrics
///
/// and runs the orphan sweeper in the background.
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("WARNING: failed to load .env: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,posting_service=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow!("Failed to load configuration: {}", e))?;

    tracing::info!("Starting posting-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database.url)
        .await
        .context("Failed to create database pool")?;
    tracing::info!("Connected to database");

    MIGRATOR
        .run(&db_pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    let blobs = Arc::new(S3BlobStore::connect(config.s3.clone()).await);
    match blobs.health_check().await {
        Ok(()) => tracing::info!(bucket = %config.s3.bucket, "Blob store connection validated"),
        Err(e) => {
            tracing::error!(bucket = %config.s3.bucket, error = %e, "Blob store health check failed");
            return Err(anyhow!("Blob store initialization failed: {}", e));
        }
    }

    let content_store = Arc::new(PgContentItemStore::new(db_pool.clone()));
    let engine = AttachmentEngine::new(content_store.clone(), blobs.clone());

    let health_state = web::Data::new(HealthState {
        db_pool: db_pool.clone(),
        blobs: blobs.clone(),
    });

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(health_state.clone())
            .wrap(tracing_actix_web::TracingLogger::default())
            .route(
                "/metrics",
                web::get().to(posting_service::metrics::serve_metrics),
            )
            .route("/health", web::get().to(health_summary))
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .workers(2)
    .run();

    let server_handle = server.handle();

    let mut tasks: JoinSet<io::Result<()>> = JoinSet::new();

    tasks.spawn(async move {
        tracing::info!("HTTP server is running");
        server.await
    });

    if config.sweeper.enabled {
        let sweeper = OrphanSweeper::new(content_store, engine, config.sweeper.clone());
        tasks.spawn(async move {
            start_orphan_sweeper(sweeper).await;
            Ok(())
        });
    } else {
        tracing::info!("Orphan sweeper disabled");
    }

    let mut first_error: Option<io::Error> = None;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = tasks.join_next() => {
                match result {
                    Some(Ok(Ok(_))) => {
                        tracing::info!("Background task completed");
                    }
                    Some(Ok(Err(e))) => {
                        tracing::error!("Task returned error: {}", e);
                        first_error.get_or_insert(e);
                        server_handle.stop(true).await;
                        tasks.shutdown().await;
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::error!("Task join error: {}", e);
                        first_error.get_or_insert(io::Error::new(io::ErrorKind::Other, e.to_string()));
                        server_handle.stop(true).await;
                        tasks.shutdown().await;
                        break;
                    }
                    None => break,
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                server_handle.stop(true).await;
                tasks.shutdown().await;
                break;
            }
        }
    }

    tracing::info!("Posting-service shutting down");

    match first_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
