use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};

use foodhub_api::app::{build_router, AppState};
use foodhub_api::config::Config;
use foodhub_api::db;
use foodhub_api::services::image_store::{CloudinaryStore, ImageStore, LocalImageStore};
use foodhub_api::services::mailer::{LogMailer, Mailer, SmtpMailer};
use foodhub_api::services::{auth_service, maintenance_service};
use foodhub_api::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env()?;
    let pool = db::connect(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    auth_service::seed_super_admin(&pool, &config).await?;

    let images: Arc<dyn ImageStore> = match &config.cloudinary {
        Some(cloudinary) => {
            tracing::info!(cloud = %cloudinary.cloud_name, "storing images on Cloudinary");
            Arc::new(CloudinaryStore::new(cloudinary.clone()))
        }
        None => {
            tracing::info!(dir = %config.upload_dir.display(), "storing images on local disk");
            Arc::new(LocalImageStore::new(config.upload_dir.clone(), &config.public_base_url))
        }
    };

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(smtp).context("invalid SMTP configuration")?),
        None => {
            tracing::warn!("SMTP_HOST not set, emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    maintenance_service::start(pool.clone(), config.maintenance_interval_secs);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(pool, config, images, mailer)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "foodhub api listening");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;
    let ctrl_c = async {
        signal::ctrl_c().await.ok();
    };
    #[cfg(unix)]
    let term = async {
        if let Ok(mut s) = signal::unix::signal(signal::unix::SignalKind::terminate()) {
            s.recv().await;
        }
    };
    #[cfg(not(unix))]
    let term = std::future::pending::<()>();
    tokio::select! { _ = ctrl_c => {}, _ = term => {} }
}
