use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use photoshare_api::{
    config::Config,
    db::{create_pool, create_redis_client, run_migrations, Cache},
    routes::{create_router, AppState},
    services::{auth::AuthService, email::EmailService, media::CloudinaryStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photoshare_api=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let db_pool = create_pool(&config.database_url).await?;
    run_migrations(&db_pool).await?;
    tracing::info!("Connected to PostgreSQL");

    let redis_client = create_redis_client(&config.redis_url)?;
    let (cache, cache_handle) = Cache::new(redis_client).await;

    let email = EmailService::from_config(&config);
    if email.is_none() {
        tracing::warn!("SMTP not configured, confirmation emails are disabled");
    }

    let state = Arc::new(AppState {
        db_pool,
        cache,
        media: Arc::new(CloudinaryStore::from_config(&config)),
        auth: AuthService::from_config(&config),
        email,
        config: Arc::new(config),
    });

    let app = create_router(state.clone());

    let addr = state.config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "PhotoShare API listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    cache_handle.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
