use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::domain::triage::run_cache_sweeper;

mod adapters;
mod app_state;
mod config;
mod domain;
mod factory;
mod router;
mod routes;
mod services;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::from_filename(".env.local").ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "triage_api=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = config::read_config().context("failed to read configuration")?;

    let connection_pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(settings.database.with_db())
        .await
        .context("failed to connect to Postgres")?;

    sqlx::migrate!()
        .run(&connection_pool)
        .await
        .context("failed to run database migrations")?;
    info!("Database migrations applied");

    let wiring = factory::build(connection_pool, &settings)?;
    tokio::spawn(run_cache_sweeper(
        wiring.response_cache,
        wiring.search_cache,
        Duration::from_secs(settings.triage.sweep_interval_secs),
    ));

    let app = router::create(wiring.app_state, &settings.application);

    let addr = format!("{}:{}", settings.application.host, settings.application.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
