//! Backend entry-point: loads settings, prepares persistence and serves the
//! REST API.

mod server;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr, eyre};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use backend::inbound::http::health::HealthState;
use backend::inbound::http::session_config::{BuildMode, session_settings};
use backend::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
use server::{ServerConfig, ServerSettings, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServerSettings::load().wrap_err("load server settings")?;
    let session = session_settings(
        &settings.session_toggles(),
        BuildMode::from_debug_assertions(),
    )
    .wrap_err("validate session settings")?;
    let bind_addr = settings.bind_addr()?;

    let mut config = ServerConfig::new(session, bind_addr);
    match settings.database_url() {
        Some(url) => {
            if settings.run_migrations {
                apply_migrations(url.to_owned()).await?;
            }
            let pool = DbPool::new(
                PoolConfig::new(url).with_max_size(settings.pool_max_size()),
            )
            .await
            .map_err(|err| eyre!("create database pool: {}", err.into_message()))?;
            config = config.with_db_pool(pool);
        }
        None => warn!("no database_url configured; serving fixture data"),
    }

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), config).wrap_err("start HTTP server")?;
    let handle = server.handle();
    info!(%bind_addr, "clinic backend listening");

    let shutdown_state = health_state.clone();
    actix_web::rt::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for shutdown signal");
            return;
        }
        shutdown_state.mark_draining();
        handle.stop(true).await;
    });

    server.await.wrap_err("serve HTTP")?;
    info!("clinic backend stopped");
    Ok(())
}

/// Run embedded migrations on a blocking thread; Diesel's migration harness
/// is synchronous.
async fn apply_migrations(database_url: String) -> Result<()> {
    tokio::task::spawn_blocking(move || run_pending_migrations(&database_url))
        .await
        .wrap_err("join migration task")?
        .wrap_err("apply migrations")?;
    Ok(())
}
