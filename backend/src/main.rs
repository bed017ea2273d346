use anyhow::Result;
use backend::axum_http::http_serve;
use backend::config::config_loader;
use quill::infra::db::postgres::postgres_connection::{
    self, PoolSettings, RetryPolicy,
};
use std::{sync::Arc, time::Duration};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Backend exited with error: {:?}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    quill::observability::init_observability("backend")?;

    let dotenvy_env = config_loader::load()?;
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(
        &dotenvy_env.database.url,
        &PoolSettings {
            max_connections: dotenvy_env.database.max_connections,
            connect_timeout: Duration::from_secs(dotenvy_env.database.connect_timeout_secs),
        },
    )?;

    let reachable = postgres_connection::wait_for_database(
        &postgres_pool,
        &RetryPolicy {
            attempts: dotenvy_env.database.connect_retries,
            initial_backoff: Duration::from_millis(dotenvy_env.database.retry_backoff_ms),
        },
    )
    .await;
    if reachable {
        info!("Postgres connection has been established");
    }

    http_serve::start(Arc::new(dotenvy_env), Arc::new(postgres_pool)).await?;

    Ok(())
}
