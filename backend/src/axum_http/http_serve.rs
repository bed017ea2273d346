use crate::{
    auth::JwtVerifier,
    axum_http::{default_routers, routers},
    config::config_model::DotEnvyConfig,
};
use anyhow::Result;
use axum::{
    Extension, Router,
    extract::DefaultBodyLimit,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use quill::{
    infra::{
        db::postgres::postgres_connection::PgPoolSquad,
        storages::local_images::{LocalImageStorage, LocalImageStorageConfig},
    },
    payments::stripe_client::StripeClient,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let image_storage = Arc::new(
        LocalImageStorage::new(LocalImageStorageConfig {
            root_dir: config.images.storage_dir.clone(),
            max_bytes: config.images.max_bytes,
        })
        .await?,
    );
    info!(dir = %image_storage.root_dir().display(), "images: storage ready");

    let stripe_client = config.stripe.as_ref().map(|stripe| {
        Arc::new(StripeClient::new(
            stripe.secret_key.clone(),
            stripe.webhook_secret.clone(),
            Duration::from_secs(stripe.webhook_tolerance_secs),
        ))
    });
    if stripe_client.is_none() {
        warn!("subscriptions: stripe keys not set, billing endpoints will answer 503");
    }

    let jwt_verifier = Arc::new(JwtVerifier::from_config(&config.auth)?);

    let app = Router::new()
        .fallback(default_routers::not_found)
        .merge(routers::posts::routes(
            Arc::clone(&db_pool),
            Arc::clone(&image_storage),
            config.images.max_bytes,
        ))
        .merge(routers::interactions::routes(Arc::clone(&db_pool)))
        .merge(routers::comments::routes(Arc::clone(&db_pool)))
        .nest(
            "/api/subscriptions",
            routers::subscriptions::routes(Arc::clone(&db_pool), stripe_client),
        )
        .nest("/api/images", routers::images::routes(image_storage))
        .route("/api/health", get(default_routers::health_check))
        .layer(Extension(jwt_verifier))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(
            CorsLayer::new()
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                ])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
