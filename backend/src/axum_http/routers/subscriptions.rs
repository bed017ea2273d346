use crate::{
    auth::AuthUser,
    axum_http::{error_responses::AppResult, routers::extractors::json_body},
    usecases::subscriptions::{StripeGateway, SubscriptionUseCase},
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
    response::IntoResponse,
    routing::{delete, get, post},
};
use quill::{
    domain::{
        repositories::{subscriptions::SubscriptionRepository, users::UserRepository},
        value_objects::subscriptions::{CreateCheckoutRequest, CreatePortalRequest},
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{subscriptions::SubscriptionPostgres, users::UserPostgres},
    },
    payments::stripe_client::StripeClient,
};
use std::sync::Arc;
use tracing::info;

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

pub fn routes(db_pool: Arc<PgPoolSquad>, stripe_client: Option<Arc<StripeClient>>) -> Router {
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let user_repository = UserPostgres::new(Arc::clone(&db_pool));

    let usecase = SubscriptionUseCase::new(
        Arc::new(subscription_repository),
        Arc::new(user_repository),
        stripe_client,
    );

    Router::new()
        .route("/webhook", post(stripe_webhook))
        .route("/checkout", post(create_checkout_session))
        .route("/portal", post(create_portal_session))
        .route("/status", get(subscription_status))
        .route("/cancel", delete(cancel_subscription))
        .route("/premium-access", get(premium_access))
        .with_state(Arc::new(usecase))
}

/// Raw body is required: the signature covers the exact bytes sent.
pub async fn stripe_webhook<S, U, Stripe>(
    State(usecase): State<Arc<SubscriptionUseCase<S, U, Stripe>>>,
    headers: HeaderMap,
    payload: Bytes,
) -> AppResult<impl IntoResponse>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let ack = usecase.handle_webhook(&payload, signature).await?;
    Ok(Json(ack))
}

pub async fn create_checkout_session<S, U, Stripe>(
    State(usecase): State<Arc<SubscriptionUseCase<S, U, Stripe>>>,
    auth: AuthUser,
    body: Result<Json<CreateCheckoutRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    info!(external_id = %auth.external_id, "subscriptions: checkout request received");
    let session = usecase
        .create_checkout_session(&auth, json_body(body)?)
        .await?;
    Ok(Json(session))
}

pub async fn create_portal_session<S, U, Stripe>(
    State(usecase): State<Arc<SubscriptionUseCase<S, U, Stripe>>>,
    auth: AuthUser,
    body: Result<Json<CreatePortalRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    let session = usecase
        .create_portal_session(&auth, json_body(body)?)
        .await?;
    Ok(Json(session))
}

pub async fn subscription_status<S, U, Stripe>(
    State(usecase): State<Arc<SubscriptionUseCase<S, U, Stripe>>>,
    auth: AuthUser,
) -> AppResult<impl IntoResponse>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    let status = usecase.status(&auth).await?;
    Ok(Json(status))
}

pub async fn cancel_subscription<S, U, Stripe>(
    State(usecase): State<Arc<SubscriptionUseCase<S, U, Stripe>>>,
    auth: AuthUser,
) -> AppResult<impl IntoResponse>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    info!(external_id = %auth.external_id, "subscriptions: cancel request received");
    let response = usecase.cancel(&auth).await?;
    Ok(Json(response))
}

pub async fn premium_access<S, U, Stripe>(
    State(usecase): State<Arc<SubscriptionUseCase<S, U, Stripe>>>,
    auth: AuthUser,
) -> AppResult<impl IntoResponse>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    let access = usecase.premium_access(&auth).await?;
    Ok(Json(access))
}
