use std::sync::Arc;

use anyhow::{Result as AnyResult, anyhow};
use async_trait::async_trait;
use quill::{
    domain::{
        entities::{
            subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
            users::UserEntity,
        },
        repositories::{subscriptions::SubscriptionRepository, users::UserRepository},
        value_objects::{
            enums::{
                subscription_plans::SubscriptionPlan, subscription_statuses::SubscriptionStatus,
            },
            subscriptions::{
                CancelSubscriptionResponse, CreateCheckoutRequest, CreateCheckoutResponse,
                CreatePortalRequest, PortalSessionResponse, PremiumAccessDto,
                SubscriptionStatusDto, WebhookAckResponse,
            },
        },
    },
    payments::stripe_client::{
        CheckoutSessionParams, StripeCheckoutSession, StripeClient, StripeEvent, StripeInvoice,
        StripeSubscription,
    },
};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{auth::AuthUser, axum_http::error_responses::AppError, usecases::identity::IdentityResolver};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StripeGateway: Send + Sync {
    async fn create_customer(
        &self,
        email: String,
        name: Option<String>,
        user_id: i64,
    ) -> AnyResult<String>;

    async fn create_checkout_session(
        &self,
        params: CheckoutSessionParams,
    ) -> AnyResult<StripeCheckoutSession>;

    async fn create_billing_portal_session(
        &self,
        customer_id: String,
        return_url: String,
    ) -> AnyResult<String>;

    async fn cancel_subscription(&self, subscription_id: String) -> AnyResult<()>;

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> AnyResult<StripeEvent>;

    async fn retrieve_subscription(&self, subscription_id: String)
    -> AnyResult<StripeSubscription>;
}

#[async_trait]
impl StripeGateway for StripeClient {
    async fn create_customer(
        &self,
        email: String,
        name: Option<String>,
        user_id: i64,
    ) -> AnyResult<String> {
        self.create_customer(&email, name.as_deref(), user_id).await
    }

    async fn create_checkout_session(
        &self,
        params: CheckoutSessionParams,
    ) -> AnyResult<StripeCheckoutSession> {
        self.create_checkout_session(&params).await
    }

    async fn create_billing_portal_session(
        &self,
        customer_id: String,
        return_url: String,
    ) -> AnyResult<String> {
        self.create_billing_portal_session(&customer_id, &return_url)
            .await
    }

    async fn cancel_subscription(&self, subscription_id: String) -> AnyResult<()> {
        self.cancel_subscription(&subscription_id).await.map(|_| ())
    }

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> AnyResult<StripeEvent> {
        self.verify_webhook_signature(payload, signature)
    }

    async fn retrieve_subscription(
        &self,
        subscription_id: String,
    ) -> AnyResult<StripeSubscription> {
        self.retrieve_subscription(&subscription_id).await
    }
}

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("billing is not configured")]
    NotConfigured,
    #[error("{0}")]
    InvalidRequest(String),
    #[error("user already has an active subscription")]
    AlreadyActive,
    #[error("no subscription found")]
    SubscriptionNotFound,
    #[error("invalid webhook: {0}")]
    InvalidWebhook(String),
    #[error("user profile could not be resolved")]
    Unauthenticated,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SubscriptionError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            SubscriptionError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            SubscriptionError::InvalidRequest(_)
            | SubscriptionError::AlreadyActive
            | SubscriptionError::InvalidWebhook(_) => StatusCode::BAD_REQUEST,
            SubscriptionError::SubscriptionNotFound => StatusCode::NOT_FOUND,
            SubscriptionError::Unauthenticated => StatusCode::UNAUTHORIZED,
            SubscriptionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SubscriptionError> for AppError {
    fn from(err: SubscriptionError) -> Self {
        match err {
            SubscriptionError::NotConfigured => {
                AppError::ServiceUnavailable("Billing is not configured".to_string())
            }
            SubscriptionError::InvalidRequest(message) => AppError::Validation(message),
            SubscriptionError::AlreadyActive => {
                AppError::Conflict("User already has an active subscription".to_string())
            }
            SubscriptionError::SubscriptionNotFound => {
                AppError::NotFound("No subscription found".to_string())
            }
            SubscriptionError::InvalidWebhook(message) => AppError::Validation(message),
            SubscriptionError::Unauthenticated => {
                AppError::Unauthorized("User profile could not be resolved".to_string())
            }
            SubscriptionError::Internal(err) => AppError::Internal(err),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, SubscriptionError>;

/// Checkout, portal and cancel hand-offs plus webhook-driven reconciliation of the
/// local subscription row. `stripe_client` is `None` when billing is not configured.
pub struct SubscriptionUseCase<S, U, Stripe>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    user_repo: Arc<U>,
    identity: Arc<IdentityResolver<U>>,
    stripe_client: Option<Arc<Stripe>>,
}

impl<S, U, Stripe> SubscriptionUseCase<S, U, Stripe>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    pub fn new(
        subscription_repo: Arc<S>,
        user_repo: Arc<U>,
        stripe_client: Option<Arc<Stripe>>,
    ) -> Self {
        Self {
            subscription_repo,
            identity: Arc::new(IdentityResolver::new(Arc::clone(&user_repo))),
            user_repo,
            stripe_client,
        }
    }

    pub async fn create_checkout_session(
        &self,
        auth: &AuthUser,
        request: CreateCheckoutRequest,
    ) -> UseCaseResult<CreateCheckoutResponse> {
        let stripe = self.stripe()?;

        let price_id = required_field(request.price_id, "priceId")?;
        let success_url = required_url(request.success_url, "successUrl")?;
        let cancel_url = required_url(request.cancel_url, "cancelUrl")?;

        let user = self.resolve_user(auth).await?;
        info!(user_id = user.id, %price_id, "subscriptions: checkout requested");

        let current = self.latest_subscription(user.id).await?;
        if current
            .as_ref()
            .is_some_and(|sub| sub.status() == SubscriptionStatus::Active)
        {
            let err = SubscriptionError::AlreadyActive;
            warn!(
                user_id = user.id,
                status = err.status_code().as_u16(),
                "subscriptions: checkout refused, subscription already active"
            );
            return Err(err);
        }

        let customer_id = match current.and_then(|sub| sub.external_customer_id) {
            Some(customer_id) => customer_id,
            None => stripe
                .create_customer(user.email.clone(), user.name.clone(), user.id)
                .await
                .map_err(|err| {
                    error!(user_id = user.id, error = ?err, "subscriptions: failed to create stripe customer");
                    SubscriptionError::Internal(err)
                })?,
        };

        let session = stripe
            .create_checkout_session(CheckoutSessionParams {
                customer_id: customer_id.clone(),
                price_id: price_id.clone(),
                success_url,
                cancel_url,
                user_id: user.id,
            })
            .await
            .map_err(|err| {
                error!(
                    user_id = user.id,
                    %price_id,
                    %customer_id,
                    error = ?err,
                    "subscriptions: stripe checkout session creation failed"
                );
                SubscriptionError::Internal(err)
            })?;

        let url = session
            .url
            .ok_or_else(|| anyhow!("checkout session {} has no url", session.id))?;

        info!(
            user_id = user.id,
            session_id = %session.id,
            "subscriptions: checkout session created"
        );

        Ok(CreateCheckoutResponse {
            session_id: session.id,
            url,
        })
    }

    pub async fn create_portal_session(
        &self,
        auth: &AuthUser,
        request: CreatePortalRequest,
    ) -> UseCaseResult<PortalSessionResponse> {
        let stripe = self.stripe()?;
        let return_url = required_url(request.return_url, "returnUrl")?;

        let user = self.resolve_user(auth).await?;
        let customer_id = self
            .latest_subscription(user.id)
            .await?
            .and_then(|sub| sub.external_customer_id)
            .ok_or(SubscriptionError::SubscriptionNotFound)?;

        let url = stripe
            .create_billing_portal_session(customer_id.clone(), return_url)
            .await
            .map_err(|err| {
                error!(user_id = user.id, %customer_id, error = ?err, "subscriptions: portal session creation failed");
                SubscriptionError::Internal(err)
            })?;

        info!(user_id = user.id, "subscriptions: portal session created");
        Ok(PortalSessionResponse { url })
    }

    pub async fn status(&self, auth: &AuthUser) -> UseCaseResult<SubscriptionStatusDto> {
        let user = self.resolve_user(auth).await?;
        let status = self
            .latest_subscription(user.id)
            .await?
            .as_ref()
            .map(SubscriptionStatusDto::from)
            .unwrap_or_else(SubscriptionStatusDto::none);
        Ok(status)
    }

    pub async fn premium_access(&self, auth: &AuthUser) -> UseCaseResult<PremiumAccessDto> {
        let user = self.resolve_user(auth).await?;
        let subscription = self.latest_subscription(user.id).await?;
        Ok(PremiumAccessDto::from_subscription(subscription.as_ref()))
    }

    /// Cancels at the provider first; the local row only changes once that succeeded.
    pub async fn cancel(&self, auth: &AuthUser) -> UseCaseResult<CancelSubscriptionResponse> {
        let stripe = self.stripe()?;
        let user = self.resolve_user(auth).await?;

        let external_subscription_id = self
            .latest_subscription(user.id)
            .await?
            .and_then(|sub| sub.external_subscription_id)
            .ok_or(SubscriptionError::SubscriptionNotFound)?;

        stripe
            .cancel_subscription(external_subscription_id.clone())
            .await
            .map_err(|err| {
                error!(
                    user_id = user.id,
                    %external_subscription_id,
                    error = ?err,
                    "subscriptions: failed to cancel provider subscription"
                );
                SubscriptionError::Internal(err)
            })?;

        self.set_status(user.id, SubscriptionStatus::Canceled)
            .await?;

        info!(
            user_id = user.id,
            %external_subscription_id,
            "subscriptions: subscription canceled"
        );

        Ok(CancelSubscriptionResponse {
            message: "Subscription canceled".to_string(),
        })
    }

    /// Every handler re-derives the full target state, so redelivered events converge.
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> UseCaseResult<WebhookAckResponse> {
        let stripe = self.stripe()?;

        let signature = signature
            .ok_or_else(|| SubscriptionError::InvalidWebhook("missing stripe-signature header".into()))?;

        let event = stripe
            .verify_webhook_signature(payload, signature)
            .map_err(|err| {
                warn!(
                    error = %err,
                    status = SubscriptionError::InvalidWebhook(String::new()).status_code().as_u16(),
                    "subscriptions: stripe webhook verification failed"
                );
                SubscriptionError::InvalidWebhook("signature verification failed".into())
            })?;

        info!(
            event_type = %event.type_,
            event_id = ?event.id,
            "subscriptions: stripe webhook verified"
        );

        match event.type_.as_str() {
            "customer.subscription.created" | "customer.subscription.updated" => {
                self.handle_subscription_upsert(&event).await?;
            }
            "customer.subscription.deleted" => {
                self.handle_subscription_deleted(&event).await?;
            }
            "invoice.payment_succeeded" => {
                self.handle_invoice_status_change(&event, SubscriptionStatus::Active)
                    .await?;
            }
            "invoice.payment_failed" => {
                self.handle_invoice_status_change(&event, SubscriptionStatus::PastDue)
                    .await?;
            }
            other => {
                debug!(event_type = %other, "subscriptions: ignoring unhandled stripe event");
            }
        }

        Ok(WebhookAckResponse { received: true })
    }

    async fn handle_subscription_upsert(&self, event: &StripeEvent) -> UseCaseResult<()> {
        let subscription = parse_object::<StripeSubscription>(event)?;

        let Some(user_id) = subscription.user_id() else {
            error!(
                event_type = %event.type_,
                subscription_id = %subscription.id,
                "subscriptions: webhook subscription has no numeric userId metadata, dropping"
            );
            return Ok(());
        };

        if !self.user_exists(user_id).await? {
            error!(
                user_id,
                subscription_id = %subscription.id,
                "subscriptions: webhook references unknown user, dropping"
            );
            return Ok(());
        }

        let status = SubscriptionStatus::from_provider_status(&subscription.status);
        let plan = SubscriptionPlan::from_provider(&subscription.status, subscription.interval());

        let saved = self
            .subscription_repo
            .upsert_for_user(InsertSubscriptionEntity {
                user_id,
                external_customer_id: subscription.customer.clone(),
                external_subscription_id: Some(subscription.id.clone()),
                status: status.to_string(),
                plan: Some(plan.to_string()),
                current_period_end: subscription.period_end(),
            })
            .await
            .map_err(|err| {
                error!(
                    user_id,
                    subscription_id = %subscription.id,
                    db_error = ?err,
                    "subscriptions: failed to upsert subscription"
                );
                SubscriptionError::Internal(err)
            })?;

        info!(
            user_id,
            subscription_row_id = saved.id,
            status = %status,
            plan = %plan,
            provider_status = %subscription.status,
            "subscriptions: subscription reconciled"
        );
        Ok(())
    }

    async fn handle_subscription_deleted(&self, event: &StripeEvent) -> UseCaseResult<()> {
        let subscription = parse_object::<StripeSubscription>(event)?;

        let Some(user_id) = self.owner_of(&subscription).await? else {
            warn!(
                subscription_id = %subscription.id,
                "subscriptions: deleted subscription has no known owner"
            );
            return Ok(());
        };

        self.set_status(user_id, SubscriptionStatus::Canceled).await
    }

    async fn handle_invoice_status_change(
        &self,
        event: &StripeEvent,
        status: SubscriptionStatus,
    ) -> UseCaseResult<()> {
        let invoice = parse_object::<StripeInvoice>(event)?;

        let Some(subscription_id) = invoice.subscription_id() else {
            debug!(
                invoice_id = ?invoice.id,
                "subscriptions: invoice without subscription, ignoring"
            );
            return Ok(());
        };

        let stripe = self.stripe()?;
        let subscription = stripe
            .retrieve_subscription(subscription_id.clone())
            .await
            .map_err(|err| {
                error!(
                    %subscription_id,
                    error = ?err,
                    "subscriptions: failed to retrieve subscription for invoice"
                );
                SubscriptionError::Internal(err)
            })?;

        let Some(user_id) = self.owner_of(&subscription).await? else {
            warn!(
                %subscription_id,
                invoice_id = ?invoice.id,
                "subscriptions: invoice subscription has no known owner"
            );
            return Ok(());
        };

        self.set_status(user_id, status).await
    }

    /// Owner from provider metadata, else the local row already linked to the subscription.
    async fn owner_of(&self, subscription: &StripeSubscription) -> UseCaseResult<Option<i64>> {
        if let Some(user_id) = subscription.user_id() {
            return Ok(Some(user_id));
        }

        let local = self
            .subscription_repo
            .find_by_external_subscription_id(subscription.id.clone())
            .await
            .map_err(|err| {
                error!(
                    subscription_id = %subscription.id,
                    db_error = ?err,
                    "subscriptions: failed to look up subscription by external id"
                );
                SubscriptionError::Internal(err)
            })?;

        Ok(local.map(|sub| sub.user_id))
    }

    async fn set_status(&self, user_id: i64, status: SubscriptionStatus) -> UseCaseResult<()> {
        let updated = self
            .subscription_repo
            .update_status_for_user(user_id, status)
            .await
            .map_err(|err| {
                error!(
                    user_id,
                    status = %status,
                    db_error = ?err,
                    "subscriptions: failed to update subscription status"
                );
                SubscriptionError::Internal(err)
            })?;

        match updated {
            Some(row) => info!(user_id, subscription_row_id = row.id, status = %status, "subscriptions: status updated"),
            None => warn!(user_id, status = %status, "subscriptions: no subscription row to update"),
        }
        Ok(())
    }

    async fn user_exists(&self, user_id: i64) -> UseCaseResult<bool> {
        let user = self.user_repo.find_by_id(user_id).await.map_err(|err| {
            error!(user_id, db_error = ?err, "subscriptions: failed to load user");
            SubscriptionError::Internal(err)
        })?;
        Ok(user.is_some())
    }

    async fn resolve_user(&self, auth: &AuthUser) -> UseCaseResult<UserEntity> {
        self.identity
            .resolve(auth)
            .await
            .map_err(|err| {
                error!(
                    external_id = %auth.external_id,
                    db_error = ?err,
                    "subscriptions: failed to resolve caller"
                );
                SubscriptionError::Internal(err)
            })?
            .ok_or(SubscriptionError::Unauthenticated)
    }

    async fn latest_subscription(&self, user_id: i64) -> UseCaseResult<Option<SubscriptionEntity>> {
        self.subscription_repo
            .find_latest_by_user_id(user_id)
            .await
            .map_err(|err| {
                error!(user_id, db_error = ?err, "subscriptions: failed to load subscription");
                SubscriptionError::Internal(err)
            })
    }

    fn stripe(&self) -> UseCaseResult<&Arc<Stripe>> {
        self.stripe_client
            .as_ref()
            .ok_or(SubscriptionError::NotConfigured)
    }
}

fn parse_object<T>(event: &StripeEvent) -> UseCaseResult<T>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_value(event.data.object.clone()).map_err(|err| {
        warn!(event_type = %event.type_, error = %err, "subscriptions: malformed webhook object");
        SubscriptionError::InvalidWebhook(format!("malformed {} payload", event.type_))
    })
}

fn required_field(value: Option<String>, name: &str) -> UseCaseResult<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| SubscriptionError::InvalidRequest(format!("{name} is required")))
}

fn required_url(value: Option<String>, name: &str) -> UseCaseResult<String> {
    let value = required_field(value, name)?;
    match Url::parse(&value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(value),
        _ => Err(SubscriptionError::InvalidRequest(format!(
            "{name} must be an absolute http(s) URL"
        ))),
    }
}

#[cfg(test)]
mod tests;
