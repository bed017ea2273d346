use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    entities::subscriptions::SubscriptionEntity,
    value_objects::enums::{
        subscription_plans::SubscriptionPlan, subscription_statuses::SubscriptionStatus,
    },
};

/// Premium content is readable on an active subscription, during the `past_due`
/// grace period, or on a trial plan.
pub fn grants_premium_access(status: SubscriptionStatus, plan: Option<SubscriptionPlan>) -> bool {
    matches!(
        status,
        SubscriptionStatus::Active | SubscriptionStatus::PastDue
    ) || plan == Some(SubscriptionPlan::Trial)
}

pub fn subscription_grants_access(subscription: Option<&SubscriptionEntity>) -> bool {
    subscription
        .map(|sub| grants_premium_access(sub.status(), sub.plan()))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    pub price_id: Option<String>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutResponse {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePortalRequest {
    pub return_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortalSessionResponse {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatusDto {
    pub has_subscription: bool,
    /// Local status, or `"none"` when the user never subscribed.
    pub status: String,
    pub plan: Option<SubscriptionPlan>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub is_trial: bool,
    pub is_premium: bool,
}

impl SubscriptionStatusDto {
    pub fn none() -> Self {
        Self {
            has_subscription: false,
            status: "none".to_string(),
            plan: None,
            current_period_end: None,
            is_active: false,
            is_trial: false,
            is_premium: false,
        }
    }
}

impl From<&SubscriptionEntity> for SubscriptionStatusDto {
    fn from(value: &SubscriptionEntity) -> Self {
        let status = value.status();
        let plan = value.plan();
        Self {
            has_subscription: true,
            status: status.to_string(),
            plan,
            current_period_end: value.current_period_end,
            is_active: status == SubscriptionStatus::Active,
            is_trial: plan == Some(SubscriptionPlan::Trial),
            is_premium: grants_premium_access(status, plan),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSummaryDto {
    pub status: SubscriptionStatus,
    pub plan: Option<SubscriptionPlan>,
    pub current_period_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumAccessDto {
    pub has_access: bool,
    pub subscription: Option<SubscriptionSummaryDto>,
}

impl PremiumAccessDto {
    pub fn from_subscription(subscription: Option<&SubscriptionEntity>) -> Self {
        Self {
            has_access: subscription_grants_access(subscription),
            subscription: subscription.map(|sub| SubscriptionSummaryDto {
                status: sub.status(),
                plan: sub.plan(),
                current_period_end: sub.current_period_end,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancelSubscriptionResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
}
