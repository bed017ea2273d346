use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::{
    domain::value_objects::enums::{
        subscription_plans::SubscriptionPlan, subscription_statuses::SubscriptionStatus,
    },
    infra::db::postgres::schema::subscriptions,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscriptions)]
pub struct SubscriptionEntity {
    pub id: i64,
    pub user_id: i64,
    pub external_customer_id: Option<String>,
    pub external_subscription_id: Option<String>,
    pub status: String,
    pub plan: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionEntity {
    pub fn status(&self) -> SubscriptionStatus {
        SubscriptionStatus::from_str(&self.status)
    }

    pub fn plan(&self) -> Option<SubscriptionPlan> {
        self.plan.as_deref().and_then(SubscriptionPlan::from_str)
    }
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct InsertSubscriptionEntity {
    pub user_id: i64,
    pub external_customer_id: Option<String>,
    pub external_subscription_id: Option<String>,
    pub status: String,
    pub plan: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
}

/// Columns billing reconciliation may overwrite on an existing row.
#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = subscriptions)]
pub struct UpdateSubscriptionEntity {
    pub external_customer_id: Option<Option<String>>,
    pub external_subscription_id: Option<Option<String>>,
    pub status: Option<String>,
    pub plan: Option<Option<String>>,
    pub current_period_end: Option<Option<DateTime<Utc>>>,
    pub updated_at: DateTime<Utc>,
}

impl UpdateSubscriptionEntity {
    pub fn status_only(status: SubscriptionStatus) -> Self {
        Self {
            external_customer_id: None,
            external_subscription_id: None,
            status: Some(status.to_string()),
            plan: None,
            current_period_end: None,
            updated_at: Utc::now(),
        }
    }
}

impl From<&InsertSubscriptionEntity> for UpdateSubscriptionEntity {
    fn from(value: &InsertSubscriptionEntity) -> Self {
        Self {
            external_customer_id: Some(value.external_customer_id.clone()),
            external_subscription_id: Some(value.external_subscription_id.clone()),
            status: Some(value.status.clone()),
            plan: Some(value.plan.clone()),
            current_period_end: Some(value.current_period_end),
            updated_at: Utc::now(),
        }
    }
}
