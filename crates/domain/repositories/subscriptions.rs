use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::{
    entities::subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
    value_objects::enums::subscription_statuses::SubscriptionStatus,
};

#[async_trait]
#[automock]
pub trait SubscriptionRepository {
    /// The authoritative subscription of a user: the row with the highest id.
    async fn find_latest_by_user_id(&self, user_id: i64) -> Result<Option<SubscriptionEntity>>;

    async fn find_by_external_subscription_id(
        &self,
        external_subscription_id: String,
    ) -> Result<Option<SubscriptionEntity>>;

    /// Updates the user's latest row in place, or inserts the first one. Atomic, so
    /// replaying the same provider event never produces a second row.
    async fn upsert_for_user(
        &self,
        insert_subscription_entity: InsertSubscriptionEntity,
    ) -> Result<SubscriptionEntity>;

    /// Sets the status on the user's latest row only. `None` when the user has no row.
    async fn update_status_for_user(
        &self,
        user_id: i64,
        status: SubscriptionStatus,
    ) -> Result<Option<SubscriptionEntity>>;
}
