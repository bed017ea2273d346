use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;

use crate::{
    domain::{
        entities::subscriptions::{
            InsertSubscriptionEntity, SubscriptionEntity, UpdateSubscriptionEntity,
        },
        repositories::subscriptions::SubscriptionRepository,
        value_objects::enums::subscription_statuses::SubscriptionStatus,
    },
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::subscriptions},
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn latest_id_for_user(conn: &mut PgConnection, user_id: i64) -> QueryResult<Option<i64>> {
    subscriptions::table
        .filter(subscriptions::user_id.eq(user_id))
        .order(subscriptions::id.desc())
        .select(subscriptions::id)
        .first::<i64>(conn)
        .optional()
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn find_latest_by_user_id(&self, user_id: i64) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = subscriptions::table
            .filter(subscriptions::user_id.eq(user_id))
            .order(subscriptions::id.desc())
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_by_external_subscription_id(
        &self,
        external_subscription_id: String,
    ) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = subscriptions::table
            .filter(subscriptions::external_subscription_id.eq(external_subscription_id))
            .order(subscriptions::id.desc())
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn upsert_for_user(
        &self,
        insert_subscription_entity: InsertSubscriptionEntity,
    ) -> Result<SubscriptionEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            match latest_id_for_user(conn, insert_subscription_entity.user_id)? {
                Some(subscription_id) => update(subscriptions::table.find(subscription_id))
                    .set(&UpdateSubscriptionEntity::from(&insert_subscription_entity))
                    .returning(SubscriptionEntity::as_select())
                    .get_result::<SubscriptionEntity>(conn),
                None => insert_into(subscriptions::table)
                    .values(&insert_subscription_entity)
                    .returning(SubscriptionEntity::as_select())
                    .get_result::<SubscriptionEntity>(conn),
            }
        })?;

        Ok(result)
    }

    async fn update_status_for_user(
        &self,
        user_id: i64,
        status: SubscriptionStatus,
    ) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let Some(subscription_id) = latest_id_for_user(conn, user_id)? else {
                return Ok(None);
            };

            update(subscriptions::table.find(subscription_id))
                .set(&UpdateSubscriptionEntity::status_only(status))
                .returning(SubscriptionEntity::as_select())
                .get_result::<SubscriptionEntity>(conn)
                .map(Some)
        })?;

        Ok(result)
    }
}
