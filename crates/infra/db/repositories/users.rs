use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, insert_into, prelude::*};
use std::sync::Arc;

use crate::{
    domain::{
        entities::users::{InsertUserEntity, UserEntity},
        repositories::users::UserRepository,
    },
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::users},
};

pub struct UserPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl UserPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl UserRepository for UserPostgres {
    async fn find_by_external_auth_id(
        &self,
        external_auth_id: String,
    ) -> Result<Option<UserEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = users::table
            .filter(users::external_auth_id.eq(external_auth_id))
            .select(UserEntity::as_select())
            .first::<UserEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_by_id(&self, user_id: i64) -> Result<Option<UserEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = users::table
            .find(user_id)
            .select(UserEntity::as_select())
            .first::<UserEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn create(&self, insert_user_entity: InsertUserEntity) -> Result<UserEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let inserted = insert_into(users::table)
            .values(&insert_user_entity)
            .on_conflict(users::external_auth_id)
            .do_nothing()
            .returning(UserEntity::as_select())
            .get_result::<UserEntity>(&mut conn)
            .optional()?;

        if let Some(user) = inserted {
            return Ok(user);
        }

        // Lost the race against a concurrent first request for the same identity.
        let existing = users::table
            .filter(users::external_auth_id.eq(&insert_user_entity.external_auth_id))
            .select(UserEntity::as_select())
            .first::<UserEntity>(&mut conn)?;

        Ok(existing)
    }
}
