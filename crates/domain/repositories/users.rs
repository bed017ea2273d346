use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::users::{InsertUserEntity, UserEntity};

#[async_trait]
#[automock]
pub trait UserRepository {
    async fn find_by_external_auth_id(&self, external_auth_id: String)
    -> Result<Option<UserEntity>>;
    async fn find_by_id(&self, user_id: i64) -> Result<Option<UserEntity>>;
    /// Inserts the user, or returns the existing row when another request created it first.
    async fn create(&self, insert_user_entity: InsertUserEntity) -> Result<UserEntity>;
}
