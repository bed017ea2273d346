use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::{
    entities::posts::{InsertPostEntity, PostEntity, UpdatePostEntity},
    value_objects::{pagination::Pagination, posts::PostFilters},
};

#[async_trait]
#[automock]
pub trait PostRepository {
    async fn find_by_id(&self, post_id: i64) -> Result<Option<PostEntity>>;
    /// Returns one page ordered newest first together with the unpaged match count.
    async fn list_with_filters(
        &self,
        filters: PostFilters,
        pagination: Pagination,
    ) -> Result<(Vec<PostEntity>, i64)>;
    async fn create(&self, insert_post_entity: InsertPostEntity) -> Result<PostEntity>;
    async fn update(
        &self,
        post_id: i64,
        update_post_entity: UpdatePostEntity,
    ) -> Result<Option<PostEntity>>;
    /// Hard delete. Returns false when no row matched.
    async fn delete(&self, post_id: i64) -> Result<bool>;
}
