use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::{
    entities::comments::{CommentEntity, CommentWithAuthorEntity, InsertCommentEntity},
    value_objects::pagination::Pagination,
};

#[async_trait]
#[automock]
pub trait CommentRepository {
    /// Newest first, with the total number of comments on the post.
    async fn list_by_post(
        &self,
        post_id: i64,
        pagination: Pagination,
    ) -> Result<(Vec<CommentWithAuthorEntity>, i64)>;
    async fn find_by_id(&self, comment_id: i64) -> Result<Option<CommentEntity>>;
    async fn create(
        &self,
        insert_comment_entity: InsertCommentEntity,
    ) -> Result<CommentWithAuthorEntity>;
    async fn delete(&self, comment_id: i64) -> Result<bool>;
    async fn count_by_post(&self, post_id: i64) -> Result<i64>;
}
