use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, delete, insert_into, prelude::*};
use std::sync::Arc;

use crate::{
    domain::{
        entities::comments::{CommentEntity, CommentWithAuthorEntity, InsertCommentEntity},
        repositories::comments::CommentRepository,
        value_objects::pagination::Pagination,
    },
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{comments, users},
    },
};

pub struct CommentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CommentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl CommentRepository for CommentPostgres {
    async fn list_by_post(
        &self,
        post_id: i64,
        pagination: Pagination,
    ) -> Result<(Vec<CommentWithAuthorEntity>, i64)> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let total = comments::table
            .filter(comments::post_id.eq(post_id))
            .count()
            .get_result::<i64>(&mut conn)?;

        let rows = comments::table
            .inner_join(users::table)
            .filter(comments::post_id.eq(post_id))
            .order((comments::created_at.desc(), comments::id.desc()))
            .limit(pagination.limit)
            .offset(pagination.offset())
            .select((CommentEntity::as_select(), users::name, users::avatar_url))
            .load::<(CommentEntity, Option<String>, Option<String>)>(&mut conn)?;

        let results = rows
            .into_iter()
            .map(|(comment, author_name, author_avatar_url)| CommentWithAuthorEntity {
                comment,
                author_name,
                author_avatar_url,
            })
            .collect();

        Ok((results, total))
    }

    async fn find_by_id(&self, comment_id: i64) -> Result<Option<CommentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = comments::table
            .find(comment_id)
            .select(CommentEntity::as_select())
            .first::<CommentEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn create(
        &self,
        insert_comment_entity: InsertCommentEntity,
    ) -> Result<CommentWithAuthorEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let comment = insert_into(comments::table)
            .values(&insert_comment_entity)
            .returning(CommentEntity::as_select())
            .get_result::<CommentEntity>(&mut conn)?;

        let (author_name, author_avatar_url) = users::table
            .find(comment.user_id)
            .select((users::name, users::avatar_url))
            .first::<(Option<String>, Option<String>)>(&mut conn)
            .optional()?
            .unwrap_or((None, None));

        Ok(CommentWithAuthorEntity {
            comment,
            author_name,
            author_avatar_url,
        })
    }

    async fn delete(&self, comment_id: i64) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affected = delete(comments::table.find(comment_id)).execute(&mut conn)?;

        Ok(affected > 0)
    }

    async fn count_by_post(&self, post_id: i64) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let total = comments::table
            .filter(comments::post_id.eq(post_id))
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok(total)
    }
}
