use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::infra::db::postgres::schema::comments;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = comments)]
pub struct CommentEntity {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = comments)]
pub struct InsertCommentEntity {
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
}

/// A comment joined with the public profile of its author.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentWithAuthorEntity {
    pub comment: CommentEntity,
    pub author_name: Option<String>,
    pub author_avatar_url: Option<String>,
}
