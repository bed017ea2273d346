use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::post_statuses::PostStatus,
    infra::db::postgres::schema::posts,
};

/// A post row. Also loadable by name so the filtered listing can run through `sql_query`.
#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable, QueryableByName)]
#[diesel(table_name = posts)]
pub struct PostEntity {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub preview: Option<String>,
    pub image_id: Option<Uuid>,
    pub status: String,
    pub is_premium: bool,
    pub labels: Vec<String>,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostEntity {
    pub fn status(&self) -> PostStatus {
        PostStatus::from_str(&self.status).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = posts)]
pub struct InsertPostEntity {
    pub title: String,
    pub content: String,
    pub preview: Option<String>,
    pub image_id: Option<Uuid>,
    pub status: String,
    pub is_premium: bool,
    pub labels: Vec<String>,
    pub author_id: i64,
}

/// Columns an editor may change. `None` leaves the column untouched;
/// `Some(None)` on a nullable column clears it.
#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = posts)]
pub struct UpdatePostEntity {
    pub title: Option<String>,
    pub content: Option<String>,
    pub preview: Option<Option<String>>,
    pub image_id: Option<Option<Uuid>>,
    pub status: Option<String>,
    pub is_premium: Option<bool>,
    pub labels: Option<Vec<String>>,
    pub author_id: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl UpdatePostEntity {
    pub fn archive() -> Self {
        Self {
            title: None,
            content: None,
            preview: None,
            image_id: None,
            status: Some(PostStatus::Archived.to_string()),
            is_premium: None,
            labels: None,
            author_id: None,
            updated_at: Utc::now(),
        }
    }
}
