use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::infra::db::postgres::schema::interactions;

#[derive(Debug, Clone, PartialEq, Selectable, Queryable)]
#[diesel(table_name = interactions)]
pub struct InteractionEntity {
    pub user_id: i64,
    pub post_id: i64,
    pub type_: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = interactions)]
pub struct InsertInteractionEntity {
    pub user_id: i64,
    pub post_id: i64,
    pub type_: String,
}
