use anyhow::Result;
use async_trait::async_trait;
use diesel::{
    RunQueryDsl, delete, insert_into,
    pg::Pg,
    prelude::*,
    query_builder::{BoxedSqlQuery, SqlQuery},
    sql_types::{BigInt, Bool, Text},
    update,
};
use std::sync::Arc;

use crate::{
    domain::{
        entities::posts::{InsertPostEntity, PostEntity, UpdatePostEntity},
        repositories::posts::PostRepository,
        value_objects::{pagination::Pagination, posts::PostFilters},
    },
    infra::db::postgres::{
        post_filters::{FilterParam, build_post_where},
        postgres_connection::PgPoolSquad,
        schema::posts,
    },
};

#[derive(QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

pub struct PostPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PostPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn bind_filter_params(
    mut query: BoxedSqlQuery<'static, Pg, SqlQuery>,
    params: &[FilterParam],
) -> BoxedSqlQuery<'static, Pg, SqlQuery> {
    for param in params.iter().cloned() {
        query = match param {
            FilterParam::Text(value) => query.bind::<Text, _>(value),
            FilterParam::BigInt(value) => query.bind::<BigInt, _>(value),
            FilterParam::Bool(value) => query.bind::<Bool, _>(value),
        };
    }
    query
}

#[async_trait]
impl PostRepository for PostPostgres {
    async fn find_by_id(&self, post_id: i64) -> Result<Option<PostEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = posts::table
            .find(post_id)
            .select(PostEntity::as_select())
            .first::<PostEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn list_with_filters(
        &self,
        filters: PostFilters,
        pagination: Pagination,
    ) -> Result<(Vec<PostEntity>, i64)> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let clause = build_post_where(&filters, 1);

        let count_sql = format!("SELECT COUNT(*) AS count FROM posts {}", clause.where_sql);
        let total = bind_filter_params(diesel::sql_query(count_sql).into_boxed(), &clause.params)
            .get_result::<CountRow>(&mut conn)?
            .count;

        let page_sql = format!(
            "SELECT posts.* FROM posts {} ORDER BY posts.created_at DESC, posts.id DESC LIMIT ${} OFFSET ${}",
            clause.where_sql,
            clause.next_index,
            clause.next_index + 1
        );
        let results = bind_filter_params(diesel::sql_query(page_sql).into_boxed(), &clause.params)
            .bind::<BigInt, _>(pagination.limit)
            .bind::<BigInt, _>(pagination.offset())
            .load::<PostEntity>(&mut conn)?;

        Ok((results, total))
    }

    async fn create(&self, insert_post_entity: InsertPostEntity) -> Result<PostEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(posts::table)
            .values(&insert_post_entity)
            .returning(PostEntity::as_select())
            .get_result::<PostEntity>(&mut conn)?;

        Ok(result)
    }

    async fn update(
        &self,
        post_id: i64,
        update_post_entity: UpdatePostEntity,
    ) -> Result<Option<PostEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = update(posts::table.find(post_id))
            .set(&update_post_entity)
            .returning(PostEntity::as_select())
            .get_result::<PostEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn delete(&self, post_id: i64) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affected = delete(posts::table.find(post_id)).execute(&mut conn)?;

        Ok(affected > 0)
    }
}
