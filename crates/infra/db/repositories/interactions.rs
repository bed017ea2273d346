use anyhow::Result;
use async_trait::async_trait;
use diesel::{
    RunQueryDsl, delete, dsl::count_star, dsl::exists, insert_into, prelude::*, select,
};
use std::sync::Arc;

use crate::{
    domain::{
        entities::interactions::InsertInteractionEntity,
        repositories::interactions::InteractionRepository,
        value_objects::{
            enums::interaction_types::InteractionType,
            interactions::{InteractionStats, ToggleAction},
        },
    },
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::interactions},
};

pub struct InteractionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl InteractionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn load_user_kinds(
    conn: &mut PgConnection,
    user_id: i64,
    post_id: i64,
) -> QueryResult<Vec<InteractionType>> {
    let kinds = interactions::table
        .filter(interactions::user_id.eq(user_id))
        .filter(interactions::post_id.eq(post_id))
        .select(interactions::type_)
        .load::<String>(conn)?;

    Ok(kinds
        .iter()
        .filter_map(|kind| InteractionType::from_str(kind))
        .collect())
}

fn remove_kind(
    conn: &mut PgConnection,
    user_id: i64,
    post_id: i64,
    kind: InteractionType,
) -> QueryResult<usize> {
    delete(
        interactions::table
            .filter(interactions::user_id.eq(user_id))
            .filter(interactions::post_id.eq(post_id))
            .filter(interactions::type_.eq(kind.as_str())),
    )
    .execute(conn)
}

#[async_trait]
impl InteractionRepository for InteractionPostgres {
    async fn toggle(
        &self,
        user_id: i64,
        post_id: i64,
        kind: InteractionType,
    ) -> Result<Vec<InteractionType>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let kinds = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let present = select(exists(
                interactions::table
                    .filter(interactions::user_id.eq(user_id))
                    .filter(interactions::post_id.eq(post_id))
                    .filter(interactions::type_.eq(kind.as_str())),
            ))
            .get_result::<bool>(conn)?;

            match ToggleAction::plan(kind, present) {
                ToggleAction::Remove(kind) => {
                    remove_kind(conn, user_id, post_id, kind)?;
                }
                ToggleAction::Insert { kind, clear } => {
                    insert_into(interactions::table)
                        .values(&InsertInteractionEntity {
                            user_id,
                            post_id,
                            type_: kind.to_string(),
                        })
                        .on_conflict_do_nothing()
                        .execute(conn)?;

                    if let Some(opposite) = clear {
                        remove_kind(conn, user_id, post_id, opposite)?;
                    }
                }
            }

            load_user_kinds(conn, user_id, post_id)
        })?;

        Ok(kinds)
    }

    async fn stats(&self, post_id: i64) -> Result<InteractionStats> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = interactions::table
            .filter(interactions::post_id.eq(post_id))
            .group_by(interactions::type_)
            .select((interactions::type_, count_star()))
            .load::<(String, i64)>(&mut conn)?;

        let mut stats = InteractionStats::default();
        for (kind, count) in rows {
            match InteractionType::from_str(&kind) {
                Some(InteractionType::Like) => stats.like_count = count,
                Some(InteractionType::Dislike) => stats.dislike_count = count,
                Some(InteractionType::Favorite) => stats.favorite_count = count,
                None => {}
            }
        }

        Ok(stats)
    }

    async fn user_interactions(
        &self,
        user_id: i64,
        post_id: i64,
    ) -> Result<Vec<InteractionType>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let kinds = load_user_kinds(&mut conn, user_id, post_id)?;

        Ok(kinds)
    }
}
