use crate::{
    auth::{AuthUser, OptionalAuthUser},
    axum_http::{error_responses::AppResult, routers::extractors::path_id},
    usecases::{identity::IdentityResolver, interactions::InteractionsUseCase},
};
use axum::{
    Json, Router,
    extract::{Path, State, rejection::PathRejection},
    response::IntoResponse,
    routing::{get, post},
};
use quill::{
    domain::{
        repositories::{
            comments::CommentRepository, interactions::InteractionRepository,
            posts::PostRepository, users::UserRepository,
        },
        value_objects::{
            enums::interaction_types::InteractionType, interactions::InteractionSummaryDto,
        },
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            comments::CommentPostgres, interactions::InteractionPostgres, posts::PostPostgres,
            users::UserPostgres,
        },
    },
};
use std::sync::Arc;

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let post_repository = PostPostgres::new(Arc::clone(&db_pool));
    let interaction_repository = InteractionPostgres::new(Arc::clone(&db_pool));
    let comment_repository = CommentPostgres::new(Arc::clone(&db_pool));
    let user_repository = UserPostgres::new(Arc::clone(&db_pool));

    let usecase = InteractionsUseCase::new(
        Arc::new(post_repository),
        Arc::new(interaction_repository),
        Arc::new(comment_repository),
        Arc::new(IdentityResolver::new(Arc::new(user_repository))),
    );

    Router::new()
        .route("/api/posts/:id/like", post(toggle_like))
        .route("/api/posts/:id/dislike", post(toggle_dislike))
        .route("/api/posts/:id/favorite", post(toggle_favorite))
        .route("/api/posts/:id/interactions", get(interaction_summary))
        .with_state(Arc::new(usecase))
}

pub async fn toggle_like<P, I, C, U>(
    State(usecase): State<Arc<InteractionsUseCase<P, I, C, U>>>,
    auth: AuthUser,
    post_id: Result<Path<i64>, PathRejection>,
) -> AppResult<impl IntoResponse>
where
    P: PostRepository + Send + Sync + 'static,
    I: InteractionRepository + Send + Sync + 'static,
    C: CommentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    toggle(usecase, auth, post_id, InteractionType::Like).await
}

pub async fn toggle_dislike<P, I, C, U>(
    State(usecase): State<Arc<InteractionsUseCase<P, I, C, U>>>,
    auth: AuthUser,
    post_id: Result<Path<i64>, PathRejection>,
) -> AppResult<impl IntoResponse>
where
    P: PostRepository + Send + Sync + 'static,
    I: InteractionRepository + Send + Sync + 'static,
    C: CommentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    toggle(usecase, auth, post_id, InteractionType::Dislike).await
}

pub async fn toggle_favorite<P, I, C, U>(
    State(usecase): State<Arc<InteractionsUseCase<P, I, C, U>>>,
    auth: AuthUser,
    post_id: Result<Path<i64>, PathRejection>,
) -> AppResult<impl IntoResponse>
where
    P: PostRepository + Send + Sync + 'static,
    I: InteractionRepository + Send + Sync + 'static,
    C: CommentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    toggle(usecase, auth, post_id, InteractionType::Favorite).await
}

pub async fn interaction_summary<P, I, C, U>(
    State(usecase): State<Arc<InteractionsUseCase<P, I, C, U>>>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    post_id: Result<Path<i64>, PathRejection>,
) -> AppResult<impl IntoResponse>
where
    P: PostRepository + Send + Sync + 'static,
    I: InteractionRepository + Send + Sync + 'static,
    C: CommentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    let post_id = path_id(post_id)?;
    let summary = usecase.summary(viewer.as_ref(), post_id).await?;
    Ok(Json(summary))
}

async fn toggle<P, I, C, U>(
    usecase: Arc<InteractionsUseCase<P, I, C, U>>,
    auth: AuthUser,
    post_id: Result<Path<i64>, PathRejection>,
    kind: InteractionType,
) -> AppResult<Json<InteractionSummaryDto>>
where
    P: PostRepository + Send + Sync + 'static,
    I: InteractionRepository + Send + Sync + 'static,
    C: CommentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    let post_id = path_id(post_id)?;
    let summary = usecase.toggle(&auth, post_id, kind).await?;
    Ok(Json(summary))
}
