use crate::{
    auth::{AuthUser, OptionalAuthUser},
    axum_http::{
        error_responses::AppResult,
        routers::extractors::{json_body, path_id, query},
    },
    usecases::{comments::CommentsUseCase, identity::IdentityResolver},
};
use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};
use quill::{
    domain::{
        repositories::{comments::CommentRepository, posts::PostRepository, users::UserRepository},
        value_objects::comments::{CreateCommentModel, ListCommentsQuery},
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{comments::CommentPostgres, posts::PostPostgres, users::UserPostgres},
    },
};
use std::sync::Arc;

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let post_repository = PostPostgres::new(Arc::clone(&db_pool));
    let comment_repository = CommentPostgres::new(Arc::clone(&db_pool));
    let user_repository = UserPostgres::new(Arc::clone(&db_pool));

    let usecase = CommentsUseCase::new(
        Arc::new(post_repository),
        Arc::new(comment_repository),
        Arc::new(IdentityResolver::new(Arc::new(user_repository))),
    );

    Router::new()
        .route(
            "/api/posts/:id/comments",
            get(list_comments).post(create_comment),
        )
        .route("/api/comments/:id", delete(delete_comment))
        .with_state(Arc::new(usecase))
}

/// Public listing; a caller token is accepted but not required.
pub async fn list_comments<P, C, U>(
    State(usecase): State<Arc<CommentsUseCase<P, C, U>>>,
    _viewer: OptionalAuthUser,
    post_id: Result<Path<i64>, PathRejection>,
    list_query: Result<Query<ListCommentsQuery>, QueryRejection>,
) -> AppResult<impl IntoResponse>
where
    P: PostRepository + Send + Sync + 'static,
    C: CommentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    let post_id = path_id(post_id)?;
    let comments = usecase.list(post_id, query(list_query)?).await?;
    Ok(Json(comments))
}

pub async fn create_comment<P, C, U>(
    State(usecase): State<Arc<CommentsUseCase<P, C, U>>>,
    auth: AuthUser,
    post_id: Result<Path<i64>, PathRejection>,
    body: Result<Json<CreateCommentModel>, JsonRejection>,
) -> AppResult<impl IntoResponse>
where
    P: PostRepository + Send + Sync + 'static,
    C: CommentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    let post_id = path_id(post_id)?;
    let comment = usecase.create(&auth, post_id, json_body(body)?).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn delete_comment<P, C, U>(
    State(usecase): State<Arc<CommentsUseCase<P, C, U>>>,
    auth: AuthUser,
    comment_id: Result<Path<i64>, PathRejection>,
) -> AppResult<impl IntoResponse>
where
    P: PostRepository + Send + Sync + 'static,
    C: CommentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    let comment_id = path_id(comment_id)?;
    usecase.delete(&auth, comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
