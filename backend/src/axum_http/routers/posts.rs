use crate::{
    auth::{AuthUser, OptionalAuthUser},
    axum_http::{
        error_responses::AppResult,
        routers::extractors::{PostPayload, path_id, query},
    },
    usecases::{
        identity::IdentityResolver, posts::PostsUseCase, premium_access::PremiumAccessResolver,
    },
};
use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::PathRejection, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use quill::{
    domain::{
        repositories::{
            comments::CommentRepository, images::ImageStorage,
            interactions::InteractionRepository, posts::PostRepository,
            subscriptions::SubscriptionRepository, users::UserRepository,
        },
        value_objects::posts::{CreatePostModel, ListPostsQuery, UpdatePostModel},
    },
    infra::{
        db::{
            postgres::postgres_connection::PgPoolSquad,
            repositories::{
                comments::CommentPostgres, interactions::InteractionPostgres,
                posts::PostPostgres, subscriptions::SubscriptionPostgres, users::UserPostgres,
            },
        },
        storages::local_images::LocalImageStorage,
    },
};
use std::sync::Arc;
use tracing::info;

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    image_storage: Arc<LocalImageStorage>,
    image_max_bytes: usize,
) -> Router {
    let post_repository = PostPostgres::new(Arc::clone(&db_pool));
    let interaction_repository = InteractionPostgres::new(Arc::clone(&db_pool));
    let comment_repository = CommentPostgres::new(Arc::clone(&db_pool));
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let user_repository = UserPostgres::new(Arc::clone(&db_pool));

    let usecase = PostsUseCase::new(
        Arc::new(post_repository),
        Arc::new(interaction_repository),
        Arc::new(comment_repository),
        image_storage,
        Arc::new(IdentityResolver::new(Arc::new(user_repository))),
        Arc::new(PremiumAccessResolver::new(Arc::new(subscription_repository))),
        image_max_bytes,
    );

    Router::new()
        .route("/api/posts", get(list_posts).post(create_post))
        .route(
            "/api/posts/:id",
            get(get_post).put(update_post).delete(archive_post),
        )
        .with_state(Arc::new(usecase))
}

pub async fn list_posts<P, I, C, S, U, Img>(
    State(usecase): State<Arc<PostsUseCase<P, I, C, S, U, Img>>>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    list_query: Result<Query<ListPostsQuery>, QueryRejection>,
) -> AppResult<impl IntoResponse>
where
    P: PostRepository + Send + Sync + 'static,
    I: InteractionRepository + Send + Sync + 'static,
    C: CommentRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    Img: ImageStorage + Send + Sync + 'static,
{
    let list_query = query(list_query)?;
    let response = usecase.list(viewer.as_ref(), list_query).await?;
    Ok(Json(response))
}

pub async fn get_post<P, I, C, S, U, Img>(
    State(usecase): State<Arc<PostsUseCase<P, I, C, S, U, Img>>>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    post_id: Result<Path<i64>, PathRejection>,
) -> AppResult<impl IntoResponse>
where
    P: PostRepository + Send + Sync + 'static,
    I: InteractionRepository + Send + Sync + 'static,
    C: CommentRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    Img: ImageStorage + Send + Sync + 'static,
{
    let post_id = path_id(post_id)?;
    let post = usecase.get(viewer.as_ref(), post_id).await?;
    Ok(Json(post))
}

pub async fn create_post<P, I, C, S, U, Img>(
    State(usecase): State<Arc<PostsUseCase<P, I, C, S, U, Img>>>,
    auth: AuthUser,
    payload: PostPayload<CreatePostModel>,
) -> AppResult<impl IntoResponse>
where
    P: PostRepository + Send + Sync + 'static,
    I: InteractionRepository + Send + Sync + 'static,
    C: CommentRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    Img: ImageStorage + Send + Sync + 'static,
{
    info!(
        external_id = %auth.external_id,
        has_image = payload.image.is_some(),
        "posts: create request received"
    );
    let post = usecase.create(&auth, payload.model, payload.image).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_post<P, I, C, S, U, Img>(
    State(usecase): State<Arc<PostsUseCase<P, I, C, S, U, Img>>>,
    auth: AuthUser,
    post_id: Result<Path<i64>, PathRejection>,
    payload: PostPayload<UpdatePostModel>,
) -> AppResult<impl IntoResponse>
where
    P: PostRepository + Send + Sync + 'static,
    I: InteractionRepository + Send + Sync + 'static,
    C: CommentRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    Img: ImageStorage + Send + Sync + 'static,
{
    let post_id = path_id(post_id)?;
    let post = usecase
        .update(&auth, post_id, payload.model, payload.image)
        .await?;
    Ok(Json(post))
}

pub async fn archive_post<P, I, C, S, U, Img>(
    State(usecase): State<Arc<PostsUseCase<P, I, C, S, U, Img>>>,
    auth: AuthUser,
    post_id: Result<Path<i64>, PathRejection>,
) -> AppResult<impl IntoResponse>
where
    P: PostRepository + Send + Sync + 'static,
    I: InteractionRepository + Send + Sync + 'static,
    C: CommentRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    Img: ImageStorage + Send + Sync + 'static,
{
    let post_id = path_id(post_id)?;
    usecase.archive(&auth, post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
