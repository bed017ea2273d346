use quill::domain::{
    entities::posts::{InsertPostEntity, PostEntity, UpdatePostEntity},
    repositories::{
        comments::CommentRepository, images::ImageStorage, interactions::InteractionRepository,
        posts::PostRepository, subscriptions::SubscriptionRepository, users::UserRepository,
    },
    value_objects::{
        enums::post_statuses::PostStatus,
        images::is_png,
        interactions::{InteractionStats, summarize_user_interaction},
        pagination::Pagination,
        posts::{
            AccessDecision, CreatePostModel, ListPostsQuery, PostDto, PostFilters,
            PostListResponse, TITLE_MAX_CHARS, UpdatePostModel, normalize_labels,
            parse_label_list,
        },
    },
};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    axum_http::error_responses::{AppError, AppResult},
    usecases::{
        identity::IdentityResolver,
        premium_access::{PremiumAccessResolver, decide_with},
    },
};

pub struct PostsUseCase<P, I, C, S, U, Img>
where
    P: PostRepository + Send + Sync + 'static,
    I: InteractionRepository + Send + Sync + 'static,
    C: CommentRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    Img: ImageStorage + Send + Sync + 'static,
{
    post_repo: Arc<P>,
    interaction_repo: Arc<I>,
    comment_repo: Arc<C>,
    image_storage: Arc<Img>,
    identity: Arc<IdentityResolver<U>>,
    premium_access: Arc<PremiumAccessResolver<S>>,
    image_max_bytes: usize,
}

impl<P, I, C, S, U, Img> PostsUseCase<P, I, C, S, U, Img>
where
    P: PostRepository + Send + Sync + 'static,
    I: InteractionRepository + Send + Sync + 'static,
    C: CommentRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    Img: ImageStorage + Send + Sync + 'static,
{
    pub fn new(
        post_repo: Arc<P>,
        interaction_repo: Arc<I>,
        comment_repo: Arc<C>,
        image_storage: Arc<Img>,
        identity: Arc<IdentityResolver<U>>,
        premium_access: Arc<PremiumAccessResolver<S>>,
        image_max_bytes: usize,
    ) -> Self {
        Self {
            post_repo,
            interaction_repo,
            comment_repo,
            image_storage,
            identity,
            premium_access,
            image_max_bytes,
        }
    }

    pub async fn list(
        &self,
        viewer: Option<&AuthUser>,
        query: ListPostsQuery,
    ) -> AppResult<PostListResponse> {
        let status = parse_status(query.status.as_deref())?;
        let viewer_id = self.identity.optional_user_id(viewer).await?;

        let favorited_by = if query.favorites.unwrap_or(false) {
            let user_id = viewer_id.ok_or_else(|| {
                AppError::Unauthorized("Authentication required to list favorites".to_string())
            })?;
            Some(user_id)
        } else {
            None
        };

        let filters = PostFilters {
            status,
            label: query.label,
            labels: query
                .labels
                .as_deref()
                .map(parse_label_list)
                .unwrap_or_default(),
            is_premium: query.premium,
            author_id: query.author_id,
            q: query.q.or(query.search),
            favorited_by,
        };
        let pagination = Pagination::new(query.page, query.limit);

        let (posts, total) = self
            .post_repo
            .list_with_filters(filters, pagination)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "posts: failed to list posts");
                AppError::Internal(err)
            })?;

        let viewer_has_access = if posts.iter().any(|post| post.is_premium) {
            self.viewer_has_access(viewer_id).await?
        } else {
            false
        };

        let mut items = Vec::with_capacity(posts.len());
        for post in posts {
            let access = decide_with(&post, viewer_has_access);
            items.push(self.to_dto(post, access, viewer_id).await?);
        }

        Ok(PostListResponse {
            posts: items,
            pagination: pagination.meta(total),
        })
    }

    pub async fn get(&self, viewer: Option<&AuthUser>, post_id: i64) -> AppResult<PostDto> {
        let post = self.find_post(post_id).await?;
        let viewer_id = self.identity.optional_user_id(viewer).await?;

        let access = self
            .premium_access
            .decide(&post, viewer_id)
            .await
            .map_err(|err| {
                error!(post_id, db_error = ?err, "posts: failed to resolve premium access");
                AppError::Internal(err)
            })?;

        self.to_dto(post, access, viewer_id).await
    }

    pub async fn create(
        &self,
        auth: &AuthUser,
        model: CreatePostModel,
        image: Option<Vec<u8>>,
    ) -> AppResult<PostDto> {
        auth.require_admin()?;

        let title = validate_title(model.title.as_deref().unwrap_or_default())?;
        let content = validate_content(model.content.as_deref().unwrap_or_default())?;
        let status = parse_status(model.status.as_deref())?.unwrap_or_default();

        let author_id = match model.author_id {
            Some(author_id) => author_id,
            None => self.identity.require_user_id(auth).await?,
        };

        let image_id = match image {
            Some(bytes) => Some(self.store_image(bytes).await?),
            None => model.image_id,
        };

        let post = self
            .post_repo
            .create(InsertPostEntity {
                title,
                content,
                preview: clean_preview(model.preview),
                image_id,
                status: status.to_string(),
                is_premium: model.is_premium.unwrap_or(false),
                labels: normalize_labels(model.labels.unwrap_or_default()),
                author_id,
            })
            .await
            .map_err(|err| {
                error!(db_error = ?err, "posts: failed to create post");
                AppError::Internal(err)
            })?;

        info!(post_id = post.id, author_id, "posts: created post");

        let access = AccessDecision::for_post(&post, true);
        Ok(PostDto::new(post, access, InteractionStats::default(), 0, None))
    }

    pub async fn update(
        &self,
        auth: &AuthUser,
        post_id: i64,
        model: UpdatePostModel,
        image: Option<Vec<u8>>,
    ) -> AppResult<PostDto> {
        auth.require_admin()?;

        let title = model.title.as_deref().map(validate_title).transpose()?;
        let content = model.content.as_deref().map(validate_content).transpose()?;
        let status = parse_status(model.status.as_deref())?;

        let image_id = match image {
            Some(bytes) => Some(Some(self.store_image(bytes).await?)),
            None => model.image_id,
        };

        let changes = UpdatePostEntity {
            title,
            content,
            preview: model.preview.map(clean_preview),
            image_id,
            status: status.map(|status| status.to_string()),
            is_premium: model.is_premium,
            labels: model.labels.map(normalize_labels),
            author_id: model.author_id,
            updated_at: chrono::Utc::now(),
        };

        let post = self
            .post_repo
            .update(post_id, changes)
            .await
            .map_err(|err| {
                error!(post_id, db_error = ?err, "posts: failed to update post");
                AppError::Internal(err)
            })?
            .ok_or_else(|| AppError::not_found("Post"))?;

        info!(post_id, "posts: updated post");

        let viewer_id = self.identity.optional_user_id(Some(auth)).await?;
        let access = AccessDecision::for_post(&post, true);
        self.to_dto(post, access, viewer_id).await
    }

    /// Soft delete: the post moves to `archived` and stays in the table.
    pub async fn archive(&self, auth: &AuthUser, post_id: i64) -> AppResult<()> {
        auth.require_admin()?;

        self.post_repo
            .update(post_id, UpdatePostEntity::archive())
            .await
            .map_err(|err| {
                error!(post_id, db_error = ?err, "posts: failed to archive post");
                AppError::Internal(err)
            })?
            .ok_or_else(|| AppError::not_found("Post"))?;

        info!(post_id, "posts: archived post");
        Ok(())
    }

    async fn find_post(&self, post_id: i64) -> AppResult<PostEntity> {
        self.post_repo
            .find_by_id(post_id)
            .await
            .map_err(|err| {
                error!(post_id, db_error = ?err, "posts: failed to load post");
                AppError::Internal(err)
            })?
            .ok_or_else(|| AppError::not_found("Post"))
    }

    async fn viewer_has_access(&self, viewer_id: Option<i64>) -> AppResult<bool> {
        self.premium_access
            .viewer_has_access(viewer_id)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "posts: failed to resolve premium access");
                AppError::Internal(err)
            })
    }

    async fn store_image(&self, bytes: Vec<u8>) -> AppResult<Uuid> {
        if bytes.len() > self.image_max_bytes {
            return Err(AppError::Validation(format!(
                "image must be at most {} bytes",
                self.image_max_bytes
            )));
        }
        if !is_png(&bytes) {
            return Err(AppError::Validation("image must be a PNG file".to_string()));
        }

        self.image_storage.save(bytes).await.map_err(|err| {
            error!(storage_error = ?err, "posts: failed to store image");
            AppError::Internal(err)
        })
    }

    async fn to_dto(
        &self,
        post: PostEntity,
        access: AccessDecision,
        viewer_id: Option<i64>,
    ) -> AppResult<PostDto> {
        let post_id = post.id;

        let stats = self.interaction_repo.stats(post_id).await.map_err(|err| {
            error!(post_id, db_error = ?err, "posts: failed to load interaction stats");
            AppError::Internal(err)
        })?;

        let comment_count = self
            .comment_repo
            .count_by_post(post_id)
            .await
            .map_err(|err| {
                error!(post_id, db_error = ?err, "posts: failed to count comments");
                AppError::Internal(err)
            })?;

        let user_interaction = match viewer_id {
            Some(user_id) => {
                let kinds = self
                    .interaction_repo
                    .user_interactions(user_id, post_id)
                    .await
                    .map_err(|err| {
                        error!(post_id, user_id, db_error = ?err, "posts: failed to load user interactions");
                        AppError::Internal(err)
                    })?;
                summarize_user_interaction(&kinds)
            }
            None => None,
        };

        Ok(PostDto::new(post, access, stats, comment_count, user_interaction))
    }
}

fn parse_status(raw: Option<&str>) -> AppResult<Option<PostStatus>> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => PostStatus::from_str(value).map(Some).ok_or_else(|| {
            AppError::Validation("status must be one of draft, published, archived".to_string())
        }),
    }
}

fn validate_title(raw: &str) -> AppResult<String> {
    let title = raw.trim();
    let length = title.chars().count();
    if length == 0 || length > TITLE_MAX_CHARS {
        return Err(AppError::Validation(format!(
            "title must be 1-{TITLE_MAX_CHARS} characters"
        )));
    }
    Ok(title.to_string())
}

fn validate_content(raw: &str) -> AppResult<String> {
    if raw.trim().is_empty() {
        return Err(AppError::Validation("content is required".to_string()));
    }
    Ok(raw.to_string())
}

fn clean_preview(preview: Option<String>) -> Option<String> {
    preview.filter(|value| !value.trim().is_empty())
}
