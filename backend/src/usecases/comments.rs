use quill::domain::{
    entities::comments::InsertCommentEntity,
    repositories::{comments::CommentRepository, posts::PostRepository, users::UserRepository},
    value_objects::{
        comments::{
            COMMENT_MAX_CHARS, CommentDto, CreateCommentModel, ListCommentsQuery,
            is_valid_comment_content,
        },
        pagination::Pagination,
    },
};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    auth::AuthUser,
    axum_http::error_responses::{AppError, AppResult},
    usecases::identity::IdentityResolver,
};

pub struct CommentsUseCase<P, C, U>
where
    P: PostRepository + Send + Sync + 'static,
    C: CommentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    post_repo: Arc<P>,
    comment_repo: Arc<C>,
    identity: Arc<IdentityResolver<U>>,
}

impl<P, C, U> CommentsUseCase<P, C, U>
where
    P: PostRepository + Send + Sync + 'static,
    C: CommentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    pub fn new(post_repo: Arc<P>, comment_repo: Arc<C>, identity: Arc<IdentityResolver<U>>) -> Self {
        Self {
            post_repo,
            comment_repo,
            identity,
        }
    }

    /// Newest first.
    pub async fn list(&self, post_id: i64, query: ListCommentsQuery) -> AppResult<Vec<CommentDto>> {
        self.ensure_post_exists(post_id).await?;

        let pagination = Pagination::new(query.page, query.limit);
        let (comments, _total) = self
            .comment_repo
            .list_by_post(post_id, pagination)
            .await
            .map_err(|err| {
                error!(post_id, db_error = ?err, "comments: failed to list comments");
                AppError::Internal(err)
            })?;

        Ok(comments.into_iter().map(CommentDto::from).collect())
    }

    pub async fn create(
        &self,
        auth: &AuthUser,
        post_id: i64,
        model: CreateCommentModel,
    ) -> AppResult<CommentDto> {
        let content = model.content.unwrap_or_default();
        if !is_valid_comment_content(&content) {
            return Err(AppError::Validation(format!(
                "content must be 1-{COMMENT_MAX_CHARS} characters"
            )));
        }

        let user_id = self.identity.require_user_id(auth).await?;
        self.ensure_post_exists(post_id).await?;

        let comment = self
            .comment_repo
            .create(InsertCommentEntity {
                post_id,
                user_id,
                content,
            })
            .await
            .map_err(|err| {
                error!(post_id, user_id, db_error = ?err, "comments: failed to create comment");
                AppError::Internal(err)
            })?;

        info!(comment_id = comment.comment.id, post_id, user_id, "comments: created comment");
        Ok(CommentDto::from(comment))
    }

    /// Only the author or an admin may delete.
    pub async fn delete(&self, auth: &AuthUser, comment_id: i64) -> AppResult<()> {
        let comment = self
            .comment_repo
            .find_by_id(comment_id)
            .await
            .map_err(|err| {
                error!(comment_id, db_error = ?err, "comments: failed to load comment");
                AppError::Internal(err)
            })?
            .ok_or_else(|| AppError::not_found("Comment"))?;

        if !auth.is_admin() {
            let user_id = self.identity.require_user_id(auth).await?;
            if user_id != comment.user_id {
                warn!(comment_id, user_id, "comments: delete denied for non-owner");
                return Err(AppError::Forbidden("Insufficient permissions".to_string()));
            }
        }

        let deleted = self.comment_repo.delete(comment_id).await.map_err(|err| {
            error!(comment_id, db_error = ?err, "comments: failed to delete comment");
            AppError::Internal(err)
        })?;

        if !deleted {
            return Err(AppError::not_found("Comment"));
        }

        info!(comment_id, "comments: deleted comment");
        Ok(())
    }

    async fn ensure_post_exists(&self, post_id: i64) -> AppResult<()> {
        self.post_repo
            .find_by_id(post_id)
            .await
            .map_err(|err| {
                error!(post_id, db_error = ?err, "comments: failed to load post");
                AppError::Internal(err)
            })?
            .map(|_| ())
            .ok_or_else(|| AppError::not_found("Post"))
    }
}
