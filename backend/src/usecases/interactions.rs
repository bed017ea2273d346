use quill::domain::{
    repositories::{
        comments::CommentRepository, interactions::InteractionRepository, posts::PostRepository,
        users::UserRepository,
    },
    value_objects::{
        enums::interaction_types::InteractionType,
        interactions::{InteractionSummaryDto, summarize_user_interaction},
    },
};
use std::sync::Arc;
use tracing::{error, info};

use crate::{
    auth::AuthUser,
    axum_http::error_responses::{AppError, AppResult},
    usecases::identity::IdentityResolver,
};

pub struct InteractionsUseCase<P, I, C, U>
where
    P: PostRepository + Send + Sync + 'static,
    I: InteractionRepository + Send + Sync + 'static,
    C: CommentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    post_repo: Arc<P>,
    interaction_repo: Arc<I>,
    comment_repo: Arc<C>,
    identity: Arc<IdentityResolver<U>>,
}

impl<P, I, C, U> InteractionsUseCase<P, I, C, U>
where
    P: PostRepository + Send + Sync + 'static,
    I: InteractionRepository + Send + Sync + 'static,
    C: CommentRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    pub fn new(
        post_repo: Arc<P>,
        interaction_repo: Arc<I>,
        comment_repo: Arc<C>,
        identity: Arc<IdentityResolver<U>>,
    ) -> Self {
        Self {
            post_repo,
            interaction_repo,
            comment_repo,
            identity,
        }
    }

    /// Flips `kind` for the caller on the post and returns freshly counted totals.
    pub async fn toggle(
        &self,
        auth: &AuthUser,
        post_id: i64,
        kind: InteractionType,
    ) -> AppResult<InteractionSummaryDto> {
        let user_id = self.identity.require_user_id(auth).await?;
        self.ensure_post_exists(post_id).await?;

        let kinds = self
            .interaction_repo
            .toggle(user_id, post_id, kind)
            .await
            .map_err(|err| {
                error!(user_id, post_id, kind = %kind, db_error = ?err, "interactions: toggle failed");
                AppError::Internal(err)
            })?;

        info!(
            user_id,
            post_id,
            kind = %kind,
            active = kinds.contains(&kind),
            "interactions: toggled"
        );

        self.build_summary(post_id, summarize_user_interaction(&kinds))
            .await
    }

    pub async fn summary(
        &self,
        viewer: Option<&AuthUser>,
        post_id: i64,
    ) -> AppResult<InteractionSummaryDto> {
        self.ensure_post_exists(post_id).await?;
        let viewer_id = self.identity.optional_user_id(viewer).await?;

        let user_interaction = match viewer_id {
            Some(user_id) => {
                let kinds = self
                    .interaction_repo
                    .user_interactions(user_id, post_id)
                    .await
                    .map_err(|err| {
                        error!(user_id, post_id, db_error = ?err, "interactions: failed to load user interactions");
                        AppError::Internal(err)
                    })?;
                summarize_user_interaction(&kinds)
            }
            None => None,
        };

        self.build_summary(post_id, user_interaction).await
    }

    async fn ensure_post_exists(&self, post_id: i64) -> AppResult<()> {
        self.post_repo
            .find_by_id(post_id)
            .await
            .map_err(|err| {
                error!(post_id, db_error = ?err, "interactions: failed to load post");
                AppError::Internal(err)
            })?
            .map(|_| ())
            .ok_or_else(|| AppError::not_found("Post"))
    }

    async fn build_summary(
        &self,
        post_id: i64,
        user_interaction: Option<InteractionType>,
    ) -> AppResult<InteractionSummaryDto> {
        let stats = self.interaction_repo.stats(post_id).await.map_err(|err| {
            error!(post_id, db_error = ?err, "interactions: failed to count interactions");
            AppError::Internal(err)
        })?;

        let comments = self
            .comment_repo
            .count_by_post(post_id)
            .await
            .map_err(|err| {
                error!(post_id, db_error = ?err, "interactions: failed to count comments");
                AppError::Internal(err)
            })?;

        Ok(InteractionSummaryDto {
            likes: stats.like_count,
            dislikes: stats.dislike_count,
            comments,
            user_interaction,
        })
    }
}
