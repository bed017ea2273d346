use anyhow::Result;
use quill::domain::{
    entities::users::{InsertUserEntity, UserEntity},
    repositories::users::UserRepository,
};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::{
    auth::AuthUser,
    axum_http::error_responses::{AppError, AppResult},
};

/// Maps a verified external identity onto the local user row.
pub struct IdentityResolver<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    user_repo: Arc<U>,
}

impl<U> IdentityResolver<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    pub fn new(user_repo: Arc<U>) -> Self {
        Self { user_repo }
    }

    /// Finds the local user, creating it on first sight when the token carries an email.
    /// `None` means the identity cannot be resolved and callers must fail closed.
    pub async fn resolve(&self, auth: &AuthUser) -> Result<Option<UserEntity>> {
        if let Some(user) = self
            .user_repo
            .find_by_external_auth_id(auth.external_id.clone())
            .await?
        {
            return Ok(Some(user));
        }

        let Some(email) = auth.email.clone() else {
            debug!(
                external_id = %auth.external_id,
                "identity: unknown subject without email claim"
            );
            return Ok(None);
        };

        let user = self
            .user_repo
            .create(InsertUserEntity {
                external_auth_id: auth.external_id.clone(),
                email,
                name: auth.name.clone(),
                avatar_url: auth.picture.clone(),
            })
            .await?;

        info!(user_id = user.id, "identity: created local user on first sight");
        Ok(Some(user))
    }

    pub async fn require_user(&self, auth: &AuthUser) -> AppResult<UserEntity> {
        self.resolve(auth)
            .await
            .map_err(|err| {
                error!(
                    external_id = %auth.external_id,
                    db_error = ?err,
                    "identity: failed to resolve caller"
                );
                AppError::Internal(err)
            })?
            .ok_or_else(|| AppError::Unauthorized("User profile could not be resolved".to_string()))
    }

    pub async fn require_user_id(&self, auth: &AuthUser) -> AppResult<i64> {
        Ok(self.require_user(auth).await?.id)
    }

    pub async fn optional_user_id(&self, auth: Option<&AuthUser>) -> AppResult<Option<i64>> {
        let Some(auth) = auth else {
            return Ok(None);
        };

        let user = self.resolve(auth).await.map_err(|err| {
            error!(
                external_id = %auth.external_id,
                db_error = ?err,
                "identity: failed to resolve optional caller"
            );
            AppError::Internal(err)
        })?;

        Ok(user.map(|user| user.id))
    }
}
