use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::value_objects::{
    enums::interaction_types::InteractionType, interactions::InteractionStats,
};

#[async_trait]
#[automock]
pub trait InteractionRepository {
    /// Flips presence of `kind` for the pair, clearing the opposite reaction on insert.
    /// Runs atomically. Returns the reactions the user holds on the post afterwards.
    async fn toggle(
        &self,
        user_id: i64,
        post_id: i64,
        kind: InteractionType,
    ) -> Result<Vec<InteractionType>>;
    async fn stats(&self, post_id: i64) -> Result<InteractionStats>;
    async fn user_interactions(&self, user_id: i64, post_id: i64)
    -> Result<Vec<InteractionType>>;
}
