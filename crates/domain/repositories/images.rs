use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

#[async_trait]
#[automock]
pub trait ImageStorage {
    /// Stores a PNG under a fresh id.
    async fn save(&self, bytes: Vec<u8>) -> Result<Uuid>;
    async fn load(&self, image_id: Uuid) -> Result<Option<Vec<u8>>>;
}
