use quill::domain::repositories::images::ImageStorage;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::axum_http::error_responses::{AppError, AppResult};

pub struct ImagesUseCase<Img>
where
    Img: ImageStorage + Send + Sync + 'static,
{
    image_storage: Arc<Img>,
}

impl<Img> ImagesUseCase<Img>
where
    Img: ImageStorage + Send + Sync + 'static,
{
    pub fn new(image_storage: Arc<Img>) -> Self {
        Self { image_storage }
    }

    pub async fn load(&self, image_id: Uuid) -> AppResult<Vec<u8>> {
        self.image_storage
            .load(image_id)
            .await
            .map_err(|err| {
                error!(%image_id, storage_error = ?err, "images: failed to read image");
                AppError::Internal(err)
            })?
            .ok_or_else(|| AppError::not_found("Image"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use quill::domain::repositories::images::MockImageStorage;

    #[tokio::test]
    async fn missing_image_is_not_found() {
        let mut storage = MockImageStorage::new();
        storage
            .expect_load()
            .returning(|_| Box::pin(async { Ok(None) }));

        let result = ImagesUseCase::new(Arc::new(storage))
            .load(Uuid::new_v4())
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn returns_stored_bytes() {
        let image_id = Uuid::new_v4();
        let mut storage = MockImageStorage::new();
        storage
            .expect_load()
            .with(eq(image_id))
            .returning(|_| Box::pin(async { Ok(Some(vec![1, 2, 3])) }));

        let bytes = ImagesUseCase::new(Arc::new(storage))
            .load(image_id)
            .await
            .unwrap();

        assert_eq!(bytes, vec![1, 2, 3]);
    }
}
