use crate::{
    axum_http::error_responses::{AppError, AppResult},
    usecases::images::ImagesUseCase,
};
use axum::{
    Router,
    extract::{Path, State, rejection::PathRejection},
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    response::IntoResponse,
    routing::get,
};
use quill::{
    domain::{repositories::images::ImageStorage, value_objects::images::PNG_CONTENT_TYPE},
    infra::storages::local_images::LocalImageStorage,
};
use std::sync::Arc;
use uuid::Uuid;

const IMMUTABLE_CACHE: &str = "public, max-age=31536000, immutable";

pub fn routes(image_storage: Arc<LocalImageStorage>) -> Router {
    let usecase = ImagesUseCase::new(image_storage);

    Router::new()
        .route("/:id", get(get_image))
        .with_state(Arc::new(usecase))
}

pub async fn get_image<Img>(
    State(usecase): State<Arc<ImagesUseCase<Img>>>,
    image_id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<impl IntoResponse>
where
    Img: ImageStorage + Send + Sync + 'static,
{
    let Path(image_id) = image_id.map_err(|_| AppError::not_found("Image"))?;
    let bytes = usecase.load(image_id).await?;

    Ok((
        [(CONTENT_TYPE, PNG_CONTENT_TYPE), (CACHE_CONTROL, IMMUTABLE_CACHE)],
        bytes,
    ))
}
