use axum::{
    Json, async_trait,
    extract::{
        FromRequest, Multipart, Path, Query, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::header::CONTENT_TYPE,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::axum_http::error_responses::{AppError, AppResult};

const IMAGE_FIELD: &str = "image";

pub fn path_id(path: Result<Path<i64>, PathRejection>) -> AppResult<i64> {
    let Path(id) = path.map_err(|err| {
        debug!(error = %err, "http: invalid path id");
        AppError::Validation("id must be a number".to_string())
    })?;
    Ok(id)
}

pub fn query<T>(query: Result<Query<T>, QueryRejection>) -> AppResult<T> {
    let Query(value) = query.map_err(|err| AppError::Validation(err.body_text()))?;
    Ok(value)
}

pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    let Json(value) = body.map_err(|err| AppError::Validation(err.body_text()))?;
    Ok(value)
}

/// Post body sent either as JSON or as `multipart/form-data` with an optional `image` file.
/// Multipart text fields are coerced into the same JSON shape before deserializing.
pub struct PostPayload<T> {
    pub model: T,
    pub image: Option<Vec<u8>>,
}

#[async_trait]
impl<S, T> FromRequest<S> for PostPayload<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|err| AppError::Validation(err.body_text()))?;
            return read_multipart(multipart).await;
        }

        let model = json_body(Json::<T>::from_request(req, state).await)?;
        Ok(Self { model, image: None })
    }
}

async fn read_multipart<T>(mut multipart: Multipart) -> AppResult<PostPayload<T>>
where
    T: DeserializeOwned,
{
    let mut fields = Map::new();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::Validation(err.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == IMAGE_FIELD {
            let bytes = field
                .bytes()
                .await
                .map_err(|err| AppError::Validation(err.body_text()))?;
            if !bytes.is_empty() {
                image = Some(bytes.to_vec());
            }
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|err| AppError::Validation(err.body_text()))?;

        if let Some(value) = form_value(&name, text)? {
            fields.insert(name, value);
        }
    }

    let model = serde_json::from_value(Value::Object(fields))
        .map_err(|err| AppError::Validation(format!("invalid post fields: {err}")))?;

    Ok(PostPayload { model, image })
}

/// Maps one text field onto the JSON type the post models expect.
/// `None` drops the field so it counts as absent.
fn form_value(name: &str, text: String) -> AppResult<Option<Value>> {
    let trimmed = text.trim();

    match name {
        "is_premium" => {
            if trimmed.is_empty() {
                return Ok(None);
            }
            Ok(Some(Value::Bool(matches!(
                trimmed.to_ascii_lowercase().as_str(),
                "true" | "1" | "on" | "yes"
            ))))
        }
        "author_id" => {
            if trimmed.is_empty() {
                return Ok(None);
            }
            let id = trimmed
                .parse::<i64>()
                .map_err(|_| AppError::Validation("author_id must be a number".to_string()))?;
            Ok(Some(Value::from(id)))
        }
        "labels" => {
            if trimmed.starts_with('[') {
                let labels: Vec<String> = serde_json::from_str(trimmed).map_err(|_| {
                    AppError::Validation("labels must be a JSON array of strings".to_string())
                })?;
                return Ok(Some(Value::from(labels)));
            }
            let labels: Vec<Value> = trimmed
                .split(',')
                .map(str::trim)
                .filter(|label| !label.is_empty())
                .map(Value::from)
                .collect();
            Ok(Some(Value::Array(labels)))
        }
        "image_id" | "preview" if trimmed.is_empty() => Ok(Some(Value::Null)),
        _ => Ok(Some(Value::String(text))),
    }
}
