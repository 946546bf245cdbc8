use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::services::image_store::ImageUpload;
use crate::validation::Validate;

pub mod admin;
pub mod auth;
pub mod shop;

/// Largest single image accepted in a multipart upload.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// `axum::Json` with our error envelope on rejection.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct PathParam<T>(pub T);

/// JSON body that has passed [`Validate`].
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonBody(value) = JsonBody::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidJson(value))
    }
}

/// A create/update payload sent either as plain JSON or as
/// `multipart/form-data` with a JSON `data` field plus `image`/`images` files.
pub struct WithImages<T> {
    pub data: T,
    pub images: Vec<ImageUpload>,
}

fn bad_multipart(err: impl std::fmt::Display) -> AppError {
    AppError::BadRequest(format!("Invalid multipart body: {err}"))
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

#[async_trait]
impl<S, T> FromRequest<S> for WithImages<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let JsonBody(data) = JsonBody::<T>::from_request(req, state).await?;
            return Ok(WithImages { data, images: Vec::new() });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let mut data = None;
        let mut images = Vec::new();
        while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "data" => {
                    let text = field.text().await.map_err(bad_multipart)?;
                    let parsed = serde_json::from_str::<T>(&text)
                        .map_err(|e| AppError::BadRequest(format!("Invalid data field: {e}")))?;
                    data = Some(parsed);
                }
                "image" | "images" => {
                    let content_type = field.content_type().unwrap_or_default().to_string();
                    if !content_type.starts_with("image/") {
                        return Err(AppError::BadRequest("Only image files are allowed".into()));
                    }
                    let file_name = field.file_name().unwrap_or("upload").to_string();
                    let bytes = field.bytes().await.map_err(bad_multipart)?;
                    if bytes.is_empty() {
                        continue;
                    }
                    if bytes.len() > MAX_IMAGE_BYTES {
                        return Err(AppError::BadRequest(format!(
                            "Image {file_name} exceeds the {} MB limit",
                            MAX_IMAGE_BYTES / (1024 * 1024)
                        )));
                    }
                    images.push(ImageUpload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
                other => tracing::debug!(field = other, "ignoring unknown multipart field"),
            }
        }

        // an image-only upload carries no data field
        let data = match data {
            Some(data) => data,
            None => serde_json::from_str::<T>("{}")
                .map_err(|e| AppError::BadRequest(format!("Missing data field: {e}")))?,
        };
        Ok(WithImages { data, images })
    }
}
