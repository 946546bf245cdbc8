//! Image hosting. Cloudinary when configured, otherwise files on local disk
//! served back under `/uploads`.
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::CloudinaryConfig;
use crate::db::new_id;
use crate::models::catalog::ImageRef;

/// A file received from a multipart request.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            _ => "jpg",
        }
    }
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(&self, image: ImageUpload, folder: &str) -> Result<ImageRef>;
    async fn delete(&self, public_id: &str) -> Result<()>;
}

/// Uploads every image or none: on a failure the ones already stored are removed.
pub async fn upload_all(store: &dyn ImageStore, images: Vec<ImageUpload>, folder: &str) -> Result<Vec<ImageRef>> {
    let mut stored = Vec::with_capacity(images.len());
    for image in images {
        match store.upload(image, folder).await {
            Ok(r) => stored.push(r),
            Err(e) => {
                for r in &stored {
                    if let Err(err) = store.delete(&r.public_id).await {
                        tracing::warn!(public_id = %r.public_id, error = %err, "rollback of uploaded image failed");
                    }
                }
                return Err(e);
            }
        }
    }
    Ok(stored)
}

/// Fire-and-forget removal; failures are logged, never retried.
pub fn delete_best_effort(store: std::sync::Arc<dyn ImageStore>, public_ids: Vec<String>) {
    if public_ids.is_empty() {
        return;
    }
    tokio::spawn(async move {
        let results = futures::future::join_all(public_ids.iter().map(|id| store.delete(id))).await;
        for (id, result) in public_ids.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!(public_id = %id, error = %e, "image delete failed");
            }
        }
    });
}

pub struct CloudinaryStore {
    config: CloudinaryConfig,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct CloudinaryUpload {
    secure_url: String,
    public_id: String,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("https://api.cloudinary.com/v1_1/{}/{path}", self.config.cloud_name)
    }
}

#[async_trait]
impl ImageStore for CloudinaryStore {
    async fn upload(&self, image: ImageUpload, folder: &str) -> Result<ImageRef> {
        let part = reqwest::multipart::Part::bytes(image.bytes)
            .file_name(image.file_name)
            .mime_str(&image.content_type)?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("upload_preset", self.config.upload_preset.clone())
            .text("folder", format!("foodhub/{folder}"));

        let resp = self
            .http
            .post(self.endpoint("image/upload"))
            .multipart(form)
            .send()
            .await
            .context("cloudinary upload request failed")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("cloudinary upload rejected ({status}): {body}");
        }
        let uploaded: CloudinaryUpload = resp.json().await.context("cloudinary upload decode failed")?;
        tracing::debug!(public_id = %uploaded.public_id, "image uploaded");
        Ok(ImageRef {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<()> {
        let resp = self
            .http
            .delete(self.endpoint("resources/image/upload"))
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .query(&[("public_ids[]", public_id)])
            .send()
            .await
            .context("cloudinary delete request failed")?;
        if !resp.status().is_success() {
            bail!("cloudinary delete of {public_id} failed with {}", resp.status());
        }
        Ok(())
    }
}

pub struct LocalImageStore {
    root: PathBuf,
    base_url: String,
}

impl LocalImageStore {
    pub fn new(root: PathBuf, public_base_url: &str) -> Self {
        Self {
            root,
            base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn upload(&self, image: ImageUpload, folder: &str) -> Result<ImageRef> {
        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
        let public_id = format!("{folder}/{}.{}", new_id(), image.extension());
        tokio::fs::write(self.root.join(&public_id), &image.bytes)
            .await
            .with_context(|| format!("writing {public_id}"))?;
        Ok(ImageRef {
            url: format!("{}/uploads/{public_id}", self.base_url),
            public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<()> {
        if public_id.contains("..") {
            bail!("refusing to delete {public_id}");
        }
        tokio::fs::remove_file(self.root.join(public_id))
            .await
            .with_context(|| format!("removing {public_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png() -> ImageUpload {
        ImageUpload {
            file_name: "dish.png".into(),
            content_type: "image/png".into(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[tokio::test]
    async fn local_store_writes_and_removes() {
        let root = std::env::temp_dir().join(format!("foodhub-img-{}", new_id()));
        let store = LocalImageStore::new(root.clone(), "http://localhost:5000/");

        let stored = store.upload(png(), "menu").await.unwrap();
        assert!(stored.public_id.starts_with("menu/"));
        assert!(stored.public_id.ends_with(".png"));
        assert!(stored.url.starts_with("http://localhost:5000/uploads/menu/"));
        assert!(root.join(&stored.public_id).exists());

        store.delete(&stored.public_id).await.unwrap();
        assert!(!root.join(&stored.public_id).exists());
        assert!(store.delete("../etc/passwd").await.is_err());
        let _ = std::fs::remove_dir_all(root);
    }
}
