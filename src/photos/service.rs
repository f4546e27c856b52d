use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use log::{info, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    auth::UserContext,
    db::{helpers::format_date, models::ProgressPhoto, Database},
};

use super::BlobStore;

pub const SIGNED_URL_TTL_SECS: u64 = 3600;

/// A stored photo plus a short-lived link to its bytes. `url` is `None` when signing failed.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoView {
    pub photo: ProgressPhoto,
    pub url: Option<String>,
}

pub struct PhotoService<B: BlobStore> {
    db: Database,
    blobs: Arc<B>,
}

impl<B: BlobStore> Clone for PhotoService<B> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            blobs: Arc::clone(&self.blobs),
        }
    }
}

impl<B: BlobStore> PhotoService<B> {
    pub fn new(db: Database, blobs: Arc<B>) -> Self {
        Self { db, blobs }
    }

    pub async fn upload(
        &self,
        ctx: &UserContext,
        taken_on: NaiveDate,
        bytes: Vec<u8>,
    ) -> Result<ProgressPhoto> {
        if bytes.is_empty() {
            bail!("photo is empty");
        }

        let path = format!("{}/{}/{}.jpg", ctx.user_id, format_date(taken_on), Uuid::new_v4());
        let storage_path = self
            .blobs
            .upload(&path, bytes)
            .await
            .with_context(|| format!("Failed to upload photo to {path}"))?;

        let photo = ProgressPhoto {
            id: Uuid::new_v4().to_string(),
            owner_id: ctx.user_id.clone(),
            taken_on,
            storage_path,
            created_at: Utc::now(),
        };
        if let Err(err) = self.db.insert_photo(&photo).await {
            // Orphaned blobs are invisible, so cleanup is best effort.
            if let Err(cleanup) = self.blobs.remove(&photo.storage_path).await {
                warn!("Could not remove orphaned photo {}: {cleanup:#}", photo.storage_path);
            }
            return Err(err);
        }

        info!("Stored progress photo {} for {}", photo.id, ctx.user_id);
        Ok(photo)
    }

    /// The caller's photos, newest first, each with a signed link.
    pub async fn list(&self, ctx: &UserContext) -> Result<Vec<PhotoView>> {
        let photos = self.db.list_photos(&ctx.user_id).await?;
        let mut views = Vec::with_capacity(photos.len());
        for photo in photos {
            let url = match self
                .blobs
                .create_signed_url(&photo.storage_path, SIGNED_URL_TTL_SECS)
                .await
            {
                Ok(url) => Some(url),
                Err(err) => {
                    warn!("Could not sign {}: {err:#}", photo.storage_path);
                    None
                }
            };
            views.push(PhotoView { photo, url });
        }
        Ok(views)
    }

    /// Remove the blob, then the row. A failed blob removal keeps the row.
    pub async fn delete(&self, ctx: &UserContext, photo_id: &str) -> Result<()> {
        let photo = self
            .db
            .get_photo(photo_id)
            .await?
            .with_context(|| format!("photo {photo_id} not found"))?;
        if photo.owner_id != ctx.user_id {
            bail!("photo {photo_id} does not belong to {}", ctx.user_id);
        }

        self.blobs.remove(&photo.storage_path).await?;
        self.db.delete_photo(photo_id).await
    }
}
