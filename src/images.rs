//! Image galleries backed by object storage.
//!
//! Storage has no push notifications, so the gallery lists its folder on
//! demand and reloads after every upload or delete.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::{ObjectMetadata, ObjectStorage};
use crate::error::{Error, Result};
use crate::listener::CollectionView;
use crate::model::ImageItem;
use crate::path;
use crate::upload::{object_name, UploadFile, UploadPolicy};

/// The images of one storage folder, newest first.
///
/// Switching folders bumps a generation counter; a listing that finishes
/// after a newer reload started is discarded.
pub struct ImageGallery {
    storage: Arc<dyn ObjectStorage>,
    policy: UploadPolicy,
    folder: Mutex<String>,
    generation: AtomicU64,
    view: watch::Sender<CollectionView<ImageItem>>,
}

impl ImageGallery {
    /// A gallery with no folder selected.
    pub fn new(storage: Arc<dyn ObjectStorage>, policy: UploadPolicy) -> Self {
        let (view, _) = watch::channel(CollectionView::idle());
        Self {
            storage,
            policy,
            folder: Mutex::new(String::new()),
            generation: AtomicU64::new(0),
            view,
        }
    }

    /// Opens a gallery on `folder` and loads it.
    pub async fn open(
        storage: Arc<dyn ObjectStorage>,
        policy: UploadPolicy,
        folder: &str,
    ) -> Self {
        let gallery = Self::new(storage, policy);
        gallery.set_folder(folder).await;
        gallery
    }

    pub fn folder(&self) -> String {
        self.folder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub fn view(&self) -> CollectionView<ImageItem> {
        self.view.borrow().clone()
    }

    pub fn items(&self) -> Vec<ImageItem> {
        self.view.borrow().items.clone()
    }

    pub fn watch(&self) -> watch::Receiver<CollectionView<ImageItem>> {
        self.view.subscribe()
    }

    /// Switches to `folder` and reloads. An empty folder clears the gallery.
    pub async fn set_folder(&self, folder: &str) {
        *self.folder.lock().unwrap_or_else(PoisonError::into_inner) = path::normalize(folder);
        self.reload().await;
    }

    /// Lists the current folder again.
    ///
    /// Failures are captured into the view's `error`.
    pub async fn reload(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let folder = self.folder();
        if folder.is_empty() {
            self.view.send_replace(CollectionView::idle());
            return;
        }

        self.view.send_modify(|view| {
            view.loading = true;
            view.error = None;
        });

        let result = self.list(&folder).await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(%folder, "discarding stale image listing");
            return;
        }
        match result {
            Ok(items) => {
                debug!(%folder, items = items.len(), "images loaded");
                self.view.send_replace(CollectionView {
                    items,
                    loading: false,
                    error: None,
                });
            }
            Err(e) => {
                warn!(%folder, error = %e, "could not load images");
                self.view.send_modify(|view| {
                    view.loading = false;
                    view.error = Some(format!("Erro ao carregar imagens: {e}"));
                });
            }
        }
    }

    async fn list(&self, folder: &str) -> Result<Vec<ImageItem>> {
        let objects = self.storage.list(folder).await?;
        let mut items = Vec::with_capacity(objects.len());
        for object in objects {
            let url = self.storage.download_url(&object.full_path).await?;
            items.push(image_item(object, url));
        }
        items.sort_by(ImageItem::compare);
        Ok(items)
    }

    /// Validates and uploads `file` into the current folder, then reloads.
    ///
    /// Nothing is sent to storage when validation fails. The stored name is
    /// `{prefix_}{unix_millis}_{file name}`; the full object path is
    /// returned.
    pub async fn upload(&self, file: UploadFile, prefix: Option<&str>) -> Result<String> {
        let content_type = self.policy.check(&file)?;
        let folder = self.folder();
        if folder.is_empty() {
            return Err(Error::Validation(
                "Selecione uma pasta de imagens primeiro.".into(),
            ));
        }

        let name = object_name(prefix, Utc::now().timestamp_millis(), &file.name);
        let target = path::join(&folder, &name);
        self.storage
            .upload(&target, file.bytes, &content_type)
            .await
            .map_err(Error::into_mutation)?;
        info!(path = %target, "image uploaded");

        self.reload().await;
        Ok(target)
    }

    /// Deletes the object at `object_path`, then reloads.
    pub async fn delete(&self, object_path: &str) -> Result<()> {
        if path::normalize(object_path).is_empty() {
            return Err(Error::Validation("Imagem sem caminho.".into()));
        }
        self.storage
            .delete(object_path)
            .await
            .map_err(Error::into_mutation)?;
        info!(path = %object_path, "image deleted");

        self.reload().await;
        Ok(())
    }
}

fn image_item(object: ObjectMetadata, url: String) -> ImageItem {
    ImageItem {
        id: object.name.clone(),
        name: object.name,
        url,
        path: object.full_path,
        size: object.size,
        content_type: object
            .content_type
            .unwrap_or_else(|| "image/jpeg".to_string()),
        created_at: object.time_created,
        updated_at: object.updated,
    }
}
