use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::{create_in, created, delete_in, fields_of, trimmed, update_in, updated};
use crate::backend::{ObjectStorage, RealtimeStore};
use crate::error::{Error, Result};
use crate::images::ImageGallery;
use crate::listener::LiveCollection;
use crate::model::{Newsletter, NewsletterIssue, DEFAULT_NEWSLETTER_COLOR};
use crate::path;
use crate::upload::{UploadFile, UploadPolicy};

pub const NEWSLETTERS_PATH: &str = "newsletters";

fn issues_path(newsletter_id: &str) -> String {
    path::join(&path::join(NEWSLETTERS_PATH, newsletter_id), "issues")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterDraft {
    pub name: String,
    pub display_name: String,
    pub color: String,
}

impl NewsletterDraft {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            color: DEFAULT_NEWSLETTER_COLOR.to_string(),
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn validated(&self) -> Result<Self> {
        let missing = || Error::Validation("Nome e nome de exibição são obrigatórios.".into());
        Ok(Self {
            name: trimmed(&self.name).ok_or_else(missing)?,
            display_name: trimmed(&self.display_name).ok_or_else(missing)?,
            color: trimmed(&self.color).unwrap_or_else(|| DEFAULT_NEWSLETTER_COLOR.to_string()),
        })
    }
}

/// Form input for editing an existing newsletter.
///
/// The `name` chosen at creation keys the image folder and never changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterEdit {
    pub display_name: String,
    pub color: String,
}

impl NewsletterEdit {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            color: DEFAULT_NEWSLETTER_COLOR.to_string(),
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn validated(&self) -> Result<Self> {
        Ok(Self {
            display_name: trimmed(&self.display_name).ok_or_else(|| {
                Error::Validation("O nome de exibição é obrigatório.".into())
            })?,
            color: trimmed(&self.color).unwrap_or_else(|| DEFAULT_NEWSLETTER_COLOR.to_string()),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueDraft {
    pub title: String,
    pub description: String,
    pub published_at: String,
    pub url: String,
    pub cover_image_path: String,
}

impl IssueDraft {
    pub fn new(title: impl Into<String>, published_at: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            published_at: published_at.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_cover_image_path(mut self, cover_image_path: impl Into<String>) -> Self {
        self.cover_image_path = cover_image_path.into();
        self
    }

    pub fn validated(&self) -> Result<Self> {
        let missing =
            || Error::Validation("Título e data de publicação são obrigatórios.".into());
        Ok(Self {
            title: trimmed(&self.title).ok_or_else(missing)?,
            published_at: trimmed(&self.published_at).ok_or_else(missing)?,
            description: self.description.trim().to_string(),
            url: self.url.trim().to_string(),
            cover_image_path: self.cover_image_path.trim().to_string(),
        })
    }
}

/// The live newsletter list, including the built-in newsletters.
pub struct Newsletters {
    store: Arc<dyn RealtimeStore>,
    collection: LiveCollection<Newsletter>,
}

impl Newsletters {
    pub async fn open(store: Arc<dyn RealtimeStore>) -> Self {
        let collection = LiveCollection::open(Arc::clone(&store), Some(NEWSLETTERS_PATH)).await;
        Self { store, collection }
    }

    pub fn collection(&self) -> &LiveCollection<Newsletter> {
        &self.collection
    }

    pub fn items(&self) -> Vec<Newsletter> {
        self.collection.items()
    }

    pub fn get(&self, id: &str) -> Option<Newsletter> {
        self.collection.get(id)
    }

    pub async fn create(&self, draft: &NewsletterDraft) -> Result<String> {
        create_in(&self.collection, &draft.validated()?).await
    }

    /// Changes the display name and color. Built-in newsletters can be
    /// edited too; the edit is stored under their fixed id.
    pub async fn update(&self, id: &str, edit: &NewsletterEdit) -> Result<()> {
        update_in(&self.collection, id, &edit.validated()?).await
    }

    /// Deletes the newsletter together with all of its issues.
    pub async fn delete(&self, id: &str) -> Result<()> {
        delete_in(&self.collection, id).await
    }

    pub async fn add_issue(&self, newsletter_id: &str, draft: &IssueDraft) -> Result<String> {
        let body = created(fields_of(&draft.validated()?)?);
        let target = issues_path(checked_id(newsletter_id)?);
        self.store
            .push(&target, body)
            .await
            .map_err(Error::into_mutation)
    }

    pub async fn update_issue(
        &self,
        newsletter_id: &str,
        issue_id: &str,
        draft: &IssueDraft,
    ) -> Result<()> {
        let patch = updated(fields_of(&draft.validated()?)?);
        let target = path::join(&issues_path(checked_id(newsletter_id)?), checked_id(issue_id)?);
        self.store
            .update(&target, patch)
            .await
            .map_err(Error::into_mutation)
    }

    pub async fn delete_issue(&self, newsletter_id: &str, issue_id: &str) -> Result<()> {
        let target = path::join(&issues_path(checked_id(newsletter_id)?), checked_id(issue_id)?);
        self.store
            .remove(&target)
            .await
            .map_err(Error::into_mutation)
    }
}

fn checked_id(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() || id.contains('/') {
        Err(Error::Validation("Registo sem identificador.".into()))
    } else {
        Ok(id)
    }
}

/// The newsletter screen: the list, and the issues and images of the
/// selected newsletter.
///
/// Selecting another newsletter moves the issues listener and the image
/// gallery to the new paths; the previous issues subscription is released
/// before the next one opens.
pub struct NewsletterBoard {
    newsletters: Newsletters,
    issues: LiveCollection<NewsletterIssue>,
    gallery: ImageGallery,
    selected: Option<Newsletter>,
}

impl NewsletterBoard {
    pub async fn open(
        store: Arc<dyn RealtimeStore>,
        storage: Arc<dyn ObjectStorage>,
        policy: UploadPolicy,
    ) -> Self {
        Self {
            newsletters: Newsletters::open(Arc::clone(&store)).await,
            issues: LiveCollection::detached(store),
            gallery: ImageGallery::new(storage, policy),
            selected: None,
        }
    }

    pub fn newsletters(&self) -> &Newsletters {
        &self.newsletters
    }

    pub fn issues(&self) -> &LiveCollection<NewsletterIssue> {
        &self.issues
    }

    pub fn gallery(&self) -> &ImageGallery {
        &self.gallery
    }

    pub fn selected(&self) -> Option<&Newsletter> {
        self.selected.as_ref()
    }

    /// Selects a newsletter by id, or clears the selection with `None`.
    pub async fn select(&mut self, id: Option<&str>) -> Result<()> {
        let newsletter = match id {
            Some(id) => Some(
                self.newsletters
                    .get(id)
                    .ok_or_else(|| Error::Validation(format!("Newsletter desconhecida: {id}")))?,
            ),
            None => None,
        };

        let issues = newsletter.as_ref().map(|n| issues_path(&n.id));
        let folder = newsletter
            .as_ref()
            .map(Newsletter::image_folder)
            .unwrap_or_default();
        if let Some(n) = &newsletter {
            info!(newsletter = %n.name, "newsletter selected");
        }

        self.selected = newsletter;
        self.issues.set_path(issues.as_deref()).await;
        self.gallery.set_folder(&folder).await;
        Ok(())
    }

    /// Uploads a cover image for the selected newsletter and returns its
    /// storage path, ready for [`IssueDraft::with_cover_image_path`].
    pub async fn upload_cover(&self, file: UploadFile) -> Result<String> {
        let Some(newsletter) = &self.selected else {
            return Err(Error::Validation(
                "Selecione uma newsletter primeiro.".into(),
            ));
        };
        self.gallery.upload(file, Some(newsletter.name.as_str())).await
    }

    /// Deletes a newsletter, clearing the selection if it was selected.
    pub async fn delete_newsletter(&mut self, id: &str) -> Result<()> {
        self.newsletters.delete(id).await?;
        if self.selected.as_ref().is_some_and(|n| n.id == id) {
            self.select(None).await?;
        }
        Ok(())
    }
}
