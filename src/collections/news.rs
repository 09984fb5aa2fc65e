use std::sync::Arc;

use serde::Serialize;

use super::{create_in, delete_in, trimmed, update_in};
use crate::backend::RealtimeStore;
use crate::error::{Error, Result};
use crate::listener::LiveCollection;
use crate::model::NewsItem;

pub const NEWS_PATH: &str = "news";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewsDraft {
    pub title: String,
}

impl NewsDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    pub fn validated(&self) -> Result<Self> {
        let title = trimmed(&self.title)
            .ok_or_else(|| Error::Validation("Introduza o texto da notícia.".into()))?;
        Ok(Self { title })
    }
}

/// Footer news, newest first.
pub struct News {
    collection: LiveCollection<NewsItem>,
}

impl News {
    pub async fn open(store: Arc<dyn RealtimeStore>) -> Self {
        Self {
            collection: LiveCollection::open(store, Some(NEWS_PATH)).await,
        }
    }

    pub fn collection(&self) -> &LiveCollection<NewsItem> {
        &self.collection
    }

    pub fn items(&self) -> Vec<NewsItem> {
        self.collection.items()
    }

    pub async fn create(&self, draft: &NewsDraft) -> Result<String> {
        create_in(&self.collection, &draft.validated()?).await
    }

    pub async fn update(&self, id: &str, draft: &NewsDraft) -> Result<()> {
        update_in(&self.collection, id, &draft.validated()?).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        delete_in(&self.collection, id).await
    }
}
