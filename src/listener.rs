//! Live collection listeners.
//!
//! A [`LiveCollection`] mirrors one path of the realtime store. Every snapshot
//! replaces the whole materialized list; mutators write straight to the store
//! and the authoritative list arrives with the next snapshot.
//!
//! Each collection owns at most one subscription. Changing the path releases
//! the previous subscription before opening the next one, and dropping the
//! collection releases it too. Callbacks check a guard created at subscribe
//! time before touching state, so a callback racing a release is a no-op.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::backend::{ListenerHandle, RealtimeStore, Snapshot, SnapshotCallback};
use crate::error::{Error, Result};
use crate::model::Entity;
use crate::path;

/// What a screen renders for a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionView<T> {
    pub items: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> CollectionView<T> {
    pub(crate) fn idle() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            error: None,
        }
    }

    pub(crate) fn loading() -> Self {
        Self {
            items: Vec::new(),
            loading: true,
            error: None,
        }
    }
}

/// Decodes every child of `snapshot`, assigning its key as the identifier.
///
/// Children that fail to decode are skipped and reported.
pub fn materialize<T: Entity>(snapshot: &Snapshot) -> (Vec<T>, Vec<String>) {
    let mut items = Vec::new();
    let mut failures = Vec::new();
    for (key, value) in snapshot.children() {
        match T::deserialize(value) {
            Ok(mut item) => {
                item.assign_id(key);
                items.push(item);
            }
            Err(e) => failures.push(format!("{key}: {e}")),
        }
    }
    T::complete(&mut items);
    items.sort_by(T::compare);
    (items, failures)
}

/// A subscription together with the guard its callback checks.
struct Subscription {
    path: String,
    active: Arc<AtomicBool>,
    _handle: ListenerHandle,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Runs before the handle is released.
        self.active.store(false, Ordering::SeqCst);
        debug!(path = %self.path, "subscription released");
    }
}

/// A live, locally sorted mirror of one realtime store path.
pub struct LiveCollection<T: Entity> {
    store: Arc<dyn RealtimeStore>,
    path: Option<String>,
    view: Arc<watch::Sender<CollectionView<T>>>,
    subscription: Option<Subscription>,
}

impl<T: Entity> LiveCollection<T> {
    /// A collection with no path: empty, not loading, not subscribed.
    pub fn detached(store: Arc<dyn RealtimeStore>) -> Self {
        let (view, _) = watch::channel(CollectionView::idle());
        Self {
            store,
            path: None,
            view: Arc::new(view),
            subscription: None,
        }
    }

    /// Opens a collection subscribed to `path`.
    pub async fn open(store: Arc<dyn RealtimeStore>, path: Option<&str>) -> Self {
        let mut collection = Self::detached(store);
        collection.set_path(path).await;
        collection
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn view(&self) -> CollectionView<T> {
        self.view.borrow().clone()
    }

    pub fn items(&self) -> Vec<T> {
        self.view.borrow().items.clone()
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.view.borrow().items.iter().find(|i| i.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.view.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.borrow().items.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.view.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.view.borrow().error.clone()
    }

    /// Receives every view change from now on.
    pub fn watch(&self) -> watch::Receiver<CollectionView<T>> {
        self.view.subscribe()
    }

    /// Points the collection at another path.
    ///
    /// The old subscription is released first. An empty or missing path
    /// leaves the collection idle and unsubscribed. Re-selecting the current
    /// path keeps the live subscription.
    pub async fn set_path(&mut self, path: Option<&str>) {
        let path = path.map(path::normalize).filter(|p| !p.is_empty());
        if path == self.path && (self.subscription.is_some() || path.is_none()) {
            return;
        }

        self.close();
        self.path.clone_from(&path);

        let Some(path) = path else {
            self.view.send_replace(CollectionView::idle());
            return;
        };

        self.view.send_replace(CollectionView::loading());
        let active = Arc::new(AtomicBool::new(true));
        let callback = snapshot_callback(path.clone(), Arc::clone(&active), Arc::clone(&self.view));

        match self.store.subscribe(&path, callback).await {
            Ok(handle) => {
                info!(%path, "subscription opened");
                self.subscription = Some(Subscription {
                    path,
                    active,
                    _handle: handle,
                });
            }
            Err(e) => {
                active.store(false, Ordering::SeqCst);
                error!(%path, error = %e, "could not attach listener");
                self.view.send_modify(|view| {
                    view.loading = false;
                    view.error = Some(e.to_string());
                });
            }
        }
    }

    /// Releases the subscription, keeping the last materialized list.
    pub fn close(&mut self) {
        self.subscription = None;
    }

    fn target(&self) -> Result<&str> {
        self.path
            .as_deref()
            .ok_or_else(|| Error::Mutation("collection has no path".into()))
    }

    /// Writes `value` under a new backend-assigned key and returns the key.
    pub async fn push_entry(&self, value: Value) -> Result<String> {
        let target = self.target()?;
        let id = self
            .store
            .push(target, value)
            .await
            .map_err(Error::into_mutation)?;
        debug!(path = %target, %id, "entry created");
        Ok(id)
    }

    /// Overwrites the given fields of entry `id`.
    pub async fn patch_entry(&self, id: &str, fields: Map<String, Value>) -> Result<()> {
        let target = path::join(self.target()?, id);
        self.store
            .update(&target, fields)
            .await
            .map_err(Error::into_mutation)?;
        debug!(path = %target, "entry updated");
        Ok(())
    }

    /// Deletes entry `id`.
    pub async fn remove_entry(&self, id: &str) -> Result<()> {
        let target = path::join(self.target()?, id);
        self.store
            .remove(&target)
            .await
            .map_err(Error::into_mutation)?;
        debug!(path = %target, "entry deleted");
        Ok(())
    }
}

impl<T: Entity + fmt::Debug> fmt::Debug for LiveCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveCollection")
            .field("path", &self.path)
            .field("subscribed", &self.subscription.is_some())
            .field("view", &*self.view.borrow())
            .finish()
    }
}

fn snapshot_callback<T: Entity>(
    path: String,
    active: Arc<AtomicBool>,
    view: Arc<watch::Sender<CollectionView<T>>>,
) -> SnapshotCallback {
    // The guard is re-read under the view's write lock, after which a
    // released subscription can no longer publish.
    Arc::new(move |event: Result<Snapshot>| {
        if !active.load(Ordering::SeqCst) {
            return;
        }
        match event {
            Ok(snapshot) => {
                let (items, failures) = materialize::<T>(&snapshot);
                if !failures.is_empty() {
                    warn!(%path, skipped = failures.len(), "undecodable entries skipped");
                }
                let count = items.len();
                let error = (!failures.is_empty())
                    .then(|| format!("could not read entries: {}", failures.join("; ")));
                let applied = view.send_if_modified(|view| {
                    if !active.load(Ordering::SeqCst) {
                        return false;
                    }
                    *view = CollectionView {
                        items,
                        loading: false,
                        error,
                    };
                    true
                });
                if applied {
                    debug!(%path, items = count, "snapshot received");
                }
            }
            Err(e) => {
                error!(%path, error = %e, "subscription error");
                let message = if matches!(e, Error::Subscription(_)) {
                    e.to_string()
                } else {
                    Error::Subscription(e.to_string()).to_string()
                };
                view.send_if_modified(|view| {
                    if !active.load(Ordering::SeqCst) {
                        return false;
                    }
                    view.loading = false;
                    view.error = Some(message);
                    true
                });
            }
        }
    })
}
