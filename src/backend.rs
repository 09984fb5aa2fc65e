//! Contracts for the external backends this client talks to.
//!
//! The crate never owns any of these systems. Each trait mirrors the subset of
//! the backend SDK the backoffice relies on, so production adapters and the
//! in-process [`memory`](crate::memory) backends are interchangeable.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;

/// Credential returned by the identity backend after a successful sign-in.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityToken {
    /// Opaque bearer token used for authenticated calls.
    pub id_token: String,
    /// Long-lived token for refreshing `id_token`, when the backend issues one.
    pub refresh_token: Option<String>,
    /// Backend identifier of the signed-in account.
    pub user_id: String,
    /// Email address the backend associates with the account.
    pub email: String,
    /// Lifetime of `id_token` as reported by the backend.
    pub expires_in: Option<Duration>,
}

impl fmt::Debug for IdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityToken")
            .field("id_token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Exchanges email and password for a session credential.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Performs a single sign-in attempt.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<IdentityToken>;
}

/// The complete contents of a path at notification time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    path: String,
    value: Option<Value>,
}

impl Snapshot {
    pub fn new(path: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            path: path.into(),
            value: value.filter(|v| !v.is_null()),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn exists(&self) -> bool {
        self.value.is_some()
    }

    /// Direct children keyed by their backend-assigned identifiers.
    ///
    /// Arrays are exposed under their index, skipping holes, the way the
    /// realtime database reports sparse numeric keys.
    pub fn children(&self) -> Vec<(String, &Value)> {
        match &self.value {
            Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .filter(|(_, v)| !v.is_null())
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Callback invoked with every snapshot push or subscription failure.
pub type SnapshotCallback = Arc<dyn Fn(Result<Snapshot>) + Send + Sync>;

/// Releases a backend subscription when dropped.
///
/// Dropping the handle is the only way to detach a listener, so release
/// happens on every exit path of the owner.
pub struct ListenerHandle {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl ListenerHandle {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Releases the subscription now.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// Tree-structured realtime database addressed by slash-delimited paths.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Attaches a listener to `path`.
    ///
    /// The current contents are delivered as the first snapshot, then again
    /// after every change under the path.
    async fn subscribe(&self, path: &str, callback: SnapshotCallback) -> Result<ListenerHandle>;

    /// Writes `value` under a fresh backend-assigned key and returns the key.
    async fn push(&self, path: &str, value: Value) -> Result<String>;

    /// Replaces the value at `path`.
    async fn set(&self, path: &str, value: Value) -> Result<()>;

    /// Overwrites the given children of `path`; `null` children are removed.
    async fn update(&self, path: &str, values: Map<String, Value>) -> Result<()>;

    /// Deletes the value at `path`.
    async fn remove(&self, path: &str) -> Result<()>;
}

/// Metadata for one object in the storage backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub name: String,
    pub full_path: String,
    pub size: u64,
    pub content_type: Option<String>,
    pub time_created: Option<String>,
    pub updated: Option<String>,
}

/// Folder-addressed object storage.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Lists the objects directly inside `folder`.
    async fn list(&self, folder: &str) -> Result<Vec<ObjectMetadata>>;

    /// Resolves a public download URL for the object at `path`.
    async fn download_url(&self, path: &str) -> Result<String>;

    /// Stores `bytes` at `path`, replacing any existing object.
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<ObjectMetadata>;

    /// Deletes the object at `path`.
    async fn delete(&self, path: &str) -> Result<()>;
}

/// Key-value storage local to the device, used to keep the session across
/// restarts.
#[async_trait]
pub trait DeviceStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn children_of_object_and_sparse_array() {
        let snapshot = Snapshot::new("news", Some(json!({"a": {"title": "x"}, "b": 1})));
        let keys: Vec<_> = snapshot.children().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);

        let sparse = Snapshot::new("list", Some(json!([null, "one", null, "three"])));
        let keys: Vec<_> = sparse.children().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["1", "3"]);
    }

    #[test]
    fn null_snapshot_does_not_exist() {
        let snapshot = Snapshot::new("employees", Some(Value::Null));
        assert!(!snapshot.exists());
        assert!(snapshot.children().is_empty());
    }

    #[test]
    fn listener_handle_releases_once_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let handle = ListenerHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        handle.release();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
