//! In-process backends honouring the same contracts as the cloud services.
//!
//! Useful for tests, demos and offline development. The realtime store keeps a
//! JSON tree and re-fires full-subtree snapshots to every listener whose path
//! is an ancestor or descendant of a write.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::backend::{
    DeviceStorage, IdentityBackend, IdentityToken, ListenerHandle, ObjectMetadata, ObjectStorage,
    RealtimeStore, Snapshot, SnapshotCallback,
};
use crate::error::{Error, Result};
use crate::path;

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn split(path: &str) -> Vec<String> {
    path::segments(path).map(str::to_owned).collect()
}

/// Builds a 20 character key: 8 characters of timestamp, 12 of sequence.
///
/// Keys sort in creation order, which is what the realtime database's own
/// push identifiers guarantee.
fn push_id(millis: u64, seq: u64) -> String {
    let mut stamp = [0u8; 8];
    let mut t = millis;
    for slot in stamp.iter_mut().rev() {
        *slot = PUSH_CHARS[(t % 64) as usize];
        t /= 64;
    }
    let mut tail = [0u8; 12];
    let mut s = seq;
    for slot in tail.iter_mut().rev() {
        *slot = PUSH_CHARS[(s % 64) as usize];
        s /= 64;
    }
    stamp.iter().chain(tail.iter()).map(|&b| char::from(b)).collect()
}

fn strip_nulls(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| strip_nulls(v).map(|v| (k, v)))
                .collect();
            (!map.is_empty()).then_some(Value::Object(map))
        }
        other => Some(other),
    }
}

fn value_at<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(root, |node, segment| node.get(segment.as_str()))
}

fn write_at(node: &mut Value, segments: &[String], value: Option<Value>) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value.unwrap_or(Value::Null);
        return;
    };
    if !node.is_object() {
        if value.is_none() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = node else {
        return;
    };
    if rest.is_empty() {
        match value {
            Some(v) => {
                map.insert(head.clone(), v);
            }
            None => {
                map.remove(head);
            }
        }
        return;
    }
    let child = map.entry(head.clone()).or_insert(Value::Null);
    write_at(child, rest, value);
    if child.is_null() || child.as_object().is_some_and(Map::is_empty) {
        map.remove(head);
    }
}

struct Listener {
    id: u64,
    path: Vec<String>,
    callback: SnapshotCallback,
}

#[derive(Default)]
struct TreeState {
    root: Value,
    listeners: Vec<Listener>,
    next_listener: u64,
    failure: Option<Error>,
}

impl TreeState {
    fn snapshot(&self, segments: &[String]) -> Snapshot {
        Snapshot::new(segments.join("/"), value_at(&self.root, segments).cloned())
    }

    fn affected(&self, written: &[String]) -> Vec<(SnapshotCallback, Snapshot)> {
        self.listeners
            .iter()
            .filter(|l| {
                path::is_ancestor_or_self(&l.path, written)
                    || path::is_ancestor_or_self(written, &l.path)
            })
            .map(|l| (Arc::clone(&l.callback), self.snapshot(&l.path)))
            .collect()
    }
}

struct TreeInner {
    state: Mutex<TreeState>,
    // Serializes deliveries so listeners observe snapshots in write order.
    delivery: Mutex<()>,
    push_seq: AtomicU64,
}

/// In-memory realtime database.
#[derive(Clone)]
pub struct MemoryRealtimeStore {
    inner: Arc<TreeInner>,
}

impl Default for MemoryRealtimeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRealtimeStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TreeInner {
                state: Mutex::new(TreeState::default()),
                delivery: Mutex::new(()),
                push_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Seeds the tree with `value` at `path` before any listener attaches.
    pub fn with_value(self, path: &str, value: Value) -> Self {
        let segments = split(path);
        write_at(&mut lock(&self.inner.state).root, &segments, strip_nulls(value));
        self
    }

    /// Makes every subsequent write fail with `error` until cleared.
    pub fn fail_writes_with(&self, error: Option<Error>) {
        lock(&self.inner.state).failure = error;
    }

    /// Delivers `error` to listeners attached exactly at `path`, as if their
    /// connection was lost.
    pub fn emit_error(&self, path: &str, error: Error) {
        let segments = split(path);
        let _delivery = lock(&self.inner.delivery);
        let callbacks: Vec<SnapshotCallback> = lock(&self.inner.state)
            .listeners
            .iter()
            .filter(|l| l.path == segments)
            .map(|l| Arc::clone(&l.callback))
            .collect();
        for callback in callbacks {
            callback(Err(error.clone()));
        }
    }

    /// Number of listeners currently attached exactly at `path`.
    pub fn listener_count(&self, path: &str) -> usize {
        let segments = split(path);
        lock(&self.inner.state)
            .listeners
            .iter()
            .filter(|l| l.path == segments)
            .count()
    }

    /// Current value at `path`.
    pub fn value(&self, path: &str) -> Option<Value> {
        let segments = split(path);
        value_at(&lock(&self.inner.state).root, &segments)
            .filter(|v| !v.is_null())
            .cloned()
    }

    fn write(&self, path: &str, apply: impl FnOnce(&mut Value)) -> Result<()> {
        let segments = split(path);
        let _delivery = lock(&self.inner.delivery);
        let deliveries = {
            let mut state = lock(&self.inner.state);
            if let Some(error) = state.failure.clone() {
                return Err(error);
            }
            apply(&mut state.root);
            state.affected(&segments)
        };
        for (callback, snapshot) in deliveries {
            callback(Ok(snapshot));
        }
        Ok(())
    }

    fn next_key(&self) -> String {
        let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        push_id(millis, self.inner.push_seq.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl RealtimeStore for MemoryRealtimeStore {
    async fn subscribe(&self, path: &str, callback: SnapshotCallback) -> Result<ListenerHandle> {
        let segments = split(path);
        let _delivery = lock(&self.inner.delivery);
        let (id, initial) = {
            let mut state = lock(&self.inner.state);
            let id = state.next_listener;
            state.next_listener += 1;
            state.listeners.push(Listener {
                id,
                path: segments.clone(),
                callback: Arc::clone(&callback),
            });
            (id, state.snapshot(&segments))
        };
        callback(Ok(initial));

        let inner = Arc::downgrade(&self.inner);
        Ok(ListenerHandle::new(move || {
            if let Some(inner) = inner.upgrade() {
                lock(&inner.state).listeners.retain(|l| l.id != id);
            }
        }))
    }

    async fn push(&self, path: &str, value: Value) -> Result<String> {
        let key = self.next_key();
        let target = path::join(path, &key);
        let segments = split(&target);
        self.write(&target, |root| write_at(root, &segments, strip_nulls(value)))?;
        Ok(key)
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        let segments = split(path);
        self.write(path, |root| write_at(root, &segments, strip_nulls(value)))
    }

    async fn update(&self, path: &str, values: Map<String, Value>) -> Result<()> {
        let base = split(path);
        self.write(path, |root| {
            for (key, value) in values {
                let mut segments = base.clone();
                segments.extend(path::segments(&key).map(str::to_owned));
                write_at(root, &segments, strip_nulls(value));
            }
        })
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let segments = split(path);
        self.write(path, |root| write_at(root, &segments, None))
    }
}

struct StoredObject {
    metadata: ObjectMetadata,
    bytes: Vec<u8>,
}

/// In-memory object storage.
#[derive(Clone, Default)]
pub struct MemoryObjectStorage {
    objects: Arc<Mutex<BTreeMap<String, StoredObject>>>,
    calls: Arc<AtomicUsize>,
    failure: Arc<Mutex<Option<Error>>>,
}

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of backend calls made so far, across all operations.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Makes every subsequent call fail with `error` until cleared.
    pub fn fail_with(&self, error: Option<Error>) {
        *lock(&self.failure) = error;
    }

    /// Stored bytes of the object at `path`.
    pub fn bytes(&self, path: &str) -> Option<Vec<u8>> {
        lock(&self.objects)
            .get(&path::normalize(path))
            .map(|o| o.bytes.clone())
    }

    fn begin(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match lock(&self.failure).clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn list(&self, folder: &str) -> Result<Vec<ObjectMetadata>> {
        self.begin()?;
        let folder = path::normalize(folder);
        Ok(lock(&self.objects)
            .iter()
            .filter(|(full_path, _)| {
                full_path
                    .rsplit_once('/')
                    .map_or(folder.is_empty(), |(parent, _)| parent == folder)
            })
            .map(|(_, object)| object.metadata.clone())
            .collect())
    }

    async fn download_url(&self, path: &str) -> Result<String> {
        self.begin()?;
        let path = path::normalize(path);
        if lock(&self.objects).contains_key(&path) {
            Ok(format!("memory://{path}"))
        } else {
            Err(Error::Mutation(format!("object not found: {path}")))
        }
    }

    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<ObjectMetadata> {
        self.begin()?;
        let full_path = path::normalize(path);
        let now = now_iso();
        let mut objects = lock(&self.objects);
        let time_created = objects
            .get(&full_path)
            .and_then(|o| o.metadata.time_created.clone())
            .unwrap_or_else(|| now.clone());
        let metadata = ObjectMetadata {
            name: path::file_name(&full_path).to_owned(),
            full_path: full_path.clone(),
            size: bytes.len() as u64,
            content_type: Some(content_type.to_owned()),
            time_created: Some(time_created),
            updated: Some(now),
        };
        objects.insert(
            full_path,
            StoredObject {
                metadata: metadata.clone(),
                bytes,
            },
        );
        Ok(metadata)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.begin()?;
        let path = path::normalize(path);
        match lock(&self.objects).remove(&path) {
            Some(_) => Ok(()),
            None => Err(Error::Mutation(format!("object not found: {path}"))),
        }
    }
}

/// In-memory device key-value storage.
#[derive(Clone, Default)]
pub struct MemoryDeviceStorage {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    read_only: Arc<Mutex<bool>>,
}

impl MemoryDeviceStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes writes and removals fail, as a full or locked device store would.
    pub fn set_read_only(&self, read_only: bool) {
        *lock(&self.read_only) = read_only;
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.entries).contains_key(key)
    }

    fn writable(&self) -> Result<()> {
        if *lock(&self.read_only) {
            Err(Error::Storage("device storage is read-only".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DeviceStorage for MemoryDeviceStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.writable()?;
        lock(&self.entries).insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.writable()?;
        lock(&self.entries).remove(key);
        Ok(())
    }
}

/// In-memory identity backend with a fixed set of accounts.
#[derive(Clone, Default)]
pub struct MemoryIdentity {
    accounts: Arc<Mutex<HashMap<String, String>>>,
    issued: Arc<AtomicU64>,
    calls: Arc<AtomicUsize>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, email: &str, password: &str) -> Self {
        lock(&self.accounts).insert(email.to_owned(), password.to_owned());
        self
    }

    /// Number of sign-in attempts that reached this backend.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityBackend for MemoryIdentity {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<IdentityToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let known = lock(&self.accounts).get(email).is_some_and(|p| p == password);
        if !known {
            return Err(Error::Authentication("INVALID_LOGIN_CREDENTIALS".into()));
        }
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(IdentityToken {
            id_token: format!("memory-token-{n}"),
            refresh_token: Some(format!("memory-refresh-{n}")),
            user_id: format!("uid-{email}"),
            email: email.to_owned(),
            expires_in: Some(std::time::Duration::from_secs(3600)),
        })
    }
}
