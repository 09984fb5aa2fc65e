//! # Backoffice Core
//!
//! Session lifecycle and live collection listeners for a backoffice client
//! built on a realtime database, object storage and an identity service.
//!
//! Staff sign in with email and password; the resulting session gates which
//! screens render and survives restarts through device storage. Once signed
//! in, screens open live collections (employees, footer news, newsletters)
//! that mirror the remote store and expose validated mutators, plus image
//! galleries over object storage.
//!
//! ## Features
//!
//! - A single [`AuthContext`] owning the session, with watch-based change
//!   notification and best-effort persistence
//! - [`CredentialExchange`] over any [`IdentityBackend`], with a
//!   [`FirebaseIdentity`] REST client
//! - [`LiveCollection`] with scoped subscriptions: one per collection,
//!   released on path change and on drop, with stale callbacks ignored
//! - Typed collections with required-field validation and last-write-wins
//!   updates
//! - Upload validation (JPEG/PNG, 5 MiB) before any network call
//! - [`SeaOrmDeviceStorage`] for persisting the session in PostgreSQL or
//!   SQLite, and in-process [`memory`] backends for tests and demos
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use backoffice_core::memory::{MemoryDeviceStorage, MemoryIdentity, MemoryRealtimeStore};
//! use backoffice_core::{
//!     AuthContext, CredentialExchange, EmployeeDraft, Employees, Screen, SessionStore,
//! };
//!
//! # async fn example() -> backoffice_core::Result<()> {
//! let auth = AuthContext::new(SessionStore::new(Arc::new(MemoryDeviceStorage::new())));
//! auth.restore().await;
//!
//! let identity = MemoryIdentity::new().with_account("staff@example.org", "secret");
//! let exchange = CredentialExchange::new(Arc::new(identity));
//! auth.sign_in(&exchange, "staff@example.org", "secret").await?;
//! assert_eq!(auth.screen(), Screen::Backoffice);
//!
//! let store = Arc::new(MemoryRealtimeStore::new());
//! let employees = Employees::open(store).await;
//! let draft = EmployeeDraft::new("Maria Santos", "2024", "2024-07-01");
//! let id = auth.check(employees.create(&draft).await).await?;
//! # let _ = id;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod backend;
pub mod collections;
pub mod config;
mod device_store;
pub mod entity;
mod error;
pub mod images;
pub mod listener;
pub mod memory;
#[cfg(feature = "migration")]
pub mod migration;
pub mod model;
pub mod path;
pub mod upload;

pub use auth::{
    AuthContext, AuthState, CredentialExchange, FirebaseIdentity, Screen, Session, SessionOrigin,
    SessionStore,
};
pub use backend::{
    DeviceStorage, IdentityBackend, IdentityToken, ListenerHandle, ObjectMetadata, ObjectStorage,
    RealtimeStore, Snapshot, SnapshotCallback,
};
pub use collections::{
    EmployeeDraft, Employees, IssueDraft, News, NewsDraft, NewsletterBoard, NewsletterDraft,
    NewsletterEdit, Newsletters,
};
pub use config::BackofficeConfig;

/// The Sea-ORM device storage implementation.
///
/// See [`SeaOrmDeviceStorage`] documentation for usage details.
pub use device_store::SeaOrmDeviceStorage;
pub use error::{Error, Result};
pub use images::ImageGallery;
pub use listener::{CollectionView, LiveCollection};
pub use model::{Employee, Entity, ImageItem, NewsItem, Newsletter, NewsletterIssue};
pub use upload::{UploadFile, UploadPolicy};
