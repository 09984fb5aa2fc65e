//! Database entity models for the SQL-backed device storage.
//!
//! These Sea-ORM entities define the schema the [`SeaOrmDeviceStorage`]
//! reads and writes.
//!
//! [`SeaOrmDeviceStorage`]: crate::SeaOrmDeviceStorage

/// Key-value entry entity for Sea-ORM database interaction.
///
/// One row per device storage key, holding the raw bytes written under it.
pub mod device_entry;
