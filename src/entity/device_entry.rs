//! Device storage entry model for Sea-ORM database interaction.
//!
//! Maps the `device_entry` table used to keep client-side key-value data,
//! such as the persisted session, across application restarts.

use sea_orm::entity::prelude::*;

/// Sea-ORM entity model representing one device storage entry.
///
/// # Database Schema
///
/// | Column     | Type               | Description                        |
/// |------------|--------------------|------------------------------------|
/// | key        | TEXT (Primary Key) | Storage key, e.g. `token`          |
/// | value      | BYTEA / BLOB       | Raw bytes stored under the key     |
/// | updated_at | TIMESTAMPTZ        | Time of the last write             |
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "device_entry")]
pub struct Model {
    /// The storage key. Primary key, chosen by the caller.
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub key: String,

    /// The stored bytes. Opaque to the storage layer; the session store
    /// writes MessagePack here.
    pub value: Vec<u8>,

    /// When the entry was last written.
    pub updated_at: DateTimeWithTimeZone,
}

/// This entity has no relations.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
