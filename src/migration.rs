//! Schema migrations for the SQL-backed device storage.

pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_device_entry_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    // Keep our bookkeeping apart from the host application's migrations
    fn migration_table_name() -> sea_orm::DynIden {
        Alias::new("backoffice_device_migrations").into_iden()
    }

    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20240101_000001_create_device_entry_table::Migration)]
    }
}
