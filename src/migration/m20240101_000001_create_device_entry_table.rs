use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeviceEntry::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeviceEntry::Key)
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DeviceEntry::Value).blob().not_null())
                    .col(
                        ColumnDef::new(DeviceEntry::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeviceEntry::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DeviceEntry {
    Table,
    Key,
    Value,
    UpdatedAt,
}
