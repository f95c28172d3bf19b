use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One live row per phone: the phone itself is the key.
        manager.create_table(
            Table::create()
                .table(PendingCodes::Table)
                .if_not_exists()
                .col(ColumnDef::new(PendingCodes::Phone).string_len(20).not_null().primary_key())
                .col(ColumnDef::new(PendingCodes::Purpose).string_len(20).not_null())
                .col(ColumnDef::new(PendingCodes::Code).string_len(6).not_null())
                .col(ColumnDef::new(PendingCodes::ExpiresAt).timestamp_with_time_zone().not_null())
                .col(ColumnDef::new(PendingCodes::PasswordHash).string().null())
                .col(ColumnDef::new(PendingCodes::CountryCode).string_len(2).null())
                .col(ColumnDef::new(PendingCodes::CountryName).string_len(60).null())
                .col(ColumnDef::new(PendingCodes::Sent).boolean().not_null().default(false))
                .col(
                    ColumnDef::new(PendingCodes::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .extra("DEFAULT NOW()".to_string())
                )
                .to_owned()
        ).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(PendingCodes::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum PendingCodes {
    Table,
    Phone,
    Purpose,
    Code,
    ExpiresAt,
    PasswordHash,
    CountryCode,
    CountryName,
    Sent,
    CreatedAt,
}
