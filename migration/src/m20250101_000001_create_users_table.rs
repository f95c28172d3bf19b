use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(Users::Table)
                .if_not_exists()
                .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(Users::Phone).string_len(20).not_null().unique_key())
                .col(ColumnDef::new(Users::Email).string().null().unique_key())
                .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                .col(ColumnDef::new(Users::FirstName).string_len(100).null())
                .col(ColumnDef::new(Users::LastName).string_len(100).null())
                .col(ColumnDef::new(Users::CountryCode).string_len(2).null())
                .col(
                    ColumnDef::new(Users::Role)
                        .string_len(20)
                        .not_null()
                        .default("usuario")
                )
                .col(
                    ColumnDef::new(Users::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .extra("DEFAULT NOW()".to_string())
                )
                .col(
                    ColumnDef::new(Users::UpdatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .extra("DEFAULT NOW()".to_string())
                )
                .to_owned()
        ).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Users::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Phone,
    Email,
    PasswordHash,
    FirstName,
    LastName,
    CountryCode,
    Role,
    CreatedAt,
    UpdatedAt,
}
