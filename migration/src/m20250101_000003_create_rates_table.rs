use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(Rates::Table)
                .if_not_exists()
                .col(ColumnDef::new(Rates::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(Rates::OriginCountry).string_len(2).not_null())
                .col(ColumnDef::new(Rates::DestinationCountry).string_len(2).not_null())
                .col(ColumnDef::new(Rates::Rate).decimal_len(24, 10).not_null())
                .col(
                    ColumnDef::new(Rates::Operation)
                        .string_len(10)
                        .not_null()
                        .default("multiply")
                )
                .col(ColumnDef::new(Rates::Currency).string_len(10).not_null())
                .col(
                    ColumnDef::new(Rates::UpdatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .extra("DEFAULT NOW()".to_string())
                )
                .to_owned()
        ).await?;

        // Rates are directional: one row per ordered pair
        manager.create_index(
            Index::create()
                .name("idx_rates_route")
                .table(Rates::Table)
                .col(Rates::OriginCountry)
                .col(Rates::DestinationCountry)
                .unique()
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Rates::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Rates {
    Table,
    Id,
    OriginCountry,
    DestinationCountry,
    Rate,
    Operation,
    Currency,
    UpdatedAt,
}
