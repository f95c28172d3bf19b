use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(Transactions::Table)
                .if_not_exists()
                .col(ColumnDef::new(Transactions::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(Transactions::UserId).uuid().not_null())
                .col(ColumnDef::new(Transactions::OriginCountry).string_len(2).not_null())
                .col(ColumnDef::new(Transactions::DestinationCountry).string_len(2).not_null())
                .col(ColumnDef::new(Transactions::Amount).decimal_len(20, 2).not_null())
                .col(ColumnDef::new(Transactions::Rate).decimal_len(24, 10).not_null())
                .col(ColumnDef::new(Transactions::Operation).string_len(10).not_null())
                .col(ColumnDef::new(Transactions::Currency).string_len(10).not_null())
                .col(ColumnDef::new(Transactions::ReceivedAmount).big_integer().not_null())
                .col(ColumnDef::new(Transactions::PaymentMethodOriginId).uuid().null())
                .col(ColumnDef::new(Transactions::PaymentMethodDestinationId).uuid().null())
                .col(ColumnDef::new(Transactions::PaymentReference).string().null())
                .col(ColumnDef::new(Transactions::DestinationReferenceNumber).string().null())
                .col(ColumnDef::new(Transactions::AdminReferenceNumber).string().null())
                .col(ColumnDef::new(Transactions::Status).string_len(30).not_null())
                .col(
                    ColumnDef::new(Transactions::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .extra("DEFAULT NOW()".to_string())
                )
                .col(
                    ColumnDef::new(Transactions::UpdatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .extra("DEFAULT NOW()".to_string())
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_transactions_user")
                        .from(Transactions::Table, Transactions::UserId)
                        .to(Users::Table, Users::Id)
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_transactions_origin_method")
                        .from(Transactions::Table, Transactions::PaymentMethodOriginId)
                        .to(PaymentMethodsOrigin::Table, PaymentMethodsOrigin::Id)
                        .on_delete(ForeignKeyAction::SetNull)
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_transactions_destination_method")
                        .from(Transactions::Table, Transactions::PaymentMethodDestinationId)
                        .to(UserPaymentMethods::Table, UserPaymentMethods::Id)
                        .on_delete(ForeignKeyAction::SetNull)
                )
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .name("idx_transactions_user_id")
                .table(Transactions::Table)
                .col(Transactions::UserId)
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .name("idx_transactions_status")
                .table(Transactions::Table)
                .col(Transactions::Status)
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .name("idx_transactions_created_at")
                .table(Transactions::Table)
                .col(Transactions::CreatedAt)
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Transactions::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    UserId,
    OriginCountry,
    DestinationCountry,
    Amount,
    Rate,
    Operation,
    Currency,
    ReceivedAmount,
    PaymentMethodOriginId,
    PaymentMethodDestinationId,
    PaymentReference,
    DestinationReferenceNumber,
    AdminReferenceNumber,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum PaymentMethodsOrigin {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum UserPaymentMethods {
    Table,
    Id,
}
