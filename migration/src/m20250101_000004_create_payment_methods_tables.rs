use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(PaymentMethodsOrigin::Table)
                .if_not_exists()
                .col(ColumnDef::new(PaymentMethodsOrigin::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(PaymentMethodsOrigin::CountryCode).string_len(2).not_null())
                .col(ColumnDef::new(PaymentMethodsOrigin::Name).string_len(100).not_null())
                .col(ColumnDef::new(PaymentMethodsOrigin::Instructions).text().null())
                .col(
                    ColumnDef::new(PaymentMethodsOrigin::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .extra("DEFAULT NOW()".to_string())
                )
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .name("idx_payment_methods_origin_country")
                .table(PaymentMethodsOrigin::Table)
                .col(PaymentMethodsOrigin::CountryCode)
                .to_owned()
        ).await?;

        manager.create_table(
            Table::create()
                .table(UserPaymentMethods::Table)
                .if_not_exists()
                .col(ColumnDef::new(UserPaymentMethods::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(UserPaymentMethods::UserId).uuid().not_null())
                .col(ColumnDef::new(UserPaymentMethods::CountryCode).string_len(2).not_null())
                .col(ColumnDef::new(UserPaymentMethods::Method).string_len(100).not_null())
                .col(ColumnDef::new(UserPaymentMethods::Data).json_binary().not_null())
                .col(
                    ColumnDef::new(UserPaymentMethods::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .extra("DEFAULT NOW()".to_string())
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_user_payment_methods_user")
                        .from(UserPaymentMethods::Table, UserPaymentMethods::UserId)
                        .to(Users::Table, Users::Id)
                        .on_delete(ForeignKeyAction::Cascade)
                )
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .name("idx_user_payment_methods_user_country")
                .table(UserPaymentMethods::Table)
                .col(UserPaymentMethods::UserId)
                .col(UserPaymentMethods::CountryCode)
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(UserPaymentMethods::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(PaymentMethodsOrigin::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum PaymentMethodsOrigin {
    Table,
    Id,
    CountryCode,
    Name,
    Instructions,
    CreatedAt,
}

#[derive(DeriveIden)]
enum UserPaymentMethods {
    Table,
    Id,
    UserId,
    CountryCode,
    Method,
    Data,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
