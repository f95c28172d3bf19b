use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(TransactionsAudit::Table)
                .if_not_exists()
                .col(ColumnDef::new(TransactionsAudit::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(TransactionsAudit::TransactionId).uuid().not_null())
                .col(ColumnDef::new(TransactionsAudit::Action).string().not_null())
                .col(ColumnDef::new(TransactionsAudit::Actor).string_len(100).not_null())
                .col(
                    ColumnDef::new(TransactionsAudit::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .extra("DEFAULT NOW()".to_string())
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_transactions_audit_transaction")
                        .from(TransactionsAudit::Table, TransactionsAudit::TransactionId)
                        .to(Transactions::Table, Transactions::Id)
                )
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .name("idx_transactions_audit_transaction_id")
                .table(TransactionsAudit::Table)
                .col(TransactionsAudit::TransactionId)
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(TransactionsAudit::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum TransactionsAudit {
    Table,
    Id,
    TransactionId,
    Action,
    Actor,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
}
