use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait,
    ColumnTrait,
    DatabaseConnection,
    EntityTrait,
    QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

use crate::db::entity::{ transaction_audit, TransactionAudit };
use crate::db::repository::AuditRepository;
use crate::error::Result;

pub struct DbAuditRepository {
    db: DatabaseConnection,
}

impl DbAuditRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditRepository for DbAuditRepository {
    async fn append(&self, entry: transaction_audit::Model) -> Result<transaction_audit::Model> {
        let active = transaction_audit::ActiveModel::from(entry).reset_all();
        Ok(TransactionAudit::insert(active).exec_with_returning(&self.db).await?)
    }

    async fn list_for_transaction(
        &self,
        transaction_id: Uuid
    ) -> Result<Vec<transaction_audit::Model>> {
        let entries = TransactionAudit::find()
            .filter(transaction_audit::Column::TransactionId.eq(transaction_id))
            .order_by_asc(transaction_audit::Column::CreatedAt)
            .all(&self.db).await?;

        Ok(entries)
    }
}
