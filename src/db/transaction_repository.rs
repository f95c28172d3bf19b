use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait,
    ActiveValue::Set,
    ColumnTrait,
    DatabaseConnection,
    EntityTrait,
    PaginatorTrait,
    QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

use crate::db::entity::{ transaction, Transaction };
use crate::db::repository::{ TransactionFilter, TransactionPatch, TransactionRepository };
use crate::error::{ AppError, Result };

pub struct DbTransactionRepository {
    db: DatabaseConnection,
}

impl DbTransactionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TransactionRepository for DbTransactionRepository {
    async fn insert(&self, tx: transaction::Model) -> Result<transaction::Model> {
        let active = transaction::ActiveModel::from(tx).reset_all();
        let transaction = Transaction::insert(active).exec_with_returning(&self.db).await?;
        Ok(transaction)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<transaction::Model>> {
        Ok(Transaction::find_by_id(id).one(&self.db).await?)
    }

    async fn update(&self, id: Uuid, patch: TransactionPatch) -> Result<transaction::Model> {
        // Only the set columns go into the UPDATE, so concurrent writers
        // overwrite whole calls and never interleave fields.
        let mut active = <transaction::ActiveModel as Default>::default();

        if let Some(status) = patch.status {
            active.status = Set(status);
        }
        if let Some(method_id) = patch.payment_method_origin_id {
            active.payment_method_origin_id = Set(Some(method_id));
        }
        if let Some(method_id) = patch.payment_method_destination_id {
            active.payment_method_destination_id = Set(Some(method_id));
        }
        if let Some(reference) = patch.payment_reference {
            active.payment_reference = Set(Some(reference));
        }
        if let Some(reference) = patch.destination_reference_number {
            active.destination_reference_number = Set(Some(reference));
        }
        active.updated_at = Set(patch.updated_at);

        let mut query = Transaction::update_many()
            .set(active)
            .filter(transaction::Column::Id.eq(id));
        if let Some(guard) = &patch.expected_status {
            query = query.filter(transaction::Column::Status.is_in(guard.allowed.clone()));
        }

        let mut updated = query.exec_with_returning(&self.db).await?;
        if let Some(tx) = updated.pop() {
            return Ok(tx);
        }

        // Nothing matched: tell a missing row apart from a moved-on status
        let current = Transaction::find_by_id(id)
            .one(&self.db).await?
            .ok_or_else(|| AppError::NotFound("Transaction".to_string()))?;

        match patch.expected_status {
            Some(guard) =>
                Err(AppError::InvalidTransition {
                    action: guard.action,
                    status: current.status,
                }),
            None => Err(AppError::NotFound("Transaction".to_string())),
        }
    }

    async fn list(&self, filter: &TransactionFilter) -> Result<Vec<transaction::Model>> {
        let mut query = Transaction::find();

        if let Some(user_id) = filter.user_id {
            query = query.filter(transaction::Column::UserId.eq(user_id));
        }
        if let Some(status) = &filter.status {
            query = query.filter(transaction::Column::Status.eq(status.as_str()));
        }
        if let Some(origin) = &filter.origin_country {
            query = query.filter(transaction::Column::OriginCountry.eq(origin.as_str()));
        }
        if let Some(destination) = &filter.destination_country {
            query = query.filter(transaction::Column::DestinationCountry.eq(destination.as_str()));
        }
        if let Some(from) = filter.created_from {
            query = query.filter(transaction::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.created_to {
            query = query.filter(transaction::Column::CreatedAt.lte(to));
        }

        let transactions = query
            .order_by_desc(transaction::Column::CreatedAt)
            .all(&self.db).await?;

        Ok(transactions)
    }

    async fn count(&self, status: Option<&str>) -> Result<u64> {
        let mut query = Transaction::find();
        if let Some(status) = status {
            query = query.filter(transaction::Column::Status.eq(status));
        }
        Ok(query.count(&self.db).await?)
    }
}
