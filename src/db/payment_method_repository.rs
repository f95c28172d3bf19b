use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait,
    ColumnTrait,
    DatabaseConnection,
    EntityTrait,
    PaginatorTrait,
    QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

use crate::db::entity::{ origin_method, payment_method, OriginMethod, PaymentMethod };
use crate::db::repository::{ OriginMethodRepository, PaymentMethodRepository };
use crate::error::Result;

pub struct DbOriginMethodRepository {
    db: DatabaseConnection,
}

impl DbOriginMethodRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OriginMethodRepository for DbOriginMethodRepository {
    async fn insert(&self, method: origin_method::Model) -> Result<origin_method::Model> {
        let active = origin_method::ActiveModel::from(method).reset_all();
        Ok(OriginMethod::insert(active).exec_with_returning(&self.db).await?)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<origin_method::Model>> {
        Ok(OriginMethod::find_by_id(id).one(&self.db).await?)
    }

    async fn list_by_country(&self, country_code: &str) -> Result<Vec<origin_method::Model>> {
        let methods = OriginMethod::find()
            .filter(origin_method::Column::CountryCode.eq(country_code))
            .order_by_asc(origin_method::Column::Name)
            .all(&self.db).await?;

        Ok(methods)
    }

    async fn count(&self) -> Result<u64> {
        Ok(OriginMethod::find().count(&self.db).await?)
    }
}

pub struct DbPaymentMethodRepository {
    db: DatabaseConnection,
}

impl DbPaymentMethodRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PaymentMethodRepository for DbPaymentMethodRepository {
    async fn insert(&self, method: payment_method::Model) -> Result<payment_method::Model> {
        let active = payment_method::ActiveModel::from(method).reset_all();
        Ok(PaymentMethod::insert(active).exec_with_returning(&self.db).await?)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<payment_method::Model>> {
        Ok(PaymentMethod::find_by_id(id).one(&self.db).await?)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        country_code: &str
    ) -> Result<Vec<payment_method::Model>> {
        let methods = PaymentMethod::find()
            .filter(payment_method::Column::UserId.eq(user_id))
            .filter(payment_method::Column::CountryCode.eq(country_code))
            .order_by_asc(payment_method::Column::CreatedAt)
            .all(&self.db).await?;

        Ok(methods)
    }
}
