use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::OnConflict,
    ActiveModelTrait,
    ActiveValue::{ Set, Unchanged },
    ColumnTrait,
    DatabaseConnection,
    DbErr,
    EntityTrait,
    QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

use crate::db::entity::{ rate, Rate };
use crate::db::repository::RateRepository;
use crate::error::{ AppError, Result };

pub struct DbRateRepository {
    db: DatabaseConnection,
}

impl DbRateRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RateRepository for DbRateRepository {
    async fn find_route(&self, origin: &str, destination: &str) -> Result<Option<rate::Model>> {
        let route = Rate::find()
            .filter(rate::Column::OriginCountry.eq(origin))
            .filter(rate::Column::DestinationCountry.eq(destination))
            .one(&self.db).await?;

        Ok(route)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<rate::Model>> {
        Ok(Rate::find_by_id(id).one(&self.db).await?)
    }

    async fn list(&self) -> Result<Vec<rate::Model>> {
        let rates = Rate::find()
            .order_by_asc(rate::Column::OriginCountry)
            .order_by_asc(rate::Column::DestinationCountry)
            .all(&self.db).await?;

        Ok(rates)
    }

    async fn upsert(&self, rate: rate::Model) -> Result<rate::Model> {
        let active = rate::ActiveModel::from(rate).reset_all();

        let stored = Rate::insert(active)
            .on_conflict(
                OnConflict::columns([rate::Column::OriginCountry, rate::Column::DestinationCountry])
                    .update_columns([
                        rate::Column::Rate,
                        rate::Column::Operation,
                        rate::Column::Currency,
                        rate::Column::UpdatedAt,
                    ])
                    .to_owned()
            )
            .exec_with_returning(&self.db).await?;

        Ok(stored)
    }

    async fn update(
        &self,
        id: Uuid,
        rate: Decimal,
        operation: String,
        currency: String
    ) -> Result<rate::Model> {
        let active = rate::ActiveModel {
            id: Unchanged(id),
            rate: Set(rate),
            operation: Set(operation),
            currency: Set(currency),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };

        match active.update(&self.db).await {
            Ok(rate) => Ok(rate),
            Err(DbErr::RecordNotUpdated) => Err(AppError::NotFound("Rate".to_string())),
            Err(e) => Err(e.into()),
        }
    }
}
