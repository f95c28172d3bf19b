use async_trait::async_trait;
use chrono::{ DateTime, Utc };
use sea_orm::{
    sea_query::{ Expr, OnConflict },
    ActiveModelTrait,
    DatabaseConnection,
    DbErr,
    EntityTrait,
};

use crate::db::entity::{ pending_code, PendingCode };
use crate::db::repository::{ CodeRepository, CodeWrite };
use crate::error::{ AppError, Result };

pub struct DbCodeRepository {
    db: DatabaseConnection,
}

impl DbCodeRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CodeRepository for DbCodeRepository {
    async fn find(&self, phone: &str) -> Result<Option<pending_code::Model>> {
        Ok(PendingCode::find_by_id(phone.to_string()).one(&self.db).await?)
    }

    async fn replace_if_idle(
        &self,
        record: pending_code::Model,
        idle_since: DateTime<Utc>
    ) -> Result<CodeWrite> {
        let phone = record.phone.clone();
        let active = pending_code::ActiveModel::from(record).reset_all();

        // Upsert on the phone key; an existing row only yields once it is older
        // than the cooldown, so concurrent issuers cannot both get through
        let result = PendingCode::insert(active)
            .on_conflict(
                OnConflict::column(pending_code::Column::Phone)
                    .update_columns([
                        pending_code::Column::Purpose,
                        pending_code::Column::Code,
                        pending_code::Column::ExpiresAt,
                        pending_code::Column::PasswordHash,
                        pending_code::Column::CountryCode,
                        pending_code::Column::CountryName,
                        pending_code::Column::Sent,
                        pending_code::Column::CreatedAt,
                    ])
                    .action_and_where(
                        Expr::col((PendingCode, pending_code::Column::CreatedAt)).lte(idle_since)
                    )
                    .to_owned()
            )
            .exec_with_returning(&self.db).await;

        match result {
            Ok(stored) => Ok(CodeWrite::Stored(stored)),
            Err(DbErr::RecordNotInserted) | Err(DbErr::RecordNotFound(_)) => {
                let existing = self
                    .find(&phone).await?
                    .ok_or_else(|| {
                        AppError::Conflict("Verification code changed concurrently".to_string())
                    })?;
                Ok(CodeWrite::Throttled { issued_at: existing.created_at })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, phone: &str) -> Result<bool> {
        let result = PendingCode::delete_by_id(phone.to_string()).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }
}
