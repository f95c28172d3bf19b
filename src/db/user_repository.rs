use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait,
    ActiveValue::{ Set, Unchanged },
    ColumnTrait,
    DatabaseConnection,
    DbErr,
    EntityTrait,
    PaginatorTrait,
    QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

use crate::db::entity::{ user, User };
use crate::db::repository::{ UserPatch, UserRepository };
use crate::error::{ AppError, Result };

pub struct DbUserRepository {
    db: DatabaseConnection,
}

impl DbUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for DbUserRepository {
    async fn insert(&self, user: user::Model) -> Result<user::Model> {
        let active = user::ActiveModel::from(user).reset_all();
        let user = User::insert(active).exec_with_returning(&self.db).await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<user::Model>> {
        Ok(User::find_by_id(id).one(&self.db).await?)
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<user::Model>> {
        let user = User::find().filter(user::Column::Phone.eq(phone)).one(&self.db).await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>> {
        let user = User::find().filter(user::Column::Email.eq(email)).one(&self.db).await?;
        Ok(user)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<user::Model> {
        let mut active = user::ActiveModel {
            id: Unchanged(id),
            ..Default::default()
        };

        if let Some(first_name) = patch.first_name {
            active.first_name = Set(Some(first_name));
        }
        if let Some(last_name) = patch.last_name {
            active.last_name = Set(Some(last_name));
        }
        if let Some(password_hash) = patch.password_hash {
            active.password_hash = Set(password_hash);
        }
        if let Some(role) = patch.role {
            active.role = Set(role);
        }
        active.updated_at = Set(Utc::now());

        match active.update(&self.db).await {
            Ok(user) => Ok(user),
            Err(DbErr::RecordNotUpdated) => Err(AppError::NotFound("User".to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<user::Model>> {
        let users = User::find().order_by_desc(user::Column::CreatedAt).all(&self.db).await?;
        Ok(users)
    }

    async fn count(&self) -> Result<u64> {
        Ok(User::find().count(&self.db).await?)
    }
}
