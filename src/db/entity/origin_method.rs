use sea_orm::entity::prelude::*;
use serde::{ Deserialize, Serialize };

/// Payer-side reference method (where the customer sends the origin funds).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_methods_origin")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub country_code: String,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub instructions: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
