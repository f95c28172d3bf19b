use sea_orm::entity::prelude::*;
use serde::{ Deserialize, Serialize };

use crate::enums::TxStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub origin_country: String,
    pub destination_country: String,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub amount: Decimal,
    /// Snapshot of the quoted rate; never recomputed against the live table.
    #[sea_orm(column_type = "Decimal(Some((24, 10)))")]
    pub rate: Decimal,
    pub operation: String,
    pub currency: String,
    pub received_amount: i64,
    pub payment_method_origin_id: Option<Uuid>,
    pub payment_method_destination_id: Option<Uuid>,
    pub payment_reference: Option<String>,
    pub destination_reference_number: Option<String>,
    pub admin_reference_number: Option<String>,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn status(&self) -> crate::error::Result<TxStatus> {
        self.status.parse()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(has_many = "super::transaction_audit::Entity")]
    Audit,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::transaction_audit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Audit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
