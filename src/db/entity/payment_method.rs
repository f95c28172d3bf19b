use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{ Deserialize, Serialize };

/// Payee-side method saved by a user for one destination country.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_payment_methods")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub country_code: String,
    pub method: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub data: MethodData,
    pub created_at: DateTimeUtc,
}

/// Holder identity shared by every method, plus the per-kind payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct MethodData {
    pub holder_name: String,
    pub document_type: String,
    pub document_number: String,
    #[serde(flatten)]
    pub details: MethodDetails,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MethodDetails {
    BankTransfer {
        bank: String,
        account_number: String,
        account_type: String,
    },
    MobilePayment {
        phone: String,
        bank: Option<String>,
    },
    DigitalWallet {
        account: Option<String>,
        platform: Option<String>,
    },
    CashPickup,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
