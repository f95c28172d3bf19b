use sea_orm::entity::prelude::*;
use serde::{ Deserialize, Serialize };

/// Short-lived verification code, keyed by phone.
///
/// During signup the row doubles as staging for the not-yet-created user: it
/// carries the password hash and the country detected from the phone prefix.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pending_codes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub phone: String,
    pub purpose: String,
    pub code: String,
    pub expires_at: DateTimeUtc,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub country_code: Option<String>,
    pub country_name: Option<String>,
    pub sent: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
