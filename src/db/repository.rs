//! Repository traits for the record store.
//!
//! Services only talk to these traits; `Repositories::sea_orm` binds them to
//! PostgreSQL and `Repositories::in_memory` to process-local maps.

use async_trait::async_trait;
use chrono::{ DateTime, Utc };
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::db::entity::{
    origin_method,
    payment_method,
    pending_code,
    rate,
    transaction,
    transaction_audit,
    user,
};
use crate::enums::TxStatus;
use crate::error::Result;

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<String>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: user::Model) -> Result<user::Model>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<user::Model>>;

    async fn find_by_phone(&self, phone: &str) -> Result<Option<user::Model>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>>;

    /// Apply the set fields of `patch` and stamp `updated_at`.
    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<user::Model>;

    /// All users, newest first.
    async fn list(&self) -> Result<Vec<user::Model>>;

    async fn count(&self) -> Result<u64>;
}

// ============================================================================
// Verification codes
// ============================================================================

#[derive(Debug, Clone)]
pub enum CodeWrite {
    Stored(pending_code::Model),
    /// The phone holds a code issued inside the cooldown window.
    Throttled {
        issued_at: DateTime<Utc>,
    },
}

#[async_trait]
pub trait CodeRepository: Send + Sync {
    async fn find(&self, phone: &str) -> Result<Option<pending_code::Model>>;

    /// Store `record` as the only row for its phone, replacing any previous
    /// one unless that row was created after `idle_since`. Check and write
    /// happen as one step.
    async fn replace_if_idle(
        &self,
        record: pending_code::Model,
        idle_since: DateTime<Utc>
    ) -> Result<CodeWrite>;

    /// Returns whether a row was removed.
    async fn delete(&self, phone: &str) -> Result<bool>;
}

// ============================================================================
// Rates
// ============================================================================

#[async_trait]
pub trait RateRepository: Send + Sync {
    async fn find_route(&self, origin: &str, destination: &str) -> Result<Option<rate::Model>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<rate::Model>>;

    /// All routes ordered by origin, then destination.
    async fn list(&self) -> Result<Vec<rate::Model>>;

    /// Insert, or overwrite the row for the same ordered pair (its id is kept).
    async fn upsert(&self, rate: rate::Model) -> Result<rate::Model>;

    async fn update(
        &self,
        id: Uuid,
        rate: Decimal,
        operation: String,
        currency: String
    ) -> Result<rate::Model>;
}

// ============================================================================
// Payment methods
// ============================================================================

#[async_trait]
pub trait OriginMethodRepository: Send + Sync {
    async fn insert(&self, method: origin_method::Model) -> Result<origin_method::Model>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<origin_method::Model>>;

    async fn list_by_country(&self, country_code: &str) -> Result<Vec<origin_method::Model>>;

    async fn count(&self) -> Result<u64>;
}

#[async_trait]
pub trait PaymentMethodRepository: Send + Sync {
    async fn insert(&self, method: payment_method::Model) -> Result<payment_method::Model>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<payment_method::Model>>;

    /// A user's methods for one country, oldest first.
    async fn list_for_user(
        &self,
        user_id: Uuid,
        country_code: &str
    ) -> Result<Vec<payment_method::Model>>;
}

// ============================================================================
// Transactions
// ============================================================================

/// Statuses a row must still hold when the write lands.
#[derive(Debug, Clone)]
pub struct StatusGuard {
    pub action: &'static str,
    pub allowed: Vec<String>,
}

impl StatusGuard {
    pub fn new(action: &'static str, allowed: &[TxStatus]) -> Self {
        Self {
            action,
            allowed: allowed
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
        }
    }

    pub fn admits(&self, status: &str) -> bool {
        self.allowed.iter().any(|s| s == status)
    }
}

/// Fields a single transaction write may change. `None` leaves a column alone.
#[derive(Debug, Clone)]
pub struct TransactionPatch {
    /// When set, the write only applies if the stored status is still allowed.
    pub expected_status: Option<StatusGuard>,
    pub status: Option<String>,
    pub payment_method_origin_id: Option<Uuid>,
    pub payment_method_destination_id: Option<Uuid>,
    pub payment_reference: Option<String>,
    pub destination_reference_number: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionPatch {
    pub fn new() -> Self {
        Self {
            expected_status: None,
            status: None,
            payment_method_origin_id: None,
            payment_method_destination_id: None,
            payment_reference: None,
            destination_reference_number: None,
            updated_at: Utc::now(),
        }
    }

    pub fn guarded(action: &'static str, allowed: &[TxStatus]) -> Self {
        Self {
            expected_status: Some(StatusGuard::new(action, allowed)),
            ..Self::new()
        }
    }

    pub fn apply_to(&self, tx: &mut transaction::Model) {
        if let Some(status) = &self.status {
            tx.status = status.clone();
        }
        if let Some(id) = self.payment_method_origin_id {
            tx.payment_method_origin_id = Some(id);
        }
        if let Some(id) = self.payment_method_destination_id {
            tx.payment_method_destination_id = Some(id);
        }
        if let Some(reference) = &self.payment_reference {
            tx.payment_reference = Some(reference.clone());
        }
        if let Some(reference) = &self.destination_reference_number {
            tx.destination_reference_number = Some(reference.clone());
        }
        tx.updated_at = self.updated_at;
    }
}

impl Default for TransactionPatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Exact-match and range filters pushed down to the store.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<String>,
    pub origin_country: Option<String>,
    pub destination_country: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &transaction::Model) -> bool {
        self.user_id.map_or(true, |id| tx.user_id == id) &&
            self.status.as_ref().map_or(true, |s| &tx.status == s) &&
            self.origin_country.as_ref().map_or(true, |c| &tx.origin_country == c) &&
            self.destination_country.as_ref().map_or(true, |c| &tx.destination_country == c) &&
            self.created_from.map_or(true, |from| tx.created_at >= from) &&
            self.created_to.map_or(true, |to| tx.created_at <= to)
    }
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn insert(&self, tx: transaction::Model) -> Result<transaction::Model>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<transaction::Model>>;

    /// One atomic write; fails with `NotFound` when the id does not resolve
    /// and with `InvalidTransition` when the patch's status guard no longer holds.
    async fn update(&self, id: Uuid, patch: TransactionPatch) -> Result<transaction::Model>;

    /// Matching transactions, newest first.
    async fn list(&self, filter: &TransactionFilter) -> Result<Vec<transaction::Model>>;

    async fn count(&self, status: Option<&str>) -> Result<u64>;
}

// ============================================================================
// Audit trail
// ============================================================================

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(&self, entry: transaction_audit::Model) -> Result<transaction_audit::Model>;

    /// Entries for one transaction, oldest first.
    async fn list_for_transaction(
        &self,
        transaction_id: Uuid
    ) -> Result<Vec<transaction_audit::Model>>;
}
