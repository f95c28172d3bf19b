//! Process-local record store used when `DATABASE_URL=memory` and by tests.
//!
//! Each table is a map behind its own lock. Every trait call takes the lock
//! once, so a write is observed whole or not at all.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{ DateTime, Utc };
use parking_lot::RwLock;
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
use crate::db::repository::{
    AuditRepository,
    CodeRepository,
    CodeWrite,
    OriginMethodRepository,
    PaymentMethodRepository,
    RateRepository,
    TransactionFilter,
    TransactionPatch,
    TransactionRepository,
    UserPatch,
    UserRepository,
};
use crate::error::{ AppError, Result };

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, user::Model>>,
    codes: RwLock<HashMap<String, pending_code::Model>>,
    rates: RwLock<HashMap<Uuid, rate::Model>>,
    origin_methods: RwLock<HashMap<Uuid, origin_method::Model>>,
    payment_methods: RwLock<HashMap<Uuid, payment_method::Model>>,
    transactions: RwLock<HashMap<Uuid, transaction::Model>>,
    audit: RwLock<Vec<transaction_audit::Model>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert(&self, user: user::Model) -> Result<user::Model> {
        let mut users = self.users.write();

        let duplicate = users.values().any(|existing| {
            existing.phone == user.phone ||
                (user.email.is_some() && existing.email == user.email)
        });
        if duplicate || users.contains_key(&user.id) {
            return Err(AppError::Conflict("User already registered".to_string()));
        }

        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<user::Model>> {
        Ok(self.users.read().get(&id).cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<user::Model>> {
        Ok(
            self.users
                .read()
                .values()
                .find(|u| u.phone == phone)
                .cloned()
        )
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>> {
        Ok(
            self.users
                .read()
                .values()
                .find(|u| u.email.as_deref() == Some(email))
                .cloned()
        )
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<user::Model> {
        let mut users = self.users.write();
        let user = users.get_mut(&id).ok_or_else(|| AppError::NotFound("User".to_string()))?;

        if let Some(first_name) = patch.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = patch.last_name {
            user.last_name = Some(last_name);
        }
        if let Some(password_hash) = patch.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn list(&self) -> Result<Vec<user::Model>> {
        let mut users: Vec<_> = self.users.read().values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.users.read().len() as u64)
    }
}

#[async_trait]
impl CodeRepository for MemoryStore {
    async fn find(&self, phone: &str) -> Result<Option<pending_code::Model>> {
        Ok(self.codes.read().get(phone).cloned())
    }

    async fn replace_if_idle(
        &self,
        record: pending_code::Model,
        idle_since: DateTime<Utc>
    ) -> Result<CodeWrite> {
        let mut codes = self.codes.write();
        if let Some(existing) = codes.get(&record.phone) {
            if existing.created_at > idle_since {
                return Ok(CodeWrite::Throttled { issued_at: existing.created_at });
            }
        }

        codes.insert(record.phone.clone(), record.clone());
        Ok(CodeWrite::Stored(record))
    }

    async fn delete(&self, phone: &str) -> Result<bool> {
        Ok(self.codes.write().remove(phone).is_some())
    }
}

#[async_trait]
impl RateRepository for MemoryStore {
    async fn find_route(&self, origin: &str, destination: &str) -> Result<Option<rate::Model>> {
        Ok(
            self.rates
                .read()
                .values()
                .find(|r| r.origin_country == origin && r.destination_country == destination)
                .cloned()
        )
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<rate::Model>> {
        Ok(self.rates.read().get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<rate::Model>> {
        let mut rates: Vec<_> = self.rates.read().values().cloned().collect();
        rates.sort_by(|a, b| {
            a.origin_country
                .cmp(&b.origin_country)
                .then_with(|| a.destination_country.cmp(&b.destination_country))
        });
        Ok(rates)
    }

    async fn upsert(&self, rate: rate::Model) -> Result<rate::Model> {
        let mut rates = self.rates.write();

        let existing = rates
            .values_mut()
            .find(|r| {
                r.origin_country == rate.origin_country &&
                    r.destination_country == rate.destination_country
            });

        if let Some(existing) = existing {
            existing.rate = rate.rate;
            existing.operation = rate.operation;
            existing.currency = rate.currency;
            existing.updated_at = rate.updated_at;
            return Ok(existing.clone());
        }

        rates.insert(rate.id, rate.clone());
        Ok(rate)
    }

    async fn update(
        &self,
        id: Uuid,
        rate: Decimal,
        operation: String,
        currency: String
    ) -> Result<rate::Model> {
        let mut rates = self.rates.write();
        let entry = rates.get_mut(&id).ok_or_else(|| AppError::NotFound("Rate".to_string()))?;

        entry.rate = rate;
        entry.operation = operation;
        entry.currency = currency;
        entry.updated_at = Utc::now();

        Ok(entry.clone())
    }
}

#[async_trait]
impl OriginMethodRepository for MemoryStore {
    async fn insert(&self, method: origin_method::Model) -> Result<origin_method::Model> {
        self.origin_methods.write().insert(method.id, method.clone());
        Ok(method)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<origin_method::Model>> {
        Ok(self.origin_methods.read().get(&id).cloned())
    }

    async fn list_by_country(&self, country_code: &str) -> Result<Vec<origin_method::Model>> {
        let mut methods: Vec<_> = self.origin_methods
            .read()
            .values()
            .filter(|m| m.country_code == country_code)
            .cloned()
            .collect();
        methods.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(methods)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.origin_methods.read().len() as u64)
    }
}

#[async_trait]
impl PaymentMethodRepository for MemoryStore {
    async fn insert(&self, method: payment_method::Model) -> Result<payment_method::Model> {
        self.payment_methods.write().insert(method.id, method.clone());
        Ok(method)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<payment_method::Model>> {
        Ok(self.payment_methods.read().get(&id).cloned())
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        country_code: &str
    ) -> Result<Vec<payment_method::Model>> {
        let mut methods: Vec<_> = self.payment_methods
            .read()
            .values()
            .filter(|m| m.user_id == user_id && m.country_code == country_code)
            .cloned()
            .collect();
        methods.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(methods)
    }
}

#[async_trait]
impl TransactionRepository for MemoryStore {
    async fn insert(&self, tx: transaction::Model) -> Result<transaction::Model> {
        self.transactions.write().insert(tx.id, tx.clone());
        Ok(tx)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<transaction::Model>> {
        Ok(self.transactions.read().get(&id).cloned())
    }

    async fn update(&self, id: Uuid, patch: TransactionPatch) -> Result<transaction::Model> {
        let mut transactions = self.transactions.write();
        let tx = transactions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Transaction".to_string()))?;

        if let Some(guard) = &patch.expected_status {
            if !guard.admits(&tx.status) {
                return Err(AppError::InvalidTransition {
                    action: guard.action,
                    status: tx.status.clone(),
                });
            }
        }

        patch.apply_to(tx);
        Ok(tx.clone())
    }

    async fn list(&self, filter: &TransactionFilter) -> Result<Vec<transaction::Model>> {
        let mut transactions: Vec<_> = self.transactions
            .read()
            .values()
            .filter(|tx| filter.matches(tx))
            .cloned()
            .collect();
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transactions)
    }

    async fn count(&self, status: Option<&str>) -> Result<u64> {
        let transactions = self.transactions.read();
        let count = match status {
            Some(status) => transactions.values().filter(|tx| tx.status == status).count(),
            None => transactions.len(),
        };
        Ok(count as u64)
    }
}

#[async_trait]
impl AuditRepository for MemoryStore {
    async fn append(&self, entry: transaction_audit::Model) -> Result<transaction_audit::Model> {
        self.audit.write().push(entry.clone());
        Ok(entry)
    }

    async fn list_for_transaction(
        &self,
        transaction_id: Uuid
    ) -> Result<Vec<transaction_audit::Model>> {
        Ok(
            self.audit
                .read()
                .iter()
                .filter(|entry| entry.transaction_id == transaction_id)
                .cloned()
                .collect()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use chrono::Duration;

    fn sample_user(phone: &str, email: Option<&str>) -> user::Model {
        let now = Utc::now();
        user::Model {
            id: Uuid::new_v4(),
            phone: phone.to_string(),
            email: email.map(str::to_string),
            password_hash: "hash".to_string(),
            first_name: None,
            last_name: None,
            country_code: Some("CO".to_string()),
            role: "usuario".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_rate(origin: &str, destination: &str, value: Decimal) -> rate::Model {
        rate::Model {
            id: Uuid::new_v4(),
            origin_country: origin.to_string(),
            destination_country: destination.to_string(),
            rate: value,
            operation: "multiply".to_string(),
            currency: "COP".to_string(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_phone_is_rejected() {
        let store = MemoryStore::new();
        UserRepository::insert(&store, sample_user("+573001112233", None)).await.unwrap();

        let err = UserRepository::insert(&store, sample_user("+573001112233", None)).await;
        assert!(matches!(err, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_rate_upsert_keeps_route_id() {
        let store = MemoryStore::new();
        let first = store.upsert(sample_rate("VE", "CO", dec!(0.00008))).await.unwrap();
        let second = store.upsert(sample_rate("VE", "CO", dec!(0.00009))).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.rate, dec!(0.00009));
        assert_eq!(RateRepository::list(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_code_replace_leaves_one_row_per_phone() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let record = |code: &str| pending_code::Model {
            phone: "+584121234567".to_string(),
            purpose: "signup".to_string(),
            code: code.to_string(),
            expires_at: now,
            password_hash: None,
            country_code: None,
            country_name: None,
            sent: false,
            created_at: now,
        };

        store.replace_if_idle(record("1111"), now).await.unwrap();
        store.replace_if_idle(record("2222"), now).await.unwrap();

        let stored = store.find("+584121234567").await.unwrap().unwrap();
        assert_eq!(stored.code, "2222");
        assert!(store.delete("+584121234567").await.unwrap());
        assert!(!store.delete("+584121234567").await.unwrap());
    }

    #[tokio::test]
    async fn test_code_inside_cooldown_is_kept() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let record = |code: &str| pending_code::Model {
            phone: "+584121234567".to_string(),
            purpose: "signup".to_string(),
            code: code.to_string(),
            expires_at: now,
            password_hash: None,
            country_code: None,
            country_name: None,
            sent: true,
            created_at: now,
        };

        store.replace_if_idle(record("1111"), now).await.unwrap();
        let second = store.replace_if_idle(record("2222"), now - Duration::seconds(60)).await.unwrap();

        assert!(matches!(second, CodeWrite::Throttled { issued_at } if issued_at == now));
        assert_eq!(store.find("+584121234567").await.unwrap().unwrap().code, "1111");
    }

    #[tokio::test]
    async fn test_update_missing_transaction_is_not_found() {
        let store = MemoryStore::new();
        let result = TransactionRepository::update(
            &store,
            Uuid::new_v4(),
            TransactionPatch::new()
        ).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
