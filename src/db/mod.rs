use std::sync::Arc;

use sea_orm::DatabaseConnection;

pub mod entity;
pub mod repository;
pub mod memory;

mod user_repository;
mod code_repository;
mod rate_repository;
mod payment_method_repository;
mod transaction_repository;
mod audit_repository;

pub use entity::*;
pub use repository::*;
pub use memory::MemoryStore;

pub use user_repository::DbUserRepository;
pub use code_repository::DbCodeRepository;
pub use rate_repository::DbRateRepository;
pub use payment_method_repository::{ DbOriginMethodRepository, DbPaymentMethodRepository };
pub use transaction_repository::DbTransactionRepository;
pub use audit_repository::DbAuditRepository;

/// One handle per table, shared by every service.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub codes: Arc<dyn CodeRepository>,
    pub rates: Arc<dyn RateRepository>,
    pub origin_methods: Arc<dyn OriginMethodRepository>,
    pub payment_methods: Arc<dyn PaymentMethodRepository>,
    pub transactions: Arc<dyn TransactionRepository>,
    pub audit: Arc<dyn AuditRepository>,
}

impl Repositories {
    pub fn sea_orm(db: DatabaseConnection) -> Self {
        Self {
            users: Arc::new(DbUserRepository::new(db.clone())),
            codes: Arc::new(DbCodeRepository::new(db.clone())),
            rates: Arc::new(DbRateRepository::new(db.clone())),
            origin_methods: Arc::new(DbOriginMethodRepository::new(db.clone())),
            payment_methods: Arc::new(DbPaymentMethodRepository::new(db.clone())),
            transactions: Arc::new(DbTransactionRepository::new(db.clone())),
            audit: Arc::new(DbAuditRepository::new(db)),
        }
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            codes: store.clone(),
            rates: store.clone(),
            origin_methods: store.clone(),
            payment_methods: store.clone(),
            transactions: store.clone(),
            audit: store,
        }
    }
}
