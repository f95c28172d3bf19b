use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{ DateTime, Duration, NaiveDate, Utc };
use rust_decimal::Decimal;
use serde::{ Deserialize, Serialize };
use uuid::Uuid;

use crate::auth::Caller;
use crate::db::entity::{ origin_method, payment_method, transaction, transaction_audit };
use crate::db::{
    AuditRepository,
    OriginMethodRepository,
    PaymentMethodRepository,
    TransactionFilter,
    TransactionRepository,
    UserPatch,
    UserRepository,
};
use crate::enums::{ Role, TxStatus };
use crate::error::{ AppError, Result };
use crate::services::user_service::UserSummary;
use crate::services::TransactionService;

const RECENT_LIMIT: usize = 6;
const CHART_DAYS: i64 = 7;

/// Admin list filters. `search` is a case-insensitive substring match over
/// id, status, countries, amount and the reference fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionQuery {
    pub search: Option<String>,
    pub status: Option<TxStatus>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub user_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

fn matches_search(tx: &transaction::Model, needle: &str) -> bool {
    let fields = [
        Some(tx.id.to_string()),
        Some(tx.status.clone()),
        Some(tx.origin_country.clone()),
        Some(tx.destination_country.clone()),
        Some(tx.amount.to_string()),
        tx.payment_reference.clone(),
        tx.destination_reference_number.clone(),
        tx.admin_reference_number.clone(),
    ];

    fields
        .iter()
        .flatten()
        .any(|value| value.to_lowercase().contains(needle))
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionDetail {
    pub transaction: transaction::Model,
    pub user: Option<UserSummary>,
    pub origin_method: Option<origin_method::Model>,
    pub destination_method: Option<payment_method::Model>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub users: u64,
    pub transactions: u64,
    pub processing: u64,
    pub completed: u64,
    pub completed_volume: Decimal,
    pub recent: Vec<transaction::Model>,
    pub completed_last_week: Vec<DailyCount>,
}

/// Privileged views and the terminal status transition with its audit entry.
pub struct AdminService {
    users: Arc<dyn UserRepository>,
    transactions: Arc<dyn TransactionRepository>,
    origin_methods: Arc<dyn OriginMethodRepository>,
    payment_methods: Arc<dyn PaymentMethodRepository>,
    audit: Arc<dyn AuditRepository>,
    transaction_service: Arc<TransactionService>,
}

impl AdminService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        transactions: Arc<dyn TransactionRepository>,
        origin_methods: Arc<dyn OriginMethodRepository>,
        payment_methods: Arc<dyn PaymentMethodRepository>,
        audit: Arc<dyn AuditRepository>,
        transaction_service: Arc<TransactionService>
    ) -> Self {
        Self {
            users,
            transactions,
            origin_methods,
            payment_methods,
            audit,
            transaction_service,
        }
    }

    /// Set a terminal status and append one audit entry.
    ///
    /// The status write is committed first; if the audit append fails the
    /// failure is logged and the updated transaction is still returned.
    pub async fn set_status(
        &self,
        caller: &Caller,
        id: Uuid,
        status: TxStatus,
        destination_reference_number: Option<String>
    ) -> Result<transaction::Model> {
        let change = self.transaction_service.admin_set_status(
            caller,
            id,
            status,
            destination_reference_number
        ).await?;
        let tx = change.transaction;

        let entry = transaction_audit::Model {
            id: Uuid::new_v4(),
            transaction_id: tx.id,
            action: format!("status changed from {} to {}", change.previous, status),
            actor: self.actor_name(caller).await,
            created_at: Utc::now(),
        };
        if let Err(e) = self.audit.append(entry).await {
            tracing::error!("Failed to write audit entry for transaction {}: {}", tx.id, e);
        }

        Ok(tx)
    }

    pub async fn list_transactions(
        &self,
        caller: &Caller,
        query: TransactionQuery
    ) -> Result<Vec<transaction::Model>> {
        caller.require_admin()?;

        let filter = TransactionFilter {
            user_id: query.user_id,
            status: query.status.map(|s| s.as_str().to_string()),
            origin_country: query.origin.map(|c| c.trim().to_uppercase()),
            destination_country: query.destination.map(|c| c.trim().to_uppercase()),
            created_from: query.from,
            created_to: query.to,
        };
        let transactions = self.transactions.list(&filter).await?;

        let needle = query.search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let Some(needle) = needle else {
            return Ok(transactions);
        };

        Ok(
            transactions
                .into_iter()
                .filter(|tx| matches_search(tx, &needle))
                .collect()
        )
    }

    pub async fn transaction_detail(&self, caller: &Caller, id: Uuid) -> Result<TransactionDetail> {
        caller.require_admin()?;

        let transaction = self.transactions
            .find_by_id(id).await?
            .ok_or_else(|| AppError::NotFound("Transaction".to_string()))?;

        let user = self.users.find_by_id(transaction.user_id).await?.map(UserSummary::from);
        let origin_method = match transaction.payment_method_origin_id {
            Some(method_id) => self.origin_methods.find_by_id(method_id).await?,
            None => None,
        };
        let destination_method = match transaction.payment_method_destination_id {
            Some(method_id) => self.payment_methods.find_by_id(method_id).await?,
            None => None,
        };

        Ok(TransactionDetail {
            transaction,
            user,
            origin_method,
            destination_method,
        })
    }

    /// Audit entries for one transaction, oldest first.
    pub async fn audit_trail(
        &self,
        caller: &Caller,
        id: Uuid
    ) -> Result<Vec<transaction_audit::Model>> {
        caller.require_admin()?;

        if self.transactions.find_by_id(id).await?.is_none() {
            return Err(AppError::NotFound("Transaction".to_string()));
        }
        self.audit.list_for_transaction(id).await
    }

    pub async fn dashboard(&self, caller: &Caller) -> Result<Dashboard> {
        caller.require_admin()?;

        let users = self.users.count().await?;
        let transactions = self.transactions.count(None).await?;
        let processing = self.transactions.count(Some(TxStatus::Procesando.as_str())).await?;

        let completed_rows = self.transactions.list(
            &(TransactionFilter {
                status: Some(TxStatus::Completado.as_str().to_string()),
                ..Default::default()
            })
        ).await?;
        let completed = completed_rows.len() as u64;
        let completed_volume: Decimal = completed_rows
            .iter()
            .map(|tx| tx.amount)
            .sum();

        let week_start = Utc::now() - Duration::days(CHART_DAYS);
        let mut by_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
        for tx in completed_rows.iter().filter(|tx| tx.created_at >= week_start) {
            *by_day.entry(tx.created_at.date_naive()).or_default() += 1;
        }

        let mut recent = self.transactions.list(&TransactionFilter::default()).await?;
        recent.truncate(RECENT_LIMIT);

        Ok(Dashboard {
            users,
            transactions,
            processing,
            completed,
            completed_volume,
            recent,
            completed_last_week: by_day
                .into_iter()
                .map(|(day, count)| DailyCount { day, count })
                .collect(),
        })
    }

    pub async fn list_users(&self, caller: &Caller) -> Result<Vec<UserSummary>> {
        caller.require_admin()?;
        let users = self.users.list().await?;
        Ok(users.into_iter().map(UserSummary::from).collect())
    }

    pub async fn set_role(&self, caller: &Caller, user_id: Uuid, role: Role) -> Result<UserSummary> {
        caller.require_admin()?;

        let user = self.users.update(user_id, UserPatch {
            role: Some(role.as_str().to_string()),
            ..Default::default()
        }).await?;

        tracing::info!("User {} role set to {} by {}", user.id, role, caller.user_id);
        Ok(UserSummary::from(user))
    }

    async fn actor_name(&self, caller: &Caller) -> String {
        match self.users.find_by_id(caller.user_id).await {
            Ok(Some(admin)) => admin.email.unwrap_or(admin.phone),
            Ok(None) => caller.user_id.to_string(),
            Err(e) => {
                tracing::warn!("Could not resolve admin {} for audit: {}", caller.user_id, e);
                caller.user_id.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::entity::user;
    use crate::db::MemoryStore;
    use crate::feed::ChangeFeed;
    use crate::services::transaction_service::NewTransaction;
    use crate::services::QuoteService;
    use rust_decimal_macros::dec;

    struct Fixture {
        admin_service: AdminService,
        transactions: Arc<TransactionService>,
        owner: Caller,
        admin: Caller,
    }

    async fn insert_user(store: &MemoryStore, phone: &str, role: Role) -> Caller {
        let now = Utc::now();
        let user = UserRepository::insert(store, user::Model {
            id: Uuid::new_v4(),
            phone: phone.to_string(),
            email: None,
            password_hash: "hash".to_string(),
            first_name: Some("Ana".to_string()),
            last_name: None,
            country_code: None,
            role: role.as_str().to_string(),
            created_at: now,
            updated_at: now,
        }).await.unwrap();
        Caller { user_id: user.id, role }
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let quotes = Arc::new(QuoteService::new(store.clone()));
        quotes.seed_defaults().await.unwrap();

        let transactions = Arc::new(
            TransactionService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                quotes,
                ChangeFeed::new()
            )
        );
        let admin_service = AdminService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            transactions.clone()
        );

        let owner = insert_user(&store, "+573001112233", Role::Usuario).await;
        let admin = insert_user(&store, "+584141112233", Role::Administrador).await;

        Fixture { admin_service, transactions, owner, admin }
    }

    impl Fixture {
        async fn create(&self, origin: &str, destination: &str, amount: Decimal) -> transaction::Model {
            self.transactions
                .create(&self.owner, NewTransaction {
                    origin_country: origin.to_string(),
                    destination_country: destination.to_string(),
                    amount,
                }).await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_each_status_change_writes_one_audit_entry() {
        let f = fixture().await;
        let tx = f.create("VE", "CO", dec!(1000000)).await;

        f.admin_service
            .set_status(&f.admin, tx.id, TxStatus::Completado, Some("ADM-REF-9".into())).await
            .unwrap();
        let trail = f.admin_service.audit_trail(&f.admin, tx.id).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, "status changed from Creando to Completado");
        assert_eq!(trail[0].actor, "+584141112233");

        f.admin_service.set_status(&f.admin, tx.id, TxStatus::Cancelada, None).await.unwrap();
        let trail = f.admin_service.audit_trail(&f.admin, tx.id).await.unwrap();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[1].action, "status changed from Completado to Cancelada");
    }

    struct FailingAudit;

    #[async_trait::async_trait]
    impl AuditRepository for FailingAudit {
        async fn append(&self, _entry: transaction_audit::Model) -> Result<transaction_audit::Model> {
            Err(AppError::Storage(sea_orm::DbErr::Custom("audit table unavailable".into())))
        }

        async fn list_for_transaction(
            &self,
            _transaction_id: Uuid
        ) -> Result<Vec<transaction_audit::Model>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_status_survives_audit_failure() {
        let store = Arc::new(MemoryStore::new());
        let quotes = Arc::new(QuoteService::new(store.clone()));
        quotes.seed_defaults().await.unwrap();
        let transactions = Arc::new(
            TransactionService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                quotes,
                ChangeFeed::new()
            )
        );
        let admin_service = AdminService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(FailingAudit),
            transactions.clone()
        );
        let owner = insert_user(&store, "+573001112233", Role::Usuario).await;
        let admin = insert_user(&store, "+584141112233", Role::Administrador).await;

        let tx = transactions
            .create(&owner, NewTransaction {
                origin_country: "VE".to_string(),
                destination_country: "CO".to_string(),
                amount: dec!(1000),
            }).await
            .unwrap();

        let updated = admin_service
            .set_status(&admin, tx.id, TxStatus::Completado, Some("ADM-7".into())).await
            .unwrap();
        assert_eq!(updated.status, "Completado");

        let stored = TransactionRepository::find_by_id(store.as_ref(), tx.id).await.unwrap().unwrap();
        assert_eq!(stored.status, "Completado");
        assert_eq!(stored.destination_reference_number.as_deref(), Some("ADM-7"));
    }

    #[tokio::test]
    async fn test_failed_transition_writes_no_audit() {
        let f = fixture().await;
        let tx = f.create("VE", "CO", dec!(100)).await;

        let result = f.admin_service.set_status(&f.owner, tx.id, TxStatus::Completado, None).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
        assert!(f.admin_service.audit_trail(&f.admin, tx.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_and_filters() {
        let f = fixture().await;
        let first = f.create("VE", "CO", dec!(1000000)).await;
        f.create("CO", "VE", dec!(50000)).await;
        f.admin_service
            .set_status(&f.admin, first.id, TxStatus::Completado, Some("ADM-REF-9".into())).await
            .unwrap();

        let by_reference = f.admin_service
            .list_transactions(&f.admin, TransactionQuery {
                search: Some("adm-ref".to_string()),
                ..Default::default()
            }).await
            .unwrap();
        assert_eq!(by_reference.len(), 1);
        assert_eq!(by_reference[0].id, first.id);

        let by_origin = f.admin_service
            .list_transactions(&f.admin, TransactionQuery {
                origin: Some("co".to_string()),
                ..Default::default()
            }).await
            .unwrap();
        assert_eq!(by_origin.len(), 1);

        let by_status = f.admin_service
            .list_transactions(&f.admin, TransactionQuery {
                status: Some(TxStatus::Creando),
                ..Default::default()
            }).await
            .unwrap();
        assert_eq!(by_status.len(), 1);

        let everything = f.admin_service
            .list_transactions(&f.admin, TransactionQuery::default()).await
            .unwrap();
        assert_eq!(everything.len(), 2);
    }

    #[tokio::test]
    async fn test_admin_views_require_admin() {
        let f = fixture().await;
        assert!(matches!(f.admin_service.dashboard(&f.owner).await, Err(AppError::Forbidden(_))));
        assert!(matches!(f.admin_service.list_users(&f.owner).await, Err(AppError::Forbidden(_))));
        assert!(matches!(
            f.admin_service.list_transactions(&f.owner, TransactionQuery::default()).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_dashboard_counts() {
        let f = fixture().await;
        let a = f.create("VE", "CO", dec!(1000000)).await;
        let b = f.create("CO", "VE", dec!(50000)).await;
        f.create("PE", "CO", dec!(10)).await;
        f.admin_service.set_status(&f.admin, a.id, TxStatus::Completado, None).await.unwrap();
        f.admin_service.set_status(&f.admin, b.id, TxStatus::Completado, None).await.unwrap();

        let dashboard = f.admin_service.dashboard(&f.admin).await.unwrap();
        assert_eq!(dashboard.users, 2);
        assert_eq!(dashboard.transactions, 3);
        assert_eq!(dashboard.processing, 0);
        assert_eq!(dashboard.completed, 2);
        assert_eq!(dashboard.completed_volume, dec!(1050000));
        assert_eq!(dashboard.recent.len(), 3);
        assert_eq!(dashboard.completed_last_week.iter().map(|d| d.count).sum::<u64>(), 2);
    }

    #[tokio::test]
    async fn test_detail_includes_owner() {
        let f = fixture().await;
        let tx = f.create("VE", "CO", dec!(100)).await;

        let detail = f.admin_service.transaction_detail(&f.admin, tx.id).await.unwrap();
        assert_eq!(detail.user.unwrap().id, f.owner.user_id);
        assert!(detail.origin_method.is_none());
        assert!(detail.destination_method.is_none());
    }

    #[tokio::test]
    async fn test_set_role() {
        let f = fixture().await;
        let updated = f.admin_service
            .set_role(&f.admin, f.owner.user_id, Role::Administrador).await
            .unwrap();
        assert_eq!(updated.role, "administrador");

        let missing = f.admin_service.set_role(&f.admin, Uuid::new_v4(), Role::Usuario).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }
}
