use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Caller;
use crate::db::entity::transaction;
use crate::db::{
    OriginMethodRepository,
    PaymentMethodRepository,
    TransactionFilter,
    TransactionPatch,
    TransactionRepository,
    UserRepository,
};
use crate::enums::TxStatus;
use crate::error::{ AppError, Result };
use crate::feed::{ ChangeEvent, ChangeFeed };
use crate::services::QuoteService;

/// An admin status write together with the status it replaced.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub previous: TxStatus,
    pub transaction: transaction::Model,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTransaction {
    pub origin_country: String,
    pub destination_country: String,
    pub amount: Decimal,
}

/// Transfer lifecycle.
///
/// | call                         | allowed from                         | moves to            |
/// |------------------------------|--------------------------------------|---------------------|
/// | `select_origin_method`       | Creando, Método seleccionado         | Método seleccionado |
/// | `select_destination_method`  | Método seleccionado                  | Método seleccionado |
/// | `confirm_summary`            | Método seleccionado, en pago         | en pago             |
/// | `submit_payment_reference`   | en pago, Procesando                  | Procesando          |
/// | `admin_set_status`           | any                                  | Completado/Cancelada|
///
/// Each call is one write of the row; status travels with the fields it sets,
/// and the write only lands while the row still holds an allowed status.
pub struct TransactionService {
    users: Arc<dyn UserRepository>,
    transactions: Arc<dyn TransactionRepository>,
    origin_methods: Arc<dyn OriginMethodRepository>,
    payment_methods: Arc<dyn PaymentMethodRepository>,
    quotes: Arc<QuoteService>,
    feed: ChangeFeed,
}

impl TransactionService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        transactions: Arc<dyn TransactionRepository>,
        origin_methods: Arc<dyn OriginMethodRepository>,
        payment_methods: Arc<dyn PaymentMethodRepository>,
        quotes: Arc<QuoteService>,
        feed: ChangeFeed
    ) -> Self {
        Self {
            users,
            transactions,
            origin_methods,
            payment_methods,
            quotes,
            feed,
        }
    }

    /// Quote against the live table and snapshot the result into a new transfer.
    pub async fn create(&self, caller: &Caller, input: NewTransaction) -> Result<transaction::Model> {
        if self.users.find_by_id(caller.user_id).await?.is_none() {
            return Err(AppError::NotFound("User".to_string()));
        }

        let quote = self.quotes.quote(
            &input.origin_country,
            &input.destination_country,
            input.amount
        ).await?;

        let now = Utc::now();
        let tx = self.transactions.insert(transaction::Model {
            id: Uuid::new_v4(),
            user_id: caller.user_id,
            origin_country: quote.origin,
            destination_country: quote.destination,
            amount: quote.amount,
            rate: quote.rate,
            operation: quote.operation.as_str().to_string(),
            currency: quote.currency,
            received_amount: quote.received_amount,
            payment_method_origin_id: None,
            payment_method_destination_id: None,
            payment_reference: None,
            destination_reference_number: None,
            admin_reference_number: None,
            status: TxStatus::Creando.as_str().to_string(),
            created_at: now,
            updated_at: now,
        }).await?;

        tracing::info!(
            "Transaction {} created: {} {} -> {} {} {}",
            tx.id,
            tx.amount,
            tx.origin_country,
            tx.received_amount,
            tx.currency,
            tx.destination_country
        );
        self.feed.publish(ChangeEvent::insert(tx.clone()));

        Ok(tx)
    }

    pub async fn get_own(&self, caller: &Caller, id: Uuid) -> Result<transaction::Model> {
        self.load_owned(caller, id).await
    }

    /// The caller's transfers, newest first.
    pub async fn list_own(&self, caller: &Caller) -> Result<Vec<transaction::Model>> {
        let filter = TransactionFilter {
            user_id: Some(caller.user_id),
            ..Default::default()
        };
        self.transactions.list(&filter).await
    }

    pub async fn select_origin_method(
        &self,
        caller: &Caller,
        id: Uuid,
        method_id: Uuid
    ) -> Result<transaction::Model> {
        let tx = self.load_owned(caller, id).await?;
        const ACTION: &str = "select an origin method";
        const ALLOWED: &[TxStatus] = &[TxStatus::Creando, TxStatus::MetodoSeleccionado];
        guard(&tx, ACTION, ALLOWED)?;

        let method = self.origin_methods
            .find_by_id(method_id).await?
            .ok_or_else(|| AppError::NotFound("Origin payment method".to_string()))?;
        if method.country_code != tx.origin_country {
            return Err(
                AppError::Validation(
                    format!("Method {} is not available in {}", method.name, tx.origin_country)
                )
            );
        }

        let patch = TransactionPatch {
            status: Some(TxStatus::MetodoSeleccionado.as_str().to_string()),
            payment_method_origin_id: Some(method_id),
            ..TransactionPatch::guarded(ACTION, ALLOWED)
        };
        self.write(tx, patch).await
    }

    pub async fn select_destination_method(
        &self,
        caller: &Caller,
        id: Uuid,
        method_id: Uuid
    ) -> Result<transaction::Model> {
        let tx = self.load_owned(caller, id).await?;
        const ACTION: &str = "select a destination method";
        const ALLOWED: &[TxStatus] = &[TxStatus::MetodoSeleccionado];
        guard(&tx, ACTION, ALLOWED)?;

        let method = self.payment_methods
            .find_by_id(method_id).await?
            .ok_or_else(|| AppError::NotFound("Payment method".to_string()))?;
        if method.user_id != tx.user_id {
            return Err(AppError::Forbidden("Payment method belongs to another user".to_string()));
        }
        if method.country_code != tx.destination_country {
            return Err(
                AppError::Validation(
                    format!(
                        "Payment method is for {}, transaction pays out in {}",
                        method.country_code,
                        tx.destination_country
                    )
                )
            );
        }

        let patch = TransactionPatch {
            status: Some(TxStatus::MetodoSeleccionado.as_str().to_string()),
            payment_method_destination_id: Some(method_id),
            ..TransactionPatch::guarded(ACTION, ALLOWED)
        };
        self.write(tx, patch).await
    }

    pub async fn confirm_summary(&self, caller: &Caller, id: Uuid) -> Result<transaction::Model> {
        let tx = self.load_owned(caller, id).await?;
        const ACTION: &str = "confirm the summary";
        const ALLOWED: &[TxStatus] = &[TxStatus::MetodoSeleccionado, TxStatus::EnPago];
        guard(&tx, ACTION, ALLOWED)?;

        if tx.payment_method_origin_id.is_none() {
            return Err(AppError::MissingField("payment_method_origin_id"));
        }
        if tx.payment_method_destination_id.is_none() {
            return Err(AppError::MissingField("payment_method_destination_id"));
        }

        let patch = TransactionPatch {
            status: Some(TxStatus::EnPago.as_str().to_string()),
            ..TransactionPatch::guarded(ACTION, ALLOWED)
        };
        self.write(tx, patch).await
    }

    pub async fn submit_payment_reference(
        &self,
        caller: &Caller,
        id: Uuid,
        reference: &str
    ) -> Result<transaction::Model> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(AppError::MissingField("payment_reference"));
        }

        let tx = self.load_owned(caller, id).await?;
        const ACTION: &str = "submit a payment reference";
        const ALLOWED: &[TxStatus] = &[TxStatus::EnPago, TxStatus::Procesando];
        guard(&tx, ACTION, ALLOWED)?;

        let patch = TransactionPatch {
            status: Some(TxStatus::Procesando.as_str().to_string()),
            payment_reference: Some(reference.to_string()),
            ..TransactionPatch::guarded(ACTION, ALLOWED)
        };
        self.write(tx, patch).await
    }

    /// Move a transfer to a terminal state. Any prior state is accepted,
    /// including the other terminal state.
    pub async fn admin_set_status(
        &self,
        caller: &Caller,
        id: Uuid,
        status: TxStatus,
        destination_reference_number: Option<String>
    ) -> Result<StatusChange> {
        caller.require_admin()?;
        if !status.is_terminal() {
            return Err(
                AppError::Validation(
                    format!("Admins can only set {} or {}", TxStatus::Completado, TxStatus::Cancelada)
                )
            );
        }

        let tx = self.transactions
            .find_by_id(id).await?
            .ok_or_else(|| AppError::NotFound("Transaction".to_string()))?;

        let current = tx.status()?;
        if current.is_terminal() && current != status {
            tracing::warn!("Transaction {} overridden from {} to {} by {}", id, current, status, caller.user_id);
        }

        let patch = TransactionPatch {
            status: Some(status.as_str().to_string()),
            destination_reference_number: destination_reference_number
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
            ..TransactionPatch::new()
        };
        let transaction = self.write(tx, patch).await?;

        Ok(StatusChange { previous: current, transaction })
    }

    async fn load_owned(&self, caller: &Caller, id: Uuid) -> Result<transaction::Model> {
        let tx = self.transactions
            .find_by_id(id).await?
            .ok_or_else(|| AppError::NotFound("Transaction".to_string()))?;

        if tx.user_id != caller.user_id && !caller.is_admin() {
            return Err(AppError::Forbidden("Transaction belongs to another user".to_string()));
        }

        Ok(tx)
    }

    async fn write(&self, before: transaction::Model, patch: TransactionPatch) -> Result<transaction::Model> {
        let after = self.transactions.update(before.id, patch).await?;

        if before.status != after.status {
            tracing::info!("Transaction {}: {} -> {}", after.id, before.status, after.status);
        }
        self.feed.publish(ChangeEvent::update(Some(before), after.clone()));

        Ok(after)
    }
}

fn guard(tx: &transaction::Model, action: &'static str, allowed: &[TxStatus]) -> Result<TxStatus> {
    let status = tx.status()?;
    if !allowed.contains(&status) {
        return Err(AppError::InvalidTransition {
            action,
            status: status.to_string(),
        });
    }
    Ok(status)
}
