use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Caller;
use crate::countries;
use crate::db::entity::payment_method::{ MethodData, MethodDetails };
use crate::db::entity::{ origin_method, payment_method };
use crate::db::{ OriginMethodRepository, PaymentMethodRepository };
use crate::enums::MethodKind;
use crate::error::{ AppError, Result };
use crate::services::quote_service::normalize_country;

/// Form fields for a new payee method. Which ones are required depends on
/// the kind the method name resolves to.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPaymentMethod {
    pub country_code: String,
    pub method: String,
    #[serde(default)]
    pub holder_name: Option<String>,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub document_number: Option<String>,
    /// Account number, or the phone for mobile payments.
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub bank: Option<String>,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
}

fn field(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required(value: &Option<String>, name: &'static str) -> Result<String> {
    field(value).ok_or(AppError::MissingField(name))
}

impl NewPaymentMethod {
    /// Check the per-kind required fields and build the typed payload.
    pub fn validate(&self) -> Result<(MethodKind, MethodData)> {
        let method = self.method.trim();
        if method.is_empty() {
            return Err(AppError::MissingField("method"));
        }
        let kind = MethodKind::from_method_name(method);

        let holder_name = required(&self.holder_name, "holder_name")?;

        let details = match kind {
            MethodKind::BankTransfer => {
                let account_number = required(&self.account_number, "account_number")?;
                // Bank-branded methods name their own bank
                let bank = field(&self.bank).or_else(|| {
                    (method.contains("Banco") || method == "Bancolombia").then(|| method.to_string())
                });
                let bank = bank.ok_or(AppError::MissingField("bank"))?;
                let account_type = required(&self.account_type, "account_type")?;
                MethodDetails::BankTransfer { bank, account_number, account_type }
            }
            MethodKind::MobilePayment => {
                let phone = required(&self.account_number, "account_number")?;
                MethodDetails::MobilePayment { phone, bank: field(&self.bank) }
            }
            MethodKind::DigitalWallet =>
                MethodDetails::DigitalWallet {
                    account: field(&self.account_number),
                    platform: field(&self.platform).or_else(|| Some(method.to_string())),
                },
            MethodKind::CashPickup => MethodDetails::CashPickup,
        };

        let document_type = required(&self.document_type, "document_type")?;
        let document_number = required(&self.document_number, "document_number")?;

        Ok((kind, MethodData { holder_name, document_type, document_number, details }))
    }
}

/// Payer-side reference methods and payee methods saved by users.
pub struct PaymentMethodService {
    origin_methods: Arc<dyn OriginMethodRepository>,
    payment_methods: Arc<dyn PaymentMethodRepository>,
}

impl PaymentMethodService {
    pub fn new(
        origin_methods: Arc<dyn OriginMethodRepository>,
        payment_methods: Arc<dyn PaymentMethodRepository>
    ) -> Self {
        Self { origin_methods, payment_methods }
    }

    pub async fn add(
        &self,
        caller: &Caller,
        input: NewPaymentMethod
    ) -> Result<payment_method::Model> {
        let country_code = normalize_country(&input.country_code, "country_code")?;
        let (kind, data) = input.validate()?;

        let method = self.payment_methods.insert(payment_method::Model {
            id: Uuid::new_v4(),
            user_id: caller.user_id,
            country_code,
            method: input.method.trim().to_string(),
            data,
            created_at: Utc::now(),
        }).await?;

        tracing::info!(
            "User {} saved {:?} method {} for {}",
            caller.user_id,
            kind,
            method.id,
            method.country_code
        );

        Ok(method)
    }

    pub async fn list(&self, caller: &Caller, country_code: &str) -> Result<Vec<payment_method::Model>> {
        let country_code = normalize_country(country_code, "country")?;
        self.payment_methods.list_for_user(caller.user_id, &country_code).await
    }

    pub async fn list_origin(&self, country_code: &str) -> Result<Vec<origin_method::Model>> {
        let country_code = normalize_country(country_code, "country")?;
        self.origin_methods.list_by_country(&country_code).await
    }

    /// Load the default payer-side methods into an empty store.
    pub async fn seed_defaults(&self) -> Result<usize> {
        if self.origin_methods.count().await? > 0 {
            return Ok(0);
        }

        let mut seeded = 0;
        for (country_code, name) in countries::default_origin_methods() {
            self.origin_methods.insert(origin_method::Model {
                id: Uuid::new_v4(),
                country_code: country_code.to_string(),
                name: name.to_string(),
                instructions: None,
                created_at: Utc::now(),
            }).await?;
            seeded += 1;
        }

        tracing::info!("Seeded {} origin payment methods", seeded);
        Ok(seeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::enums::Role;

    fn service() -> PaymentMethodService {
        let store = Arc::new(MemoryStore::new());
        PaymentMethodService::new(store.clone(), store)
    }

    fn caller() -> Caller {
        Caller { user_id: Uuid::new_v4(), role: Role::Usuario }
    }

    fn bank_input() -> NewPaymentMethod {
        NewPaymentMethod {
            country_code: "CO".to_string(),
            method: "Bancolombia".to_string(),
            holder_name: Some("Ana Pérez".to_string()),
            document_type: Some("CC".to_string()),
            document_number: Some("1020304050".to_string()),
            account_number: Some("00123456789".to_string()),
            account_type: Some("Ahorros".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_bank_method_defaults_bank_from_name() {
        let service = service();
        let method = service.add(&caller(), bank_input()).await.unwrap();

        match method.data.details {
            MethodDetails::BankTransfer { bank, .. } => assert_eq!(bank, "Bancolombia"),
            other => panic!("unexpected details: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_holder_name_checked_first() {
        let service = service();
        let input = NewPaymentMethod {
            holder_name: None,
            account_number: None,
            ..bank_input()
        };

        let result = service.add(&caller(), input).await;
        assert!(matches!(result, Err(AppError::MissingField("holder_name"))));
    }

    #[tokio::test]
    async fn test_bank_requires_account_number() {
        let input = NewPaymentMethod { account_number: Some("  ".to_string()), ..bank_input() };
        assert!(matches!(input.validate(), Err(AppError::MissingField("account_number"))));
    }

    #[tokio::test]
    async fn test_mobile_payment_requires_phone_number() {
        let input = NewPaymentMethod {
            country_code: "VE".to_string(),
            method: "Pago móvil".to_string(),
            holder_name: Some("Luis".to_string()),
            document_type: Some("V".to_string()),
            document_number: Some("12345678".to_string()),
            ..Default::default()
        };
        assert!(matches!(input.validate(), Err(AppError::MissingField("account_number"))));

        let input = NewPaymentMethod { account_number: Some("04141234567".to_string()), ..input };
        let (kind, data) = input.validate().unwrap();
        assert_eq!(kind, MethodKind::MobilePayment);
        assert!(matches!(data.details, MethodDetails::MobilePayment { .. }));
    }

    #[tokio::test]
    async fn test_wallet_only_needs_identity() {
        let input = NewPaymentMethod {
            country_code: "US".to_string(),
            method: "Zelle".to_string(),
            holder_name: Some("John".to_string()),
            ..Default::default()
        };
        assert!(matches!(input.validate(), Err(AppError::MissingField("document_type"))));

        let input = NewPaymentMethod {
            document_type: Some("SSN".to_string()),
            document_number: Some("123".to_string()),
            ..input
        };
        assert!(input.validate().is_ok());
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_owner_and_country() {
        let service = service();
        let owner = caller();
        service.add(&owner, bank_input()).await.unwrap();
        service.add(&caller(), bank_input()).await.unwrap();

        assert_eq!(service.list(&owner, "CO").await.unwrap().len(), 1);
        assert!(service.list(&owner, "VE").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_seed_origin_methods_once() {
        let service = service();
        assert!(service.seed_defaults().await.unwrap() > 0);
        assert_eq!(service.seed_defaults().await.unwrap(), 0);
        assert_eq!(service.list_origin("ve").await.unwrap().len(), 2);
    }
}
