use std::sync::Arc;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{ Decimal, RoundingStrategy };
use serde::Serialize;
use uuid::Uuid;

use crate::auth::Caller;
use crate::countries;
use crate::db::entity::rate;
use crate::db::RateRepository;
use crate::enums::RateOperation;
use crate::error::{ AppError, Result };

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub origin: String,
    pub destination: String,
    pub amount: Decimal,
    pub rate: Decimal,
    pub operation: RateOperation,
    pub currency: String,
    pub received_amount: i64,
}

/// Apply `rate` to `amount` and round half-up to a whole destination unit.
pub fn received_amount(amount: Decimal, rate: Decimal, operation: RateOperation) -> Result<i64> {
    if amount <= Decimal::ZERO {
        return Err(AppError::Validation("Amount must be greater than zero".to_string()));
    }
    if rate <= Decimal::ZERO {
        return Err(AppError::Validation("Rate must be greater than zero".to_string()));
    }

    let raw = match operation {
        RateOperation::Multiply => amount.checked_mul(rate),
        RateOperation::Divide => amount.checked_div(rate),
    }.ok_or_else(|| AppError::Validation("Amount is out of range".to_string()))?;

    raw.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| AppError::Validation("Amount is out of range".to_string()))
}

pub(crate) fn normalize_country(code: &str, field: &'static str) -> Result<String> {
    let code = code.trim();
    if code.is_empty() {
        return Err(AppError::MissingField(field));
    }
    Ok(code.to_uppercase())
}

pub struct QuoteService {
    rates: Arc<dyn RateRepository>,
}

impl QuoteService {
    pub fn new(rates: Arc<dyn RateRepository>) -> Self {
        Self { rates }
    }

    /// The rate for an ordered country pair. Routes are directional.
    pub async fn lookup(&self, origin: &str, destination: &str) -> Result<rate::Model> {
        let origin = normalize_country(origin, "origin")?;
        let destination = normalize_country(destination, "destination")?;

        self.rates
            .find_route(&origin, &destination).await?
            .ok_or(AppError::NoRoute { origin, destination })
    }

    /// Price `amount` against the current table. Reads only.
    pub async fn quote(&self, origin: &str, destination: &str, amount: Decimal) -> Result<Quote> {
        let entry = self.lookup(origin, destination).await?;
        let operation: RateOperation = entry.operation.parse()?;
        let received_amount = received_amount(amount, entry.rate, operation)?;

        Ok(Quote {
            origin: entry.origin_country,
            destination: entry.destination_country,
            amount,
            rate: entry.rate,
            operation,
            currency: entry.currency,
            received_amount,
        })
    }

    pub async fn list_rates(&self) -> Result<Vec<rate::Model>> {
        self.rates.list().await
    }

    pub async fn update_rate(
        &self,
        caller: &Caller,
        id: Uuid,
        value: Decimal,
        operation: RateOperation,
        currency: Option<String>
    ) -> Result<rate::Model> {
        caller.require_admin()?;
        validate_rate(value)?;

        let existing = self.rates
            .find_by_id(id).await?
            .ok_or_else(|| AppError::NotFound("Rate".to_string()))?;
        let currency = currency
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or(existing.currency);

        let updated = self.rates.update(id, value, operation.as_str().to_string(), currency).await?;
        tracing::info!(
            "Rate {} -> {} set to {} ({}) by {}",
            updated.origin_country,
            updated.destination_country,
            updated.rate,
            updated.operation,
            caller.user_id
        );

        Ok(updated)
    }

    /// Create the route, or replace the one already stored for the pair.
    pub async fn upsert_rate(
        &self,
        caller: &Caller,
        origin: &str,
        destination: &str,
        value: Decimal,
        operation: RateOperation,
        currency: Option<String>
    ) -> Result<rate::Model> {
        caller.require_admin()?;
        validate_rate(value)?;

        let origin = normalize_country(origin, "origin")?;
        let destination = normalize_country(destination, "destination")?;
        let currency = match currency.map(|c| c.trim().to_uppercase()).filter(|c| !c.is_empty()) {
            Some(currency) => currency,
            None =>
                countries
                    ::find(&destination)
                    .map(|c| c.currency.to_string())
                    .ok_or(AppError::MissingField("currency"))?,
        };

        let stored = self.rates.upsert(rate::Model {
            id: Uuid::new_v4(),
            origin_country: origin,
            destination_country: destination,
            rate: value,
            operation: operation.as_str().to_string(),
            currency,
            updated_at: Utc::now(),
        }).await?;

        tracing::info!(
            "Rate {} -> {} stored as {} by {}",
            stored.origin_country,
            stored.destination_country,
            stored.rate,
            caller.user_id
        );

        Ok(stored)
    }

    /// Load the default route table into an empty store.
    pub async fn seed_defaults(&self) -> Result<usize> {
        if !self.rates.list().await?.is_empty() {
            return Ok(0);
        }

        let mut seeded = 0;
        for (origin, destination, value, operation) in countries::default_rates() {
            let Some(country) = countries::find(destination) else {
                continue;
            };
            self.rates.upsert(rate::Model {
                id: Uuid::new_v4(),
                origin_country: origin.to_string(),
                destination_country: destination.to_string(),
                rate: value,
                operation: operation.as_str().to_string(),
                currency: country.currency.to_string(),
                updated_at: Utc::now(),
            }).await?;
            seeded += 1;
        }

        tracing::info!("Seeded {} default rates", seeded);
        Ok(seeded)
    }
}

fn validate_rate(value: Decimal) -> Result<()> {
    if value <= Decimal::ZERO {
        return Err(AppError::Validation("Rate must be greater than zero".to_string()));
    }
    Ok(())
}
