use axum::{ extract::{ Path, Query, State }, Json };
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Caller;
use crate::db::entity::rate;
use crate::enums::RateOperation;
use crate::error::Result;
use crate::services::quote_service::Quote;

use super::AppState;

#[derive(Deserialize)]
pub struct QuoteQuery {
    pub origin: String,
    pub destination: String,
    pub amount: Decimal,
}

#[derive(Deserialize)]
pub struct UpdateRateRequest {
    pub rate: Decimal,
    pub operation: RateOperation,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Deserialize)]
pub struct UpsertRateRequest {
    pub origin_country: String,
    pub destination_country: String,
    pub rate: Decimal,
    #[serde(default = "default_operation")]
    pub operation: RateOperation,
    #[serde(default)]
    pub currency: Option<String>,
}

fn default_operation() -> RateOperation {
    RateOperation::Multiply
}

pub async fn list_rates(State(state): State<AppState>) -> Result<Json<Vec<rate::Model>>> {
    let rates = state.quote_service.list_rates().await?;

    Ok(Json(rates))
}

pub async fn quote(
    State(state): State<AppState>,
    Query(query): Query<QuoteQuery>
) -> Result<Json<Quote>> {
    let quote = state.quote_service.quote(&query.origin, &query.destination, query.amount).await?;

    Ok(Json(quote))
}

pub async fn update_rate(
    State(state): State<AppState>,
    caller: Caller,
    Path(rate_id): Path<Uuid>,
    Json(request): Json<UpdateRateRequest>
) -> Result<Json<rate::Model>> {
    let rate = state.quote_service.update_rate(
        &caller,
        rate_id,
        request.rate,
        request.operation,
        request.currency
    ).await?;

    Ok(Json(rate))
}

pub async fn upsert_rate(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<UpsertRateRequest>
) -> Result<Json<rate::Model>> {
    let rate = state.quote_service.upsert_rate(
        &caller,
        &request.origin_country,
        &request.destination_country,
        request.rate,
        request.operation,
        request.currency
    ).await?;

    Ok(Json(rate))
}
