use axum::{ extract::{ Path, State }, http::StatusCode, Json };
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Caller;
use crate::db::entity::transaction;
use crate::error::Result;
use crate::services::transaction_service::NewTransaction;

use super::AppState;

#[derive(Deserialize)]
pub struct SelectMethodRequest {
    pub method_id: Uuid,
}

#[derive(Deserialize)]
pub struct PaymentReferenceRequest {
    #[serde(default)]
    pub reference: String,
}

pub async fn list_transactions(
    State(state): State<AppState>,
    caller: Caller
) -> Result<Json<Vec<transaction::Model>>> {
    let transactions = state.transaction_service.list_own(&caller).await?;

    Ok(Json(transactions))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<NewTransaction>
) -> Result<(StatusCode, Json<transaction::Model>)> {
    let tx = state.transaction_service.create(&caller, request).await?;

    Ok((StatusCode::CREATED, Json(tx)))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    caller: Caller,
    Path(tx_id): Path<Uuid>
) -> Result<Json<transaction::Model>> {
    let tx = state.transaction_service.get_own(&caller, tx_id).await?;

    Ok(Json(tx))
}

pub async fn select_origin_method(
    State(state): State<AppState>,
    caller: Caller,
    Path(tx_id): Path<Uuid>,
    Json(request): Json<SelectMethodRequest>
) -> Result<Json<transaction::Model>> {
    let tx = state.transaction_service.select_origin_method(
        &caller,
        tx_id,
        request.method_id
    ).await?;

    Ok(Json(tx))
}

pub async fn select_destination_method(
    State(state): State<AppState>,
    caller: Caller,
    Path(tx_id): Path<Uuid>,
    Json(request): Json<SelectMethodRequest>
) -> Result<Json<transaction::Model>> {
    let tx = state.transaction_service.select_destination_method(
        &caller,
        tx_id,
        request.method_id
    ).await?;

    Ok(Json(tx))
}

pub async fn confirm_summary(
    State(state): State<AppState>,
    caller: Caller,
    Path(tx_id): Path<Uuid>
) -> Result<Json<transaction::Model>> {
    let tx = state.transaction_service.confirm_summary(&caller, tx_id).await?;

    Ok(Json(tx))
}

pub async fn submit_payment_reference(
    State(state): State<AppState>,
    caller: Caller,
    Path(tx_id): Path<Uuid>,
    Json(request): Json<PaymentReferenceRequest>
) -> Result<Json<transaction::Model>> {
    let tx = state.transaction_service.submit_payment_reference(
        &caller,
        tx_id,
        &request.reference
    ).await?;

    Ok(Json(tx))
}
