use axum::{ extract::{ Path, Query, State }, Json };
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Caller;
use crate::db::entity::{ transaction, transaction_audit };
use crate::enums::{ Role, TxStatus };
use crate::error::Result;
use crate::services::admin_service::{ Dashboard, TransactionDetail, TransactionQuery };
use crate::services::user_service::UserSummary;

use super::AppState;

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub status: TxStatus,
    #[serde(default)]
    pub destination_reference_number: Option<String>,
}

#[derive(Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

pub async fn list_transactions(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<TransactionQuery>
) -> Result<Json<Vec<transaction::Model>>> {
    let transactions = state.admin_service.list_transactions(&caller, query).await?;

    Ok(Json(transactions))
}

pub async fn transaction_detail(
    State(state): State<AppState>,
    caller: Caller,
    Path(tx_id): Path<Uuid>
) -> Result<Json<TransactionDetail>> {
    let detail = state.admin_service.transaction_detail(&caller, tx_id).await?;

    Ok(Json(detail))
}

pub async fn set_status(
    State(state): State<AppState>,
    caller: Caller,
    Path(tx_id): Path<Uuid>,
    Json(request): Json<SetStatusRequest>
) -> Result<Json<transaction::Model>> {
    let tx = state.admin_service.set_status(
        &caller,
        tx_id,
        request.status,
        request.destination_reference_number
    ).await?;

    Ok(Json(tx))
}

pub async fn audit_trail(
    State(state): State<AppState>,
    caller: Caller,
    Path(tx_id): Path<Uuid>
) -> Result<Json<Vec<transaction_audit::Model>>> {
    let entries = state.admin_service.audit_trail(&caller, tx_id).await?;

    Ok(Json(entries))
}

pub async fn dashboard(State(state): State<AppState>, caller: Caller) -> Result<Json<Dashboard>> {
    let dashboard = state.admin_service.dashboard(&caller).await?;

    Ok(Json(dashboard))
}

pub async fn list_users(
    State(state): State<AppState>,
    caller: Caller
) -> Result<Json<Vec<UserSummary>>> {
    let users = state.admin_service.list_users(&caller).await?;

    Ok(Json(users))
}

pub async fn set_role(
    State(state): State<AppState>,
    caller: Caller,
    Path(user_id): Path<Uuid>,
    Json(request): Json<SetRoleRequest>
) -> Result<Json<UserSummary>> {
    let user = state.admin_service.set_role(&caller, user_id, request.role).await?;

    Ok(Json(user))
}
