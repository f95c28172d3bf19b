use axum::{ extract::{ Query, State }, http::StatusCode, Json };
use serde::Deserialize;

use crate::auth::Caller;
use crate::db::entity::{ origin_method, payment_method };
use crate::error::Result;
use crate::services::payment_method_service::NewPaymentMethod;

use super::AppState;

#[derive(Deserialize)]
pub struct CountryQuery {
    pub country: String,
}

pub async fn list_origin(
    State(state): State<AppState>,
    Query(query): Query<CountryQuery>
) -> Result<Json<Vec<origin_method::Model>>> {
    let methods = state.payment_method_service.list_origin(&query.country).await?;

    Ok(Json(methods))
}

pub async fn list_methods(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<CountryQuery>
) -> Result<Json<Vec<payment_method::Model>>> {
    let methods = state.payment_method_service.list(&caller, &query.country).await?;

    Ok(Json(methods))
}

pub async fn add_method(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<NewPaymentMethod>
) -> Result<(StatusCode, Json<payment_method::Model>)> {
    let method = state.payment_method_service.add(&caller, request).await?;

    Ok((StatusCode::CREATED, Json(method)))
}
