use axum::{ extract::State, Json };
use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Serialize };

use crate::auth::Caller;
use crate::error::Result;
use crate::services::user_service::{
    AuthSession,
    CompleteRegistration,
    Registration,
    UserSummary,
};
use crate::services::verification_service::IssuedCode;

use super::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeIssuedResponse {
    pub success: bool,
    pub phone: String,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl CodeIssuedResponse {
    fn new(state: &AppState, phone: &str, issued: IssuedCode) -> Self {
        Self {
            success: true,
            phone: phone.trim().to_string(),
            expires_at: issued.expires_at,
            code: state.echo(&issued),
        }
    }
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Deserialize)]
pub struct PhoneRequest {
    pub phone: String,
}

#[derive(Deserialize)]
pub struct PhoneCodeRequest {
    pub phone: String,
    pub code: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub phone: String,
    pub code: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct ProfileRequest {
    pub first_name: String,
    pub last_name: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<Registration>
) -> Result<Json<CodeIssuedResponse>> {
    let phone = request.phone.clone();
    let issued = state.user_service.start_registration(request).await?;

    Ok(Json(CodeIssuedResponse::new(&state, &phone, issued)))
}

pub async fn verify_registration(
    State(state): State<AppState>,
    Json(request): Json<PhoneCodeRequest>
) -> Result<Json<SuccessResponse>> {
    state.user_service.verify_registration(&request.phone, &request.code).await?;

    Ok(Json(SuccessResponse { success: true }))
}

pub async fn complete_registration(
    State(state): State<AppState>,
    Json(request): Json<CompleteRegistration>
) -> Result<Json<AuthSession>> {
    let session = state.user_service.complete_registration(request).await?;

    Ok(Json(session))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>
) -> Result<Json<AuthSession>> {
    let session = state.user_service.login(&request.identifier, &request.password).await?;

    Ok(Json(session))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<PhoneRequest>
) -> Result<Json<CodeIssuedResponse>> {
    let issued = state.user_service.start_password_reset(&request.phone).await?;

    Ok(Json(CodeIssuedResponse::new(&state, &request.phone, issued)))
}

pub async fn verify_reset_code(
    State(state): State<AppState>,
    Json(request): Json<PhoneCodeRequest>
) -> Result<Json<SuccessResponse>> {
    state.user_service.verify_reset_code(&request.phone, &request.code).await?;

    Ok(Json(SuccessResponse { success: true }))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>
) -> Result<Json<SuccessResponse>> {
    state.user_service.reset_password(
        &request.phone,
        &request.code,
        &request.new_password
    ).await?;

    Ok(Json(SuccessResponse { success: true }))
}

pub async fn cancel_reset(
    State(state): State<AppState>,
    Json(request): Json<PhoneRequest>
) -> Result<Json<SuccessResponse>> {
    state.user_service.cancel_password_reset(&request.phone).await?;

    Ok(Json(SuccessResponse { success: true }))
}

pub async fn get_profile(
    State(state): State<AppState>,
    caller: Caller
) -> Result<Json<UserSummary>> {
    let user = state.user_service.profile(&caller).await?;

    Ok(Json(user))
}

pub async fn update_profile(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<ProfileRequest>
) -> Result<Json<UserSummary>> {
    let user = state.user_service.complete_profile(
        &caller,
        &request.first_name,
        &request.last_name
    ).await?;

    Ok(Json(user))
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

pub async fn change_password(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<ChangePasswordRequest>
) -> Result<Json<SuccessResponse>> {
    state.user_service.change_password(
        &caller,
        &request.current_password,
        &request.new_password
    ).await?;

    Ok(Json(SuccessResponse { success: true }))
}
