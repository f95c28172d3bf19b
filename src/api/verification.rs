//! Standalone verification endpoints with the response shapes of the older
//! code service.

use axum::{ extract::State, Json };
use serde::{ Deserialize, Serialize };

use crate::error::{ AppError, Result };

use super::AppState;

#[derive(Deserialize)]
pub struct ResendCodeRequest {
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendCodeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub expires_in_minutes: i64,
}

#[derive(Deserialize)]
pub struct VerifyCodeRequest {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Serialize)]
pub struct VerifyCodeResponse {
    pub success: bool,
    pub message: String,
}

pub async fn resend_code(
    State(state): State<AppState>,
    Json(request): Json<ResendCodeRequest>
) -> Result<Json<ResendCodeResponse>> {
    let phone = request.phone.ok_or(AppError::MissingField("phone"))?;
    let issued = state.verification_service.resend_or_issue(&phone).await?;

    Ok(
        Json(ResendCodeResponse {
            success: true,
            code: state.echo(&issued),
            expires_in_minutes: state.verification_service.ttl().num_minutes(),
        })
    )
}

/// Verifies and consumes the code.
pub async fn verify_code(
    State(state): State<AppState>,
    Json(request): Json<VerifyCodeRequest>
) -> Result<Json<VerifyCodeResponse>> {
    let phone = request.phone
        .filter(|p| !p.trim().is_empty())
        .ok_or(AppError::MissingField("phone"))?;
    let code = request.code
        .filter(|c| !c.trim().is_empty())
        .ok_or(AppError::MissingField("code"))?;

    state.verification_service.consume(&phone, &code, None).await?;

    Ok(
        Json(VerifyCodeResponse {
            success: true,
            message: "Code verified".to_string(),
        })
    )
}
