use std::sync::Arc;

use chrono::{ DateTime, Duration, Utc };
use rand::Rng;
use serde::Serialize;

use crate::countries::Country;
use crate::db::entity::pending_code;
use crate::db::{ CodeRepository, CodeWrite };
use crate::enums::CodePurpose;
use crate::error::{ AppError, Result };

/// A freshly issued code, as returned to the issuing flow.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedCode {
    pub code: String,
    pub purpose: CodePurpose,
    pub expires_at: DateTime<Utc>,
}

/// Short-lived numeric codes keyed by phone.
///
/// At most one record exists per phone; each issuance replaces the previous
/// one. Expiry is checked when a code is verified, nothing sweeps old rows.
pub struct VerificationService {
    codes: Arc<dyn CodeRepository>,
    ttl: Duration,
    cooldown: Duration,
}

impl VerificationService {
    pub fn new(codes: Arc<dyn CodeRepository>, ttl: Duration, cooldown: Duration) -> Self {
        Self { codes, ttl, cooldown }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a new code for `phone`, replacing any record it already has.
    ///
    /// Signup codes stage the password hash and the detected country so the
    /// user row can be created once the phone is proven.
    pub async fn issue(
        &self,
        phone: &str,
        purpose: CodePurpose,
        password_hash: Option<String>,
        country: Option<&Country>
    ) -> Result<IssuedCode> {
        let phone = normalize_phone(phone)?;

        let now = Utc::now();
        let record = pending_code::Model {
            phone: phone.clone(),
            purpose: purpose.as_str().to_string(),
            code: generate_code(purpose.code_len()),
            expires_at: now + self.ttl,
            password_hash,
            country_code: country.map(|c| c.code.to_string()),
            country_name: country.map(|c| c.name.to_string()),
            sent: false,
            created_at: now,
        };

        self.store_and_deliver(record, purpose).await
    }

    /// Re-issue the code for a phone that already has a record.
    ///
    /// The purpose, staged hash and country are kept; only the code and the
    /// expiry window change.
    pub async fn resend(&self, phone: &str) -> Result<IssuedCode> {
        let phone = normalize_phone(phone)?;
        let existing = self.codes.find(&phone).await?.ok_or(AppError::CodeNotFound)?;

        let purpose: CodePurpose = existing.purpose.parse()?;
        let now = Utc::now();
        let record = pending_code::Model {
            code: generate_code(purpose.code_len()),
            expires_at: now + self.ttl,
            sent: false,
            created_at: now,
            ..existing
        };

        self.store_and_deliver(record, purpose).await
    }

    /// Resend when a record exists, otherwise start a standalone phone check.
    pub async fn resend_or_issue(&self, phone: &str) -> Result<IssuedCode> {
        let phone = normalize_phone(phone)?;
        match self.codes.find(&phone).await? {
            Some(_) => self.resend(&phone).await,
            None => self.issue(&phone, CodePurpose::PhoneVerification, None, None).await,
        }
    }

    /// Check `code` against the record for `phone`. The record is left in place.
    pub async fn verify(&self, phone: &str, code: &str) -> Result<pending_code::Model> {
        let phone = normalize_phone(phone)?;

        let Some(record) = self.codes.find(&phone).await? else {
            tracing::debug!("Verification for {} failed: no code on record", phone);
            return Err(AppError::CodeNotFound);
        };

        if Utc::now() > record.expires_at {
            tracing::debug!("Verification for {} failed: code expired at {}", phone, record.expires_at);
            return Err(AppError::CodeExpired);
        }

        if record.code != code {
            tracing::debug!("Verification for {} failed: code mismatch", phone);
            return Err(AppError::CodeMismatch);
        }

        Ok(record)
    }

    /// Like [`verify`](Self::verify), but a record issued for another flow
    /// counts as missing.
    pub async fn verify_for(
        &self,
        phone: &str,
        code: &str,
        purpose: CodePurpose
    ) -> Result<pending_code::Model> {
        let record = self.verify(phone, code).await?;
        if record.purpose != purpose.as_str() {
            tracing::debug!(
                "Verification for {} failed: code was issued for {}",
                record.phone,
                record.purpose
            );
            return Err(AppError::CodeNotFound);
        }
        Ok(record)
    }

    /// Verify and delete in one step, making the code single-use.
    pub async fn consume(
        &self,
        phone: &str,
        code: &str,
        purpose: Option<CodePurpose>
    ) -> Result<pending_code::Model> {
        let record = match purpose {
            Some(purpose) => self.verify_for(phone, code, purpose).await?,
            None => self.verify(phone, code).await?,
        };
        self.codes.delete(&record.phone).await?;
        Ok(record)
    }

    /// Drop the record for `phone`, if any.
    pub async fn clear(&self, phone: &str) -> Result<()> {
        let phone = normalize_phone(phone)?;
        self.codes.delete(&phone).await?;
        Ok(())
    }

    fn throttled(&self, phone: &str, issued_at: DateTime<Utc>) -> AppError {
        let next_allowed = issued_at + self.cooldown;
        let retry_after_secs = (next_allowed - Utc::now()).num_seconds().max(1);
        tracing::warn!("Code issuance for {} throttled for {}s", phone, retry_after_secs);
        AppError::RateLimited { retry_after_secs }
    }

    /// One write stores the code already marked sent; the cooldown is checked
    /// inside that write.
    async fn store_and_deliver(
        &self,
        record: pending_code::Model,
        purpose: CodePurpose
    ) -> Result<IssuedCode> {
        let phone = record.phone.clone();
        let record = pending_code::Model { sent: true, ..record };

        let stored = match self.codes.replace_if_idle(record, Utc::now() - self.cooldown).await? {
            CodeWrite::Stored(stored) => stored,
            CodeWrite::Throttled { issued_at } => {
                return Err(self.throttled(&phone, issued_at));
            }
        };

        // No SMS gateway is wired in; this log line is the delivery
        tracing::info!("Sending {} code {} to {}", purpose, stored.code, stored.phone);

        Ok(IssuedCode {
            code: stored.code,
            purpose,
            expires_at: stored.expires_at,
        })
    }
}

fn normalize_phone(phone: &str) -> Result<String> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err(AppError::MissingField("phone"));
    }
    Ok(phone.to_string())
}

fn generate_code(len: u32) -> String {
    let low = (10u32).pow(len - 1);
    let high = (10u32).pow(len);
    rand::rng().random_range(low..high).to_string()
}
