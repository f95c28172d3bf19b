use std::sync::Arc;

use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Serialize };
use uuid::Uuid;

use crate::auth::{ self, Caller, TokenIssuer };
use crate::countries;
use crate::db::entity::user;
use crate::db::{ UserPatch, UserRepository };
use crate::enums::{ CodePurpose, Role };
use crate::error::{ AppError, Result };
use crate::services::verification_service::IssuedCode;
use crate::services::VerificationService;

/// Public view of a user; never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub phone: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub country_code: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserSummary {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            phone: user.phone,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            country_code: user.country_code,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompleteRegistration {
    pub phone: String,
    pub code: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

fn normalize_email(email: Option<&str>) -> Result<Option<String>> {
    let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(None);
    };
    if !email.contains('@') {
        return Err(AppError::Validation(format!("Invalid email: {}", email)));
    }
    Ok(Some(email.to_lowercase()))
}

fn required_name(value: &str, field: &'static str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::MissingField(field));
    }
    Ok(value.to_string())
}

/// Registration, login, profile and password reset.
pub struct UserService {
    users: Arc<dyn UserRepository>,
    verification: Arc<VerificationService>,
    tokens: TokenIssuer,
    admin_phones: Vec<String>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        verification: Arc<VerificationService>,
        tokens: TokenIssuer
    ) -> Self {
        Self { users, verification, tokens, admin_phones: Vec::new() }
    }

    /// Phones listed here are created as administrators on registration.
    pub fn with_admin_phones(mut self, admin_phones: Vec<String>) -> Self {
        self.admin_phones = admin_phones;
        self
    }

    /// Stage a signup: the password hash and detected country ride on the
    /// code record until the phone is verified.
    pub async fn start_registration(&self, input: Registration) -> Result<IssuedCode> {
        let phone = input.phone.trim().to_string();
        if phone.is_empty() {
            return Err(AppError::MissingField("phone"));
        }
        auth::validate_password(&input.password)?;
        let email = normalize_email(input.email.as_deref())?;

        if self.users.find_by_phone(&phone).await?.is_some() {
            return Err(AppError::Conflict("Phone number is already registered".to_string()));
        }
        if let Some(email) = &email {
            if self.users.find_by_email(email).await?.is_some() {
                return Err(AppError::Conflict("Email is already registered".to_string()));
            }
        }

        let country = countries::from_phone(&phone);
        if country.is_none() {
            tracing::warn!("No country matches phone prefix of {}", phone);
        }

        let password_hash = auth::hash_password(&input.password)?;
        self.verification.issue(&phone, CodePurpose::Signup, Some(password_hash), country).await
    }

    /// Check a signup code without using it up.
    pub async fn verify_registration(&self, phone: &str, code: &str) -> Result<()> {
        self.verification.verify_for(phone, code, CodePurpose::Signup).await?;
        Ok(())
    }

    pub async fn complete_registration(&self, input: CompleteRegistration) -> Result<AuthSession> {
        let first_name = required_name(&input.first_name, "first_name")?;
        let last_name = required_name(&input.last_name, "last_name")?;
        let email = normalize_email(input.email.as_deref())?;

        let record = self.verification.verify_for(&input.phone, &input.code, CodePurpose::Signup).await?;
        let password_hash = record.password_hash
            .clone()
            .ok_or_else(|| AppError::Internal(format!("Signup code for {} has no password", record.phone)))?;

        if let Some(email) = &email {
            if self.users.find_by_email(email).await?.is_some() {
                return Err(AppError::Conflict("Email is already registered".to_string()));
            }
        }

        let role = if self.admin_phones.contains(&record.phone) {
            Role::Administrador
        } else {
            Role::Usuario
        };

        let now = Utc::now();
        let user = self.users.insert(user::Model {
            id: Uuid::new_v4(),
            phone: record.phone.clone(),
            email,
            password_hash,
            first_name: Some(first_name),
            last_name: Some(last_name),
            country_code: record.country_code.clone(),
            role: role.as_str().to_string(),
            created_at: now,
            updated_at: now,
        }).await?;

        self.verification.clear(&record.phone).await?;
        tracing::info!("User {} registered for {} as {}", user.id, user.phone, user.role);

        self.session_for(user)
    }

    /// `identifier` is an email address or a phone number.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<AuthSession> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(AppError::MissingField("identifier"));
        }

        let user = if identifier.contains('@') {
            self.users.find_by_email(&identifier.to_lowercase()).await?
        } else {
            self.users.find_by_phone(identifier).await?
        };

        let Some(user) = user else {
            tracing::debug!("Login failed: unknown identifier {}", identifier);
            return Err(AppError::Unauthorized);
        };
        if !auth::verify_password(password, &user.password_hash)? {
            tracing::debug!("Login failed: wrong password for {}", user.id);
            return Err(AppError::Unauthorized);
        }

        self.session_for(user)
    }

    pub async fn profile(&self, caller: &Caller) -> Result<UserSummary> {
        self.users
            .find_by_id(caller.user_id).await?
            .map(UserSummary::from)
            .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    pub async fn complete_profile(
        &self,
        caller: &Caller,
        first_name: &str,
        last_name: &str
    ) -> Result<UserSummary> {
        let patch = UserPatch {
            first_name: Some(required_name(first_name, "first_name")?),
            last_name: Some(required_name(last_name, "last_name")?),
            ..Default::default()
        };
        let user = self.users.update(caller.user_id, patch).await?;
        Ok(UserSummary::from(user))
    }

    /// Password change for a signed-in user; the current password must match.
    pub async fn change_password(
        &self,
        caller: &Caller,
        current_password: &str,
        new_password: &str
    ) -> Result<()> {
        let user = self.users
            .find_by_id(caller.user_id).await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        if !auth::verify_password(current_password, &user.password_hash)? {
            tracing::debug!("Password change refused for {}: wrong current password", user.id);
            return Err(AppError::Forbidden("Current password is incorrect".to_string()));
        }
        auth::validate_password(new_password)?;

        let patch = UserPatch {
            password_hash: Some(auth::hash_password(new_password)?),
            ..Default::default()
        };
        self.users.update(user.id, patch).await?;

        tracing::info!("Password changed for user {}", user.id);
        Ok(())
    }

    pub async fn start_password_reset(&self, phone: &str) -> Result<IssuedCode> {
        let phone = phone.trim();
        let user = self.users
            .find_by_phone(phone).await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        let country = user.country_code.as_deref().and_then(countries::find);
        self.verification.issue(phone, CodePurpose::PasswordReset, None, country).await
    }

    /// Check a reset code; the record stays for the reset step.
    pub async fn verify_reset_code(&self, phone: &str, code: &str) -> Result<()> {
        self.verification.verify_for(phone, code, CodePurpose::PasswordReset).await?;
        Ok(())
    }

    pub async fn reset_password(&self, phone: &str, code: &str, new_password: &str) -> Result<()> {
        auth::validate_password(new_password)?;
        let record = self.verification.verify_for(phone, code, CodePurpose::PasswordReset).await?;

        let user = self.users
            .find_by_phone(&record.phone).await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        let patch = UserPatch {
            password_hash: Some(auth::hash_password(new_password)?),
            ..Default::default()
        };
        self.users.update(user.id, patch).await?;
        self.verification.clear(&record.phone).await?;

        tracing::info!("Password reset for user {}", user.id);
        Ok(())
    }

    pub async fn cancel_password_reset(&self, phone: &str) -> Result<()> {
        self.verification.clear(phone).await
    }

    fn session_for(&self, user: user::Model) -> Result<AuthSession> {
        let role: Role = user.role.parse()?;
        let token = self.tokens.issue(user.id, role)?;
        Ok(AuthSession {
            token,
            user: UserSummary::from(user),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::db::{ CodeRepository, MemoryStore };

    const PHONE: &str = "+593991234567";

    struct Fixture {
        service: UserService,
        store: Arc<MemoryStore>,
        tokens: TokenIssuer,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let verification = Arc::new(
            VerificationService::new(store.clone(), Duration::minutes(5), Duration::zero())
        );
        let tokens = TokenIssuer::new("unit-test-secret-0123456789", Duration::hours(1));
        let service = UserService::new(store.clone(), verification, tokens.clone());
        Fixture { service, store, tokens }
    }

    fn registration() -> Registration {
        Registration {
            phone: PHONE.to_string(),
            email: Some("Ana@Example.com".to_string()),
            password: "secreto1".to_string(),
        }
    }

    impl Fixture {
        async fn register(&self) -> AuthSession {
            let issued = self.service.start_registration(registration()).await.unwrap();
            self.service
                .complete_registration(CompleteRegistration {
                    phone: PHONE.to_string(),
                    code: issued.code,
                    first_name: " Ana ".to_string(),
                    last_name: "Pérez".to_string(),
                    email: Some("ana@example.com".to_string()),
                }).await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_registration_creates_user_and_clears_code() {
        let f = fixture();
        let session = f.register().await;

        assert_eq!(session.user.country_code.as_deref(), Some("EC"));
        assert_eq!(session.user.first_name.as_deref(), Some("Ana"));
        assert_eq!(session.user.role, "usuario");
        assert!(f.store.find(PHONE).await.unwrap().is_none());

        let caller = f.tokens.verify(&session.token).unwrap();
        assert_eq!(caller.user_id, session.user.id);
    }

    #[tokio::test]
    async fn test_listed_phone_registers_as_admin() {
        let mut f = fixture();
        f.service = f.service.with_admin_phones(vec![PHONE.to_string()]);

        let session = f.register().await;
        assert_eq!(session.user.role, "administrador");
        assert!(f.tokens.verify(&session.token).unwrap().is_admin());
    }

    #[tokio::test]
    async fn test_duplicate_phone_is_conflict() {
        let f = fixture();
        f.register().await;

        let result = f.service.start_registration(registration()).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_short_password_is_rejected() {
        let f = fixture();
        let result = f.service
            .start_registration(Registration { password: "123".to_string(), ..registration() }).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_wrong_code_does_not_register() {
        let f = fixture();
        let issued = f.service.start_registration(registration()).await.unwrap();
        let wrong = if issued.code == "1234" { "4321" } else { "1234" };

        let result = f.service
            .complete_registration(CompleteRegistration {
                phone: PHONE.to_string(),
                code: wrong.to_string(),
                first_name: "Ana".to_string(),
                last_name: "Pérez".to_string(),
                email: None,
            }).await;

        assert!(matches!(result, Err(AppError::CodeMismatch)));
        assert!(f.store.find(PHONE).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_login_by_phone_or_email() {
        let f = fixture();
        f.register().await;

        assert!(f.service.login(PHONE, "secreto1").await.is_ok());
        assert!(f.service.login("ANA@example.com", "secreto1").await.is_ok());
        assert!(matches!(f.service.login(PHONE, "incorrecta").await, Err(AppError::Unauthorized)));
        assert!(matches!(
            f.service.login("+10000000000", "secreto1").await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let f = fixture();
        f.register().await;

        let issued = f.service.start_password_reset(PHONE).await.unwrap();
        assert_eq!(issued.code.len(), 6);

        f.service.verify_reset_code(PHONE, &issued.code).await.unwrap();
        f.service.reset_password(PHONE, &issued.code, "nueva-clave").await.unwrap();

        assert!(f.service.login(PHONE, "nueva-clave").await.is_ok());
        assert!(matches!(f.service.login(PHONE, "secreto1").await, Err(AppError::Unauthorized)));

        let reused = f.service.reset_password(PHONE, &issued.code, "otra-clave").await;
        assert!(matches!(reused, Err(AppError::CodeNotFound)));
    }

    #[tokio::test]
    async fn test_reset_for_unknown_phone_is_not_found() {
        let f = fixture();
        let result = f.service.start_password_reset("+573009999999").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_cancel_reset_clears_code() {
        let f = fixture();
        f.register().await;
        let issued = f.service.start_password_reset(PHONE).await.unwrap();

        f.service.cancel_password_reset(PHONE).await.unwrap();

        let result = f.service.verify_reset_code(PHONE, &issued.code).await;
        assert!(matches!(result, Err(AppError::CodeNotFound)));
    }

    #[tokio::test]
    async fn test_change_password_requires_current_one() {
        let f = fixture();
        let session = f.register().await;
        let caller = f.tokens.verify(&session.token).unwrap();

        let wrong = f.service.change_password(&caller, "no-es-esta", "nuevo-secreto").await;
        assert!(matches!(wrong, Err(AppError::Forbidden(_))));

        let short = f.service.change_password(&caller, "secreto1", "123").await;
        assert!(matches!(short, Err(AppError::Validation(_))));

        f.service.change_password(&caller, "secreto1", "nuevo-secreto").await.unwrap();
        assert!(matches!(f.service.login(PHONE, "secreto1").await, Err(AppError::Unauthorized)));
        assert!(f.service.login(PHONE, "nuevo-secreto").await.is_ok());
    }

    #[tokio::test]
    async fn test_complete_profile_requires_names() {
        let f = fixture();
        let session = f.register().await;
        let caller = f.tokens.verify(&session.token).unwrap();

        let result = f.service.complete_profile(&caller, "  ", "Pérez").await;
        assert!(matches!(result, Err(AppError::MissingField("first_name"))));

        let updated = f.service.complete_profile(&caller, "María", "Gómez").await.unwrap();
        assert_eq!(updated.first_name.as_deref(), Some("María"));
    }
}
