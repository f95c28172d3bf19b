//! Password hashing and session tokens.

use argon2::password_hash::{ rand_core::OsRng, SaltString };
use argon2::{ Argon2, PasswordHash, PasswordHasher, PasswordVerifier };
use chrono::{ Duration, Utc };
use jsonwebtoken::{ decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation };
use serde::{ Deserialize, Serialize };
use uuid::Uuid;

use crate::enums::Role;
use crate::error::{ AppError, Result };

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?
        .to_string();

    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e|
        AppError::Internal(format!("Invalid password hash: {}", e))
    )?;

    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(
            AppError::Validation(
                format!("Password must be at least {} characters", MIN_PASSWORD_LEN)
            )
        );
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// The authenticated principal of a request. Every service call that acts on
/// behalf of someone receives one of these explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn require_admin(&self) -> Result<()> {
        if !self.is_admin() {
            return Err(AppError::Forbidden("Administrator role required".to_string()));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, user_id: Uuid, role: Role) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e|
            AppError::Internal(format!("Failed to sign token: {}", e))
        )
    }

    pub fn verify(&self, token: &str) -> Result<Caller> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                tracing::debug!("Rejected session token: {}", e);
                AppError::Unauthorized
            })?;

        Ok(Caller {
            user_id: data.claims.sub,
            role: data.claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("secreto123").unwrap();
        assert!(verify_password("secreto123", &hash).unwrap());
        assert!(!verify_password("otra-clave", &hash).unwrap());
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn test_token_carries_role() {
        let issuer = TokenIssuer::new("test-secret-of-32-characters-long", Duration::hours(1));
        let user_id = Uuid::new_v4();
        let token = issuer.issue(user_id, Role::Administrador).unwrap();

        let caller = issuer.verify(&token).unwrap();
        assert_eq!(caller.user_id, user_id);
        assert!(caller.is_admin());
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let issuer = TokenIssuer::new("test-secret-of-32-characters-long", Duration::hours(1));
        let other = TokenIssuer::new("another-secret-entirely-different", Duration::hours(1));
        let token = other.issue(Uuid::new_v4(), Role::Usuario).unwrap();

        assert!(matches!(issuer.verify(&token), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let issuer = TokenIssuer::new("test-secret-of-32-characters-long", Duration::hours(-2));
        let token = issuer.issue(Uuid::new_v4(), Role::Usuario).unwrap();

        assert!(matches!(issuer.verify(&token), Err(AppError::Unauthorized)));
    }
}
