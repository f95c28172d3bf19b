use std::env;

use chrono::Duration;

/// Where records are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres(String),
    /// Process-local store, for development and tests.
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageBackend,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub code_ttl_minutes: i64,
    pub code_resend_cooldown_seconds: i64,
    pub token_ttl_hours: i64,
    pub echo_verification_codes: bool,
    pub seed_default_data: bool,
    /// Phones that register straight into the administrator role.
    pub admin_phones: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv::dotenv().ok();

        let database_url = env::var("DATABASE_URL")?;
        let storage = if database_url.trim().eq_ignore_ascii_case("memory") {
            StorageBackend::Memory
        } else {
            StorageBackend::Postgres(database_url)
        };

        let jwt_secret = env::var("JWT_SECRET")?;
        if jwt_secret.len() < 16 {
            return Err("JWT_SECRET must be at least 16 characters".into());
        }

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()?;

        let code_ttl_minutes: i64 = env::var("CODE_TTL_MINUTES")
            .unwrap_or_else(|_| "5".to_string())
            .parse()?;
        if code_ttl_minutes <= 0 {
            return Err("CODE_TTL_MINUTES must be positive".into());
        }

        let code_resend_cooldown_seconds: i64 = env::var("CODE_RESEND_COOLDOWN_SECONDS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()?;
        if code_resend_cooldown_seconds < 0 {
            return Err("CODE_RESEND_COOLDOWN_SECONDS cannot be negative".into());
        }

        let token_ttl_hours = env::var("TOKEN_TTL_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()?;

        let echo_verification_codes = Self::parse_flag(
            "ECHO_VERIFICATION_CODES",
            storage == StorageBackend::Memory
        )?;
        let seed_default_data = Self::parse_flag(
            "SEED_DEFAULT_DATA",
            storage == StorageBackend::Memory
        )?;

        let admin_phones = env::var("ADMIN_PHONES")
            .unwrap_or_default()
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        Ok(Config {
            storage,
            jwt_secret,
            server_host,
            server_port,
            code_ttl_minutes,
            code_resend_cooldown_seconds,
            token_ttl_hours,
            echo_verification_codes,
            seed_default_data,
            admin_phones,
        })
    }

    fn parse_flag(key: &str, default: bool) -> Result<bool, Box<dyn std::error::Error>> {
        match env::var(key) {
            Err(_) => Ok(default),
            Ok(val) =>
                match val.trim().to_lowercase().as_str() {
                    "1" | "true" | "yes" => Ok(true),
                    "0" | "false" | "no" => Ok(false),
                    _ => Err(format!("{} must be true or false", key).into()),
                }
        }
    }

    pub fn code_ttl(&self) -> Duration {
        Duration::minutes(self.code_ttl_minutes)
    }

    pub fn resend_cooldown(&self) -> Duration {
        Duration::seconds(self.code_resend_cooldown_seconds)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::hours(self.token_ttl_hours)
    }

    /// Settings for tests and local runs against the in-memory store.
    pub fn for_memory(jwt_secret: &str) -> Self {
        Config {
            storage: StorageBackend::Memory,
            jwt_secret: jwt_secret.to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 8080,
            code_ttl_minutes: 5,
            code_resend_cooldown_seconds: 0,
            token_ttl_hours: 24,
            echo_verification_codes: true,
            seed_default_data: true,
            admin_phones: Vec::new(),
        }
    }
}
