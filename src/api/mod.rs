use std::sync::Arc;

use axum::{ routing::{ get, post, put }, Router };
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod extract;
pub mod auth;
pub mod verification;
pub mod rates;
pub mod payment_methods;
pub mod transactions;
pub mod admin;
pub mod stream;

use crate::auth::TokenIssuer;
use crate::config::Config;
use crate::enums::CodePurpose;
use crate::db::Repositories;
use crate::error::Result;
use crate::feed::ChangeFeed;
use crate::services::{
    AdminService,
    PaymentMethodService,
    QuoteService,
    TransactionService,
    UserService,
    VerificationService,
};
use crate::services::verification_service::IssuedCode;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tokens: TokenIssuer,
    pub feed: ChangeFeed,
    pub verification_service: Arc<VerificationService>,
    pub user_service: Arc<UserService>,
    pub quote_service: Arc<QuoteService>,
    pub payment_method_service: Arc<PaymentMethodService>,
    pub transaction_service: Arc<TransactionService>,
    pub admin_service: Arc<AdminService>,
}

impl AppState {
    pub fn new(config: Config, repos: Repositories) -> Self {
        let tokens = TokenIssuer::new(&config.jwt_secret, config.token_ttl());
        let feed = ChangeFeed::new();

        let verification_service = Arc::new(
            VerificationService::new(repos.codes.clone(), config.code_ttl(), config.resend_cooldown())
        );
        let user_service = Arc::new(
            UserService::new(
                repos.users.clone(),
                verification_service.clone(),
                tokens.clone()
            ).with_admin_phones(config.admin_phones.clone())
        );
        let quote_service = Arc::new(QuoteService::new(repos.rates.clone()));
        let payment_method_service = Arc::new(
            PaymentMethodService::new(repos.origin_methods.clone(), repos.payment_methods.clone())
        );
        let transaction_service = Arc::new(
            TransactionService::new(
                repos.users.clone(),
                repos.transactions.clone(),
                repos.origin_methods.clone(),
                repos.payment_methods.clone(),
                quote_service.clone(),
                feed.clone()
            )
        );
        let admin_service = Arc::new(
            AdminService::new(
                repos.users.clone(),
                repos.transactions.clone(),
                repos.origin_methods.clone(),
                repos.payment_methods.clone(),
                repos.audit.clone(),
                transaction_service.clone()
            )
        );

        Self {
            config: Arc::new(config),
            tokens,
            feed,
            verification_service,
            user_service,
            quote_service,
            payment_method_service,
            transaction_service,
            admin_service,
        }
    }

    /// Load the default rate table and origin methods into empty tables.
    pub async fn seed_defaults(&self) -> Result<()> {
        self.quote_service.seed_defaults().await?;
        self.payment_method_service.seed_defaults().await?;
        Ok(())
    }

    /// Codes are only echoed back while no real delivery channel exists.
    /// Reset codes prove ownership of an existing account and are never echoed.
    pub(crate) fn echo(&self, issued: &IssuedCode) -> Option<String> {
        if !self.config.echo_verification_codes || issued.purpose == CodePurpose::PasswordReset {
            return None;
        }
        Some(issued.code.clone())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Accounts
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/register/verify", post(auth::verify_registration))
        .route("/api/auth/register/complete", post(auth::complete_registration))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/password/forgot", post(auth::forgot_password))
        .route("/api/auth/password/verify", post(auth::verify_reset_code))
        .route("/api/auth/password/reset", post(auth::reset_password))
        .route("/api/auth/password/cancel", post(auth::cancel_reset))
        .route("/api/profile", get(auth::get_profile).put(auth::update_profile))
        .route("/api/profile/password", put(auth::change_password))
        // Standalone verification service
        .route("/api/resend-code", post(verification::resend_code))
        .route("/api/verify-code", post(verification::verify_code))
        // Rates and quotes
        .route("/api/rates", get(rates::list_rates))
        .route("/api/quote", get(rates::quote))
        // Payment methods
        .route("/api/payment-methods/origin", get(payment_methods::list_origin))
        .route(
            "/api/payment-methods",
            get(payment_methods::list_methods).post(payment_methods::add_method)
        )
        // Transactions
        .route(
            "/api/transactions",
            get(transactions::list_transactions).post(transactions::create_transaction)
        )
        .route("/api/transactions/{id}", get(transactions::get_transaction))
        .route("/api/transactions/{id}/origin-method", put(transactions::select_origin_method))
        .route(
            "/api/transactions/{id}/destination-method",
            put(transactions::select_destination_method)
        )
        .route("/api/transactions/{id}/confirm", post(transactions::confirm_summary))
        .route(
            "/api/transactions/{id}/payment-reference",
            post(transactions::submit_payment_reference)
        )
        // Admin
        .route("/api/admin/transactions", get(admin::list_transactions))
        .route("/api/admin/transactions/stream", get(stream::transaction_stream))
        .route("/api/admin/transactions/{id}", get(admin::transaction_detail))
        .route("/api/admin/transactions/{id}/status", put(admin::set_status))
        .route("/api/admin/transactions/{id}/audit", get(admin::audit_trail))
        .route("/api/admin/dashboard", get(admin::dashboard))
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/users/{id}/role", put(admin::set_role))
        .route("/api/admin/rates", post(rates::upsert_rate))
        .route("/api/admin/rates/{id}", put(rates::update_rate))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health_check() -> &'static str {
    "OK"
}
