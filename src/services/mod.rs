pub mod verification_service;
pub mod quote_service;
pub mod payment_method_service;
pub mod transaction_service;
pub mod admin_service;
pub mod user_service;

pub use verification_service::VerificationService;
pub use quote_service::QuoteService;
pub use payment_method_service::PaymentMethodService;
pub use transaction_service::TransactionService;
pub use admin_service::AdminService;
pub use user_service::UserService;
