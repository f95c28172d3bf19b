pub mod user;
pub mod pending_code;
pub mod rate;
pub mod origin_method;
pub mod payment_method;
pub mod transaction;
pub mod transaction_audit;

pub use user::Entity as User;
pub use pending_code::Entity as PendingCode;
pub use rate::Entity as Rate;
pub use origin_method::Entity as OriginMethod;
pub use payment_method::Entity as PaymentMethod;
pub use transaction::Entity as Transaction;
pub use transaction_audit::Entity as TransactionAudit;
