pub mod config;
pub mod countries;
pub mod enums;
pub mod error;
pub mod auth;
pub mod feed;
pub mod db;
pub mod services;
pub mod api;

pub use config::Config;
pub use enums::{ CodePurpose, MethodKind, RateOperation, Role, TxStatus };
pub use error::{ AppError, Result };
