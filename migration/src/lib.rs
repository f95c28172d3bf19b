pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_users_table;
mod m20250101_000002_create_pending_codes_table;
mod m20250101_000003_create_rates_table;
mod m20250101_000004_create_payment_methods_tables;
mod m20250101_000005_create_transactions_table;
mod m20250101_000006_create_transactions_audit_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_users_table::Migration),
            Box::new(m20250101_000002_create_pending_codes_table::Migration),
            Box::new(m20250101_000003_create_rates_table::Migration),
            Box::new(m20250101_000004_create_payment_methods_tables::Migration),
            Box::new(m20250101_000005_create_transactions_table::Migration),
            Box::new(m20250101_000006_create_transactions_audit_table::Migration)
        ]
    }
}
