pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_users_table;
mod m20260301_000002_create_quotes_table;
mod m20260301_000003_create_chats_table;
mod m20260301_000004_create_messages_table;
mod m20260301_000005_create_orders_table;
mod m20260301_000006_create_reviews_table;
mod m20260301_000007_create_provider_profiles_table;
mod m20260305_000001_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_users_table::Migration),
            Box::new(m20260301_000002_create_quotes_table::Migration),
            Box::new(m20260301_000003_create_chats_table::Migration),
            Box::new(m20260301_000004_create_messages_table::Migration),
            Box::new(m20260301_000005_create_orders_table::Migration),
            Box::new(m20260301_000006_create_reviews_table::Migration),
            Box::new(m20260301_000007_create_provider_profiles_table::Migration),
            Box::new(m20260305_000001_add_indexes::Migration),
        ]
    }
}
