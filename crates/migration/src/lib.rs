//! Migrator registering CDN storage migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_storage_configuration;
mod m20240101_000002_create_category;
mod m20240101_000003_create_folder;
mod m20240101_000004_create_file_metadata;
mod m20240101_000005_create_usage_statistic;
mod m20240101_000006_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_storage_configuration::Migration),
            Box::new(m20240101_000002_create_category::Migration),
            Box::new(m20240101_000003_create_folder::Migration),
            Box::new(m20240101_000004_create_file_metadata::Migration),
            Box::new(m20240101_000005_create_usage_statistic::Migration),
            // Indexes should always be applied last
            Box::new(m20240101_000006_add_indexes::Migration),
        ]
    }
}
