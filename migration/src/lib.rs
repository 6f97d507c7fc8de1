pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20261001_000001_content_tables;
mod m20261001_000002_engagements;
mod m20261001_000003_statistics;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_content_tables::Migration),
            Box::new(m20261001_000002_engagements::Migration),
            Box::new(m20261001_000003_statistics::Migration),
        ]
    }
}
