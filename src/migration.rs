pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_domain_tables;
mod m20250101_000002_create_admin_session_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migration_table_name() -> sea_orm::DynIden {
        Alias::new("seatmap_migrations").into_iden()
    }

    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_domain_tables::Migration),
            Box::new(m20250101_000002_create_admin_session_table::Migration),
        ]
    }
}
