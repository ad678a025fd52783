use sea_orm_migration::prelude::*;

mod m20250301_000001_create_categories_table;
mod m20250301_000002_create_posts_table;
mod m20250301_000003_create_tags_tables;
mod m20250301_000004_create_comments_table;
mod m20250301_000005_create_guestbook_table;
mod m20250301_000006_create_site_settings_table;
mod m20250301_000007_add_performance_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_categories_table::Migration),
            Box::new(m20250301_000002_create_posts_table::Migration),
            Box::new(m20250301_000003_create_tags_tables::Migration),
            Box::new(m20250301_000004_create_comments_table::Migration),
            Box::new(m20250301_000005_create_guestbook_table::Migration),
            Box::new(m20250301_000006_create_site_settings_table::Migration),
            Box::new(m20250301_000007_add_performance_indexes::Migration),
        ]
    }
}
