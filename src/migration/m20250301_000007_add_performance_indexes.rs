use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // Public listing and the grouped post-count query both filter on
        // (status, published_at).
        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_posts_status_published \
                ON posts(status, published_at DESC)",
        )
        .await?;

        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_posts_view_count ON posts(view_count DESC)",
        )
        .await?;

        // Sibling lookups and the delete-with-children existence check.
        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_categories_parent ON categories(parent_id)",
        )
        .await?;

        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_guestbook_created ON guestbook(created_at DESC)",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP INDEX IF EXISTS idx_posts_status_published")
            .await?;
        db.execute_unprepared("DROP INDEX IF EXISTS idx_posts_view_count")
            .await?;
        db.execute_unprepared("DROP INDEX IF EXISTS idx_categories_parent")
            .await?;
        db.execute_unprepared("DROP INDEX IF EXISTS idx_guestbook_created")
            .await?;
        Ok(())
    }
}
