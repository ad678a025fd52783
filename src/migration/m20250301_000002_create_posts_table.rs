use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // Categories are referenced by id; deleting a category leaves its
        // posts uncategorized rather than deleting them.
        db.execute_unprepared(
            "CREATE TABLE IF NOT EXISTS posts (
                id SERIAL PRIMARY KEY,
                title VARCHAR(200) NOT NULL,
                slug VARCHAR(200) NOT NULL UNIQUE,
                excerpt VARCHAR(500),
                content TEXT NOT NULL,
                thumbnail_url VARCHAR(500),
                category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                view_count INTEGER NOT NULL DEFAULT 0,
                published_at TIMESTAMP,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .await?;

        db.execute_unprepared("CREATE INDEX IF NOT EXISTS idx_posts_slug ON posts(slug)")
            .await?;

        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_posts_category ON posts(category_id)",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TABLE IF EXISTS posts").await?;
        Ok(())
    }
}
