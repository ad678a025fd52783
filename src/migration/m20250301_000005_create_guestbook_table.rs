use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // password_hash is nullable: admin replies carry no edit password.
        db.execute_unprepared(
            "CREATE TABLE IF NOT EXISTS guestbook (
                id SERIAL PRIMARY KEY,
                parent_id INTEGER REFERENCES guestbook(id) ON DELETE CASCADE,
                author_name VARCHAR(50) NOT NULL,
                author_email VARCHAR(200),
                password_hash VARCHAR(100),
                content TEXT NOT NULL,
                is_private BOOLEAN NOT NULL DEFAULT FALSE,
                is_admin_reply BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .await?;

        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_guestbook_parent ON guestbook(parent_id)",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TABLE IF EXISTS guestbook")
            .await?;
        Ok(())
    }
}
