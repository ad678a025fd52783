use crate::{
    error::AppResult,
    models::{post, Category, Comment, Guestbook, Post},
};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Statement,
};

pub struct AdminService {
    db: DatabaseConnection,
}

impl AdminService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Stat cards for the admin dashboard.
    pub async fn get_stats(&self) -> AppResult<AdminStats> {
        let total_posts = Post::find().count(&self.db).await?;
        let published_posts = Post::find()
            .filter(post::Column::Status.eq(post::STATUS_PUBLISHED))
            .count(&self.db)
            .await?;
        let draft_posts = Post::find()
            .filter(post::Column::Status.eq(post::STATUS_DRAFT))
            .count(&self.db)
            .await?;
        let total_comments = Comment::find().count(&self.db).await?;
        let total_guestbook_entries = Guestbook::find().count(&self.db).await?;
        let total_categories = Category::find().count(&self.db).await?;

        let total_views = self
            .db
            .query_one(Statement::from_string(
                sea_orm::DatabaseBackend::Postgres,
                "SELECT COALESCE(SUM(view_count), 0)::BIGINT AS total FROM posts".to_string(),
            ))
            .await?
            .map(|row| row.try_get_by_index::<i64>(0))
            .transpose()?
            .unwrap_or(0);

        Ok(AdminStats {
            total_posts,
            published_posts,
            draft_posts,
            total_views: total_views as u64,
            total_comments,
            total_guestbook_entries,
            total_categories,
        })
    }
}

pub struct AdminStats {
    pub total_posts: u64,
    pub published_posts: u64,
    pub draft_posts: u64,
    pub total_views: u64,
    pub total_comments: u64,
    pub total_guestbook_entries: u64,
    pub total_categories: u64,
}
