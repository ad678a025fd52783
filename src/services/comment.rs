use crate::{
    error::{AppError, AppResult},
    models::{comment, Comment, CommentModel, Post},
    utils::{hash_password, verify_password},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, Statement,
};
use std::collections::HashMap;

pub struct CommentService {
    db: DatabaseConnection,
}

impl CommentService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_by_post(&self, post_id: i32) -> AppResult<Vec<CommentModel>> {
        let comments = Comment::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_asc(comment::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(comments)
    }

    pub async fn recent(&self, limit: u64) -> AppResult<Vec<CommentModel>> {
        let comments = Comment::find()
            .order_by_desc(comment::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await?;
        Ok(comments)
    }

    /// Comment counts for a batch of posts, one query.
    pub async fn counts_for_posts(&self, post_ids: &[i32]) -> AppResult<HashMap<i32, i64>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders: Vec<String> = post_ids
            .iter()
            .enumerate()
            .map(|(i, _)| format!("${}", i + 1))
            .collect();
        let sql = format!(
            "SELECT post_id, COUNT(*) AS count FROM comments \
                WHERE post_id IN ({}) \
                GROUP BY post_id",
            placeholders.join(", ")
        );

        let values: Vec<sea_orm::Value> = post_ids.iter().map(|&id| id.into()).collect();
        let rows = self
            .db
            .query_all(Statement::from_sql_and_values(
                sea_orm::DatabaseBackend::Postgres,
                &sql,
                values,
            ))
            .await?;

        let mut map = HashMap::new();
        for row in rows {
            let pid: i32 = row.try_get_by_index(0)?;
            let count: i64 = row.try_get_by_index(1)?;
            map.insert(pid, count);
        }

        Ok(map)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        post_id: i32,
        parent_id: Option<i32>,
        author_name: &str,
        author_email: Option<String>,
        password: &str,
        content: &str,
        is_private: bool,
    ) -> AppResult<CommentModel> {
        Post::find_by_id(post_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        if let Some(pid) = parent_id {
            self.validate_parent(pid, post_id).await?;
        }

        let password_hash = hash_password(password)?;
        let now = chrono::Utc::now().naive_utc();

        let new_comment = comment::ActiveModel {
            post_id: Set(post_id),
            parent_id: Set(parent_id),
            author_name: Set(author_name.trim().to_string()),
            author_email: Set(author_email),
            password_hash: Set(password_hash),
            content: Set(content.to_string()),
            is_private: Set(is_private),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(new_comment.insert(&self.db).await?)
    }

    /// Edit rights are proven with the comment's own password.
    pub async fn update(&self, id: i32, content: &str, password: &str) -> AppResult<CommentModel> {
        let existing = self.get_by_id(id).await?;
        self.check_password(&existing, password)?;

        let mut active: comment::ActiveModel = existing.into();
        active.content = Set(content.to_string());
        active.updated_at = Set(chrono::Utc::now().naive_utc());

        Ok(active.update(&self.db).await?)
    }

    /// Replies go with the parent (ON DELETE CASCADE on parent_id).
    pub async fn delete(&self, id: i32, password: &str) -> AppResult<()> {
        let existing = self.get_by_id(id).await?;
        self.check_password(&existing, password)?;

        Comment::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }

    /// Moderation path: no password involved.
    pub async fn admin_delete(&self, id: i32) -> AppResult<()> {
        self.get_by_id(id).await?;
        Comment::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<CommentModel> {
        Comment::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    fn check_password(&self, comment: &CommentModel, password: &str) -> AppResult<()> {
        if !verify_password(password, &comment.password_hash)? {
            return Err(AppError::Forbidden);
        }
        Ok(())
    }

    async fn validate_parent(&self, parent_id: i32, post_id: i32) -> AppResult<()> {
        let parent = Comment::find_by_id(parent_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::Validation("Parent comment not found".to_string()))?;

        if parent.post_id != post_id {
            return Err(AppError::Validation(
                "Parent comment belongs to a different post".to_string(),
            ));
        }

        // The thread renders a single reply level.
        if parent.parent_id.is_some() {
            return Err(AppError::Validation(
                "Replies to replies are not supported".to_string(),
            ));
        }

        Ok(())
    }
}
