use crate::{
    error::{AppError, AppResult},
    models::{guestbook, Guestbook, GuestbookModel},
    utils::{hash_password, verify_password},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::collections::HashMap;

pub const ADMIN_AUTHOR_NAME: &str = "Admin";

pub struct GuestbookService {
    db: DatabaseConnection,
}

impl GuestbookService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Root entries newest first, each with its replies oldest first.
    pub async fn list(
        &self,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<(GuestbookModel, Vec<GuestbookModel>)>, u64)> {
        let paginator = Guestbook::find()
            .filter(guestbook::Column::ParentId.is_null())
            .order_by_desc(guestbook::Column::CreatedAt)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let roots = paginator.fetch_page(page.saturating_sub(1)).await?;

        if roots.is_empty() {
            return Ok((Vec::new(), total));
        }

        let root_ids: Vec<i32> = roots.iter().map(|e| e.id).collect();
        let replies = Guestbook::find()
            .filter(guestbook::Column::ParentId.is_in(root_ids))
            .order_by_asc(guestbook::Column::CreatedAt)
            .all(&self.db)
            .await?;

        let mut by_parent: HashMap<i32, Vec<GuestbookModel>> = HashMap::new();
        for reply in replies {
            if let Some(pid) = reply.parent_id {
                by_parent.entry(pid).or_default().push(reply);
            }
        }

        let entries = roots
            .into_iter()
            .map(|root| {
                let replies = by_parent.remove(&root.id).unwrap_or_default();
                (root, replies)
            })
            .collect();

        Ok((entries, total))
    }

    pub async fn create(
        &self,
        author_name: &str,
        author_email: Option<String>,
        password: &str,
        content: &str,
        is_private: bool,
    ) -> AppResult<GuestbookModel> {
        let password_hash = hash_password(password)?;
        let now = chrono::Utc::now().naive_utc();

        let entry = guestbook::ActiveModel {
            parent_id: Set(None),
            author_name: Set(author_name.trim().to_string()),
            author_email: Set(author_email),
            password_hash: Set(Some(password_hash)),
            content: Set(content.to_string()),
            is_private: Set(is_private),
            is_admin_reply: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(entry.insert(&self.db).await?)
    }

    pub async fn update(&self, id: i32, content: &str, password: &str) -> AppResult<GuestbookModel> {
        let existing = self.get_by_id(id).await?;
        self.check_password(&existing, password)?;

        let mut active: guestbook::ActiveModel = existing.into();
        active.content = Set(content.to_string());
        active.updated_at = Set(chrono::Utc::now().naive_utc());

        Ok(active.update(&self.db).await?)
    }

    /// Replies go with the entry (ON DELETE CASCADE on parent_id).
    pub async fn delete(&self, id: i32, password: &str) -> AppResult<()> {
        let existing = self.get_by_id(id).await?;
        self.check_password(&existing, password)?;

        Guestbook::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }

    /// Owner's reply under a visitor entry; carries no edit password.
    pub async fn admin_reply(&self, parent_id: i32, content: &str) -> AppResult<GuestbookModel> {
        let parent = self.get_by_id(parent_id).await?;
        if parent.parent_id.is_some() {
            return Err(AppError::Validation(
                "Replies to replies are not supported".to_string(),
            ));
        }

        let now = chrono::Utc::now().naive_utc();
        let entry = guestbook::ActiveModel {
            parent_id: Set(Some(parent_id)),
            author_name: Set(ADMIN_AUTHOR_NAME.to_string()),
            author_email: Set(None),
            password_hash: Set(None),
            content: Set(content.to_string()),
            is_private: Set(false),
            is_admin_reply: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(entry.insert(&self.db).await?)
    }

    /// Moderation path: no password involved.
    pub async fn admin_delete(&self, id: i32) -> AppResult<()> {
        self.get_by_id(id).await?;
        Guestbook::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<GuestbookModel> {
        Guestbook::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    fn check_password(&self, entry: &GuestbookModel, password: &str) -> AppResult<()> {
        // Admin replies have no password; they are managed via admin_delete.
        let hash = entry
            .password_hash
            .as_deref()
            .ok_or(AppError::Forbidden)?;
        if !verify_password(password, hash)? {
            return Err(AppError::Forbidden);
        }
        Ok(())
    }
}
