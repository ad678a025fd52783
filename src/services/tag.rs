use crate::error::{AppError, AppResult};
use crate::models::{post_tag, tag, PostModel, Tag, TagModel};
use crate::utils::slugify;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, QueryFilter, Set, Statement,
};

pub struct TagService {
    db: DatabaseConnection,
}

impl TagService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Get or create tags by name. Returns the matching models in order.
    pub async fn get_or_create_tags(&self, names: Vec<String>) -> AppResult<Vec<TagModel>> {
        let mut result = Vec::new();

        for name in names {
            let name = name.trim().to_lowercase();
            if name.is_empty() || name.len() > 50 {
                continue;
            }

            let slug = slugify(&name);
            if slug.is_empty() {
                continue;
            }

            let existing = Tag::find()
                .filter(tag::Column::Slug.eq(&slug))
                .one(&self.db)
                .await?;

            if let Some(tag) = existing {
                result.push(tag);
            } else {
                let now = chrono::Utc::now().naive_utc();
                let new_tag = tag::ActiveModel {
                    name: Set(name),
                    slug: Set(slug),
                    created_at: Set(now),
                    ..Default::default()
                };
                let tag = new_tag.insert(&self.db).await?;
                result.push(tag);
            }
        }

        Ok(result)
    }

    /// Replace the full tag set of a post.
    pub async fn set_post_tags(&self, post_id: i32, tag_ids: Vec<i32>) -> AppResult<()> {
        self.db
            .execute(Statement::from_sql_and_values(
                sea_orm::DatabaseBackend::Postgres,
                "DELETE FROM post_tags WHERE post_id = $1",
                vec![post_id.into()],
            ))
            .await?;

        for tag_id in tag_ids {
            let pt = post_tag::ActiveModel {
                post_id: Set(post_id),
                tag_id: Set(tag_id),
                ..Default::default()
            };
            pt.insert(&self.db).await?;
        }

        Ok(())
    }

    /// Tag names for a batch of posts, one query.
    pub async fn get_tags_for_posts(
        &self,
        post_ids: &[i32],
    ) -> AppResult<std::collections::HashMap<i32, Vec<String>>> {
        use std::collections::HashMap;

        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders: Vec<String> = post_ids
            .iter()
            .enumerate()
            .map(|(i, _)| format!("${}", i + 1))
            .collect();
        let sql = format!(
            "SELECT pt.post_id, t.name \
                FROM post_tags pt \
                INNER JOIN tags t ON t.id = pt.tag_id \
                WHERE pt.post_id IN ({}) \
                ORDER BY t.name",
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

        let mut map: HashMap<i32, Vec<String>> = HashMap::new();
        for row in rows {
            let pid: i32 = row.try_get_by_index(0)?;
            let name: String = row.try_get_by_index(1)?;
            map.entry(pid).or_default().push(name);
        }

        Ok(map)
    }

    /// Tags with their visible-post usage counts, for the sidebar tag
    /// cloud. Tags used only by drafts count as zero and still appear.
    pub async fn list_tags_with_counts(&self) -> AppResult<Vec<(TagModel, i64)>> {
        let rows = self
            .db
            .query_all(Statement::from_string(
                sea_orm::DatabaseBackend::Postgres,
                "SELECT t.id, t.name, t.slug, t.created_at, \
                    COUNT(p.id) FILTER (WHERE p.status = 'published' \
                        AND (p.published_at IS NULL OR p.published_at <= CURRENT_TIMESTAMP)) \
                        AS post_count \
                    FROM tags t \
                    LEFT JOIN post_tags pt ON pt.tag_id = t.id \
                    LEFT JOIN posts p ON p.id = pt.post_id \
                    GROUP BY t.id, t.name, t.slug, t.created_at \
                    ORDER BY t.name"
                    .to_string(),
            ))
            .await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            let model = TagModel {
                id: row.try_get_by_index(0)?,
                name: row.try_get_by_index(1)?,
                slug: row.try_get_by_index(2)?,
                created_at: row.try_get_by_index(3)?,
            };
            let count: i64 = row.try_get_by_index(4)?;
            result.push((model, count));
        }

        Ok(result)
    }

    /// Visible posts carrying a tag, paginated, newest first.
    pub async fn get_posts_by_tag(
        &self,
        tag_slug: &str,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<PostModel>, u64)> {
        let offset = page.saturating_sub(1) * per_page;

        let tag = Tag::find()
            .filter(tag::Column::Slug.eq(tag_slug))
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let count_result = self
            .db
            .query_one(Statement::from_sql_and_values(
                sea_orm::DatabaseBackend::Postgres,
                "SELECT COUNT(*) AS count FROM posts p \
                    INNER JOIN post_tags pt ON pt.post_id = p.id \
                    WHERE pt.tag_id = $1 AND p.status = 'published' \
                    AND (p.published_at IS NULL OR p.published_at <= CURRENT_TIMESTAMP)",
                vec![tag.id.into()],
            ))
            .await?
            .ok_or(AppError::Internal(anyhow::anyhow!("Count query failed")))?;

        let total: i64 = count_result.try_get_by_index(0)?;

        let posts = PostModel::find_by_statement(Statement::from_sql_and_values(
            sea_orm::DatabaseBackend::Postgres,
            "SELECT p.id, p.title, p.slug, p.excerpt, p.content, p.thumbnail_url, \
                p.category_id, p.status, p.view_count, p.published_at, p.created_at, p.updated_at \
                FROM posts p \
                INNER JOIN post_tags pt ON pt.post_id = p.id \
                WHERE pt.tag_id = $1 AND p.status = 'published' \
                AND (p.published_at IS NULL OR p.published_at <= CURRENT_TIMESTAMP) \
                ORDER BY p.published_at DESC \
                LIMIT $2 OFFSET $3",
            vec![
                tag.id.into(),
                (per_page as i64).into(),
                (offset as i64).into(),
            ],
        ))
        .all(&self.db)
        .await?;

        Ok((posts, total as u64))
    }
}
