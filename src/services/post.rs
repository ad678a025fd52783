use crate::{
    error::{AppError, AppResult},
    models::{post, Category, Post, PostModel},
    utils::slugify,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, Statement,
};

const POST_COLUMNS: &str = "p.id, p.title, p.slug, p.excerpt, p.content, p.thumbnail_url, \
    p.category_id, p.status, p.view_count, p.published_at, p.created_at, p.updated_at";

pub struct PostService {
    db: DatabaseConnection,
}

impl PostService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Publicly visible means published and past any scheduled date.
    fn visible() -> Condition {
        Condition::all()
            .add(post::Column::Status.eq(post::STATUS_PUBLISHED))
            .add(
                Condition::any()
                    .add(post::Column::PublishedAt.is_null())
                    .add(post::Column::PublishedAt.lte(chrono::Utc::now().naive_utc())),
            )
    }

    pub async fn list_published(
        &self,
        page: u64,
        per_page: u64,
        category_id: Option<i32>,
    ) -> AppResult<(Vec<PostModel>, u64)> {
        let mut query = Post::find().filter(Self::visible());
        if let Some(cid) = category_id {
            query = query.filter(post::Column::CategoryId.eq(cid));
        }

        let paginator = query
            .order_by_desc(post::Column::PublishedAt)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let posts = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((posts, total))
    }

    /// Every post regardless of status, newest first. Admin console listing.
    pub async fn list_all(&self, page: u64, per_page: u64) -> AppResult<(Vec<PostModel>, u64)> {
        let paginator = Post::find()
            .order_by_desc(post::Column::CreatedAt)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let posts = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((posts, total))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<PostModel> {
        Post::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn get_visible_by_slug(&self, slug: &str) -> AppResult<PostModel> {
        Post::find()
            .filter(post::Column::Slug.eq(slug))
            .filter(Self::visible())
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Previous and next visible posts around a publication timestamp.
    pub async fn get_adjacent(
        &self,
        published_at: chrono::NaiveDateTime,
    ) -> AppResult<(Option<PostModel>, Option<PostModel>)> {
        let prev = Post::find()
            .filter(Self::visible())
            .filter(post::Column::PublishedAt.lt(published_at))
            .order_by_desc(post::Column::PublishedAt)
            .one(&self.db)
            .await?;

        let next = Post::find()
            .filter(Self::visible())
            .filter(post::Column::PublishedAt.gt(published_at))
            .order_by_asc(post::Column::PublishedAt)
            .one(&self.db)
            .await?;

        Ok((prev, next))
    }

    pub async fn popular(&self, limit: u64) -> AppResult<Vec<PostModel>> {
        let posts = Post::find()
            .filter(Self::visible())
            .order_by_desc(post::Column::ViewCount)
            .limit(limit)
            .all(&self.db)
            .await?;
        Ok(posts)
    }

    pub async fn recent(&self, limit: u64) -> AppResult<Vec<PostModel>> {
        let posts = Post::find()
            .filter(Self::visible())
            .order_by_desc(post::Column::PublishedAt)
            .limit(limit)
            .all(&self.db)
            .await?;
        Ok(posts)
    }

    /// Visible posts from the same category, excluding the post itself.
    pub async fn related(
        &self,
        post_id: i32,
        category_id: Option<i32>,
        limit: u64,
    ) -> AppResult<Vec<PostModel>> {
        let mut query = Post::find()
            .filter(Self::visible())
            .filter(post::Column::Id.ne(post_id));
        if let Some(cid) = category_id {
            query = query.filter(post::Column::CategoryId.eq(cid));
        }

        let posts = query
            .order_by_desc(post::Column::PublishedAt)
            .limit(limit)
            .all(&self.db)
            .await?;
        Ok(posts)
    }

    /// Substring search over title, excerpt, and content, optionally scoped
    /// to a category and/or a tag slug.
    pub async fn search(
        &self,
        query: Option<&str>,
        category_id: Option<i32>,
        tag_slug: Option<&str>,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<PostModel>, u64)> {
        let offset = page.saturating_sub(1) * per_page;

        let mut conditions = vec![
            "p.status = 'published'".to_string(),
            "(p.published_at IS NULL OR p.published_at <= CURRENT_TIMESTAMP)".to_string(),
        ];
        let mut values: Vec<sea_orm::Value> = Vec::new();

        if let Some(q) = query.map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = format!("%{}%", q.replace('%', "\\%").replace('_', "\\_"));
            values.push(pattern.into());
            let idx = values.len();
            conditions.push(format!(
                "(p.title ILIKE ${idx} OR p.excerpt ILIKE ${idx} OR p.content ILIKE ${idx})"
            ));
        }

        if let Some(cid) = category_id {
            values.push(cid.into());
            conditions.push(format!("p.category_id = ${}", values.len()));
        }

        if let Some(tag) = tag_slug {
            values.push(tag.into());
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM post_tags pt \
                    INNER JOIN tags t ON t.id = pt.tag_id \
                    WHERE pt.post_id = p.id AND t.slug = ${})",
                values.len()
            ));
        }

        let where_clause = conditions.join(" AND ");

        let count_sql = format!("SELECT COUNT(*) AS count FROM posts p WHERE {where_clause}");
        let count_result = self
            .db
            .query_one(Statement::from_sql_and_values(
                sea_orm::DatabaseBackend::Postgres,
                &count_sql,
                values.clone(),
            ))
            .await?
            .ok_or(AppError::Internal(anyhow::anyhow!("Count query failed")))?;
        let total: i64 = count_result.try_get_by_index(0)?;

        let search_sql = format!(
            "SELECT {POST_COLUMNS} FROM posts p \
                WHERE {where_clause} \
                ORDER BY p.published_at DESC \
                LIMIT ${} OFFSET ${}",
            values.len() + 1,
            values.len() + 2
        );
        values.push((per_page as i64).into());
        values.push((offset as i64).into());

        let posts = PostModel::find_by_statement(Statement::from_sql_and_values(
            sea_orm::DatabaseBackend::Postgres,
            &search_sql,
            values,
        ))
        .all(&self.db)
        .await?;

        Ok((posts, total as u64))
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        title: &str,
        slug: Option<String>,
        excerpt: Option<String>,
        content: &str,
        thumbnail_url: Option<String>,
        category_id: Option<i32>,
        is_published: bool,
        published_at: Option<chrono::NaiveDateTime>,
    ) -> AppResult<PostModel> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Post title cannot be empty".to_string()));
        }

        let slug = slugify(slug.as_deref().unwrap_or(title));
        if slug.is_empty() {
            return Err(AppError::Validation(
                "Post title does not yield a usable slug".to_string(),
            ));
        }
        self.ensure_slug_free(&slug, None).await?;

        if let Some(cid) = category_id {
            Category::find_by_id(cid)
                .one(&self.db)
                .await?
                .ok_or_else(|| AppError::Validation("Category does not exist".to_string()))?;
        }

        let now = chrono::Utc::now().naive_utc();
        let (status, published_at) = if is_published {
            (post::STATUS_PUBLISHED, Some(published_at.unwrap_or(now)))
        } else {
            (post::STATUS_DRAFT, published_at)
        };

        let new_post = post::ActiveModel {
            title: Set(title.to_string()),
            slug: Set(slug),
            excerpt: Set(excerpt),
            content: Set(content.to_string()),
            thumbnail_url: Set(thumbnail_url),
            category_id: Set(category_id),
            status: Set(status.to_string()),
            view_count: Set(0),
            published_at: Set(published_at),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(new_post.insert(&self.db).await?)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update(
        &self,
        id: i32,
        title: Option<&str>,
        slug: Option<String>,
        excerpt: Option<String>,
        content: Option<&str>,
        thumbnail_url: Option<String>,
        category_id: Option<Option<i32>>,
        is_published: Option<bool>,
        published_at: Option<chrono::NaiveDateTime>,
    ) -> AppResult<PostModel> {
        let existing = self.get_by_id(id).await?;
        let now = chrono::Utc::now().naive_utc();

        let mut active: post::ActiveModel = existing.clone().into();

        if let Some(title) = title {
            let title = title.trim();
            if title.is_empty() {
                return Err(AppError::Validation("Post title cannot be empty".to_string()));
            }
            active.title = Set(title.to_string());

            // Re-derive the slug with the title unless one is pinned below.
            if slug.is_none() {
                let derived = slugify(title);
                if derived.is_empty() {
                    return Err(AppError::Validation(
                        "Post title does not yield a usable slug".to_string(),
                    ));
                }
                self.ensure_slug_free(&derived, Some(id)).await?;
                active.slug = Set(derived);
            }
        }

        if let Some(slug) = slug {
            let slug = slugify(&slug);
            if slug.is_empty() {
                return Err(AppError::Validation("Slug cannot be empty".to_string()));
            }
            self.ensure_slug_free(&slug, Some(id)).await?;
            active.slug = Set(slug);
        }

        if let Some(excerpt) = excerpt {
            active.excerpt = Set(Some(excerpt));
        }
        if let Some(content) = content {
            active.content = Set(content.to_string());
        }
        if let Some(thumbnail_url) = thumbnail_url {
            active.thumbnail_url = Set(Some(thumbnail_url));
        }

        if let Some(category_id) = category_id {
            if let Some(cid) = category_id {
                Category::find_by_id(cid)
                    .one(&self.db)
                    .await?
                    .ok_or_else(|| AppError::Validation("Category does not exist".to_string()))?;
            }
            active.category_id = Set(category_id);
        }

        if let Some(published) = is_published {
            if published {
                active.status = Set(post::STATUS_PUBLISHED.to_string());
                let effective = published_at.or(existing.published_at).unwrap_or(now);
                active.published_at = Set(Some(effective));
            } else {
                active.status = Set(post::STATUS_DRAFT.to_string());
            }
        } else if let Some(published_at) = published_at {
            active.published_at = Set(Some(published_at));
        }

        active.updated_at = Set(now);
        Ok(active.update(&self.db).await?)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.get_by_id(id).await?;
        Post::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }

    pub async fn increment_view_count(&self, id: i32) -> AppResult<()> {
        self.db
            .execute(Statement::from_sql_and_values(
                sea_orm::DatabaseBackend::Postgres,
                "UPDATE posts SET view_count = view_count + 1 WHERE id = $1",
                [id.into()],
            ))
            .await?;
        Ok(())
    }

    async fn ensure_slug_free(&self, slug: &str, exclude_id: Option<i32>) -> AppResult<()> {
        let mut query = Post::find().filter(post::Column::Slug.eq(slug));
        if let Some(id) = exclude_id {
            query = query.filter(post::Column::Id.ne(id));
        }
        if query.one(&self.db).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Post slug '{}' already exists",
                slug
            )));
        }
        Ok(())
    }
}
