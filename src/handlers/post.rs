use crate::error::{AppError, AppResult};
use crate::middleware::auth::{require_admin, AuthUser};
use crate::models::{CategoryModel, PostModel};
use crate::response::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::services::category::CategoryService;
use crate::services::comment::CommentService;
use crate::services::post::PostService;
use crate::services::tag::TagService;
use crate::utils::render_markdown;
use axum::extract::{Path, Query};
use axum::{response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePostRequest {
    /// Post title (1-200 characters)
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Explicit slug override; derived from the title when omitted
    #[validate(length(max = 200))]
    pub slug: Option<String>,
    /// Short summary shown on cards
    #[validate(length(max = 500))]
    pub excerpt: Option<String>,
    /// Markdown body
    #[validate(length(min = 1))]
    pub content: String,
    pub thumbnail_url: Option<String>,
    pub category_id: Option<i32>,
    pub tags: Option<Vec<String>>,
    /// Publish immediately (or at `published_at` if scheduled)
    pub is_published: bool,
    /// Scheduled publication time (ISO 8601, naive UTC)
    pub published_at: Option<chrono::NaiveDateTime>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 200))]
    pub slug: Option<String>,
    #[validate(length(max = 500))]
    pub excerpt: Option<String>,
    #[validate(length(min = 1))]
    pub content: Option<String>,
    pub thumbnail_url: Option<String>,
    /// Present-and-null clears the category
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub category_id: Option<Option<i32>>,
    pub tags: Option<Vec<String>>,
    pub is_published: Option<bool>,
    pub published_at: Option<chrono::NaiveDateTime>,
}

/// Distinguishes an absent `category_id` (leave unchanged) from an explicit
/// null (clear the category).
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PostListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Category slug filter
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchPostsQuery {
    /// Substring matched against title, excerpt, and content
    pub q: Option<String>,
    /// Category slug filter
    pub category: Option<String>,
    /// Tag slug filter
    pub tag: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LimitQuery {
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryRef {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostResponse {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub thumbnail_url: Option<String>,
    pub category: Option<CategoryRef>,
    pub tags: Vec<String>,
    pub status: String,
    pub view_count: i32,
    pub comment_count: i64,
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostSummary {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub thumbnail_url: Option<String>,
    pub published_at: Option<String>,
}

impl From<&PostModel> for PostSummary {
    fn from(p: &PostModel) -> Self {
        Self {
            id: p.id,
            title: p.title.clone(),
            slug: p.slug.clone(),
            thumbnail_url: p.thumbnail_url.clone(),
            published_at: p.published_at.map(|t| t.to_string()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostDetailResponse {
    #[serde(flatten)]
    pub post: PostResponse,
    pub content: String,
    pub content_html: String,
    pub prev: Option<PostSummary>,
    pub next: Option<PostSummary>,
    pub related: Vec<PostSummary>,
}

/// Resolve category refs, tag lists, and comment counts for a page of
/// posts with one query each.
pub(crate) async fn decorate_posts(
    db: &DatabaseConnection,
    posts: Vec<PostModel>,
) -> AppResult<Vec<PostResponse>> {
    let post_ids: Vec<i32> = posts.iter().map(|p| p.id).collect();

    let tag_map = TagService::new(db.clone()).get_tags_for_posts(&post_ids).await?;
    let comment_counts = CommentService::new(db.clone())
        .counts_for_posts(&post_ids)
        .await?;
    let categories: HashMap<i32, CategoryModel> = CategoryService::new(db.clone())
        .list()
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    Ok(posts
        .into_iter()
        .map(|p| {
            let category = p.category_id.and_then(|cid| {
                categories.get(&cid).map(|c| CategoryRef {
                    id: c.id,
                    name: c.name.clone(),
                    slug: c.slug.clone(),
                })
            });
            PostResponse {
                id: p.id,
                title: p.title,
                slug: p.slug,
                excerpt: p.excerpt,
                thumbnail_url: p.thumbnail_url,
                category,
                tags: tag_map.get(&p.id).cloned().unwrap_or_default(),
                status: p.status,
                view_count: p.view_count,
                comment_count: comment_counts.get(&p.id).copied().unwrap_or(0),
                published_at: p.published_at.map(|t| t.to_string()),
                created_at: p.created_at.to_string(),
                updated_at: p.updated_at.to_string(),
            }
        })
        .collect())
}

#[utoipa::path(
    get,
    path = "/api/v1/posts",
    params(
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
        ("category" = Option<String>, Query, description = "Category slug filter"),
    ),
    responses(
        (status = 200, description = "Published posts, newest first", body = PaginatedResponse<PostResponse>),
        (status = 404, description = "Unknown category", body = AppError),
    ),
    tag = "posts"
)]
pub async fn list_posts(
    Extension(db): Extension<DatabaseConnection>,
    Query(query): Query<PostListQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, per_page) = PaginationQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .normalize();

    let category_id = match &query.category {
        Some(key) => Some(
            CategoryService::new(db.clone())
                .get_by_slug_or_name(key)
                .await?
                .id,
        ),
        None => None,
    };

    let (posts, total) = PostService::new(db.clone())
        .list_published(page, per_page, category_id)
        .await?;
    let items = decorate_posts(&db, posts).await?;

    Ok(Json(PaginatedResponse::new(items, total, page, per_page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/{slug}",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Post detail with neighbours and related posts", body = PostDetailResponse),
        (status = 404, description = "Post not found", body = AppError),
    ),
    tag = "posts"
)]
pub async fn get_post(
    Extension(db): Extension<DatabaseConnection>,
    Path(slug): Path<String>,
) -> AppResult<impl IntoResponse> {
    let service = PostService::new(db.clone());
    let post = service.get_visible_by_slug(&slug).await?;

    let (prev, next) = match post.published_at {
        Some(at) => service.get_adjacent(at).await?,
        None => (None, None),
    };
    let related = service.related(post.id, post.category_id, 3).await?;

    let content = post.content.clone();
    let content_html = render_markdown(&content);
    let mut decorated = decorate_posts(&db, vec![post]).await?;
    let post = decorated.remove(0);

    Ok(ApiResponse::ok(PostDetailResponse {
        post,
        content,
        content_html,
        prev: prev.as_ref().map(PostSummary::from),
        next: next.as_ref().map(PostSummary::from),
        related: related.iter().map(PostSummary::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/posts/{id}/view",
    params(("id" = i32, Path, description = "Post id")),
    responses(
        (status = 200, description = "View counted", body = String),
    ),
    tag = "posts"
)]
pub async fn count_view(
    Extension(db): Extension<DatabaseConnection>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    PostService::new(db).increment_view_count(id).await?;
    Ok(ApiResponse::ok("ok"))
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/popular",
    params(("limit" = Option<u64>, Query, description = "Max posts, default 5")),
    responses(
        (status = 200, description = "Most viewed posts", body = Vec<PostResponse>),
    ),
    tag = "posts"
)]
pub async fn popular_posts(
    Extension(db): Extension<DatabaseConnection>,
    Query(query): Query<LimitQuery>,
) -> AppResult<impl IntoResponse> {
    let limit = query.limit.unwrap_or(5).clamp(1, 20);
    let posts = PostService::new(db.clone()).popular(limit).await?;
    let items = decorate_posts(&db, posts).await?;
    Ok(ApiResponse::ok(items))
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/recent",
    params(("limit" = Option<u64>, Query, description = "Max posts, default 5")),
    responses(
        (status = 200, description = "Latest posts", body = Vec<PostResponse>),
    ),
    tag = "posts"
)]
pub async fn recent_posts(
    Extension(db): Extension<DatabaseConnection>,
    Query(query): Query<LimitQuery>,
) -> AppResult<impl IntoResponse> {
    let limit = query.limit.unwrap_or(5).clamp(1, 20);
    let posts = PostService::new(db.clone()).recent(limit).await?;
    let items = decorate_posts(&db, posts).await?;
    Ok(ApiResponse::ok(items))
}

#[utoipa::path(
    get,
    path = "/api/v1/search",
    params(
        ("q" = Option<String>, Query, description = "Search text"),
        ("category" = Option<String>, Query, description = "Category slug filter"),
        ("tag" = Option<String>, Query, description = "Tag slug filter"),
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Matching published posts", body = PaginatedResponse<PostResponse>),
    ),
    tag = "posts"
)]
pub async fn search_posts(
    Extension(db): Extension<DatabaseConnection>,
    Query(query): Query<SearchPostsQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, per_page) = PaginationQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .normalize();

    let category_id = match &query.category {
        Some(key) => Some(
            CategoryService::new(db.clone())
                .get_by_slug_or_name(key)
                .await?
                .id,
        ),
        None => None,
    };

    let (posts, total) = PostService::new(db.clone())
        .search(
            query.q.as_deref(),
            category_id,
            query.tag.as_deref(),
            page,
            per_page,
        )
        .await?;
    let items = decorate_posts(&db, posts).await?;

    Ok(Json(PaginatedResponse::new(items, total, page, per_page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/posts",
    security(("jwt_token" = [])),
    params(
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "All posts including drafts", body = PaginatedResponse<PostResponse>),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "posts"
)]
pub async fn admin_list_posts(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Query(query): Query<PaginationQuery>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;

    let (page, per_page) = query.normalize();
    let (posts, total) = PostService::new(db.clone()).list_all(page, per_page).await?;
    let items = decorate_posts(&db, posts).await?;

    Ok(Json(PaginatedResponse::new(items, total, page, per_page)))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/posts",
    security(("jwt_token" = [])),
    request_body = CreatePostRequest,
    responses(
        (status = 200, description = "Post created", body = PostResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 409, description = "Slug already exists", body = AppError),
    ),
    tag = "posts"
)]
pub async fn create_post(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Json(payload): Json<CreatePostRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    require_admin(&auth_user)?;

    let service = PostService::new(db.clone());
    let post = service
        .create(
            &payload.title,
            payload.slug,
            payload.excerpt,
            &payload.content,
            payload.thumbnail_url,
            payload.category_id,
            payload.is_published,
            payload.published_at,
        )
        .await?;

    if let Some(tags) = payload.tags {
        let tag_service = TagService::new(db.clone());
        let tags = tag_service.get_or_create_tags(tags).await?;
        tag_service
            .set_post_tags(post.id, tags.into_iter().map(|t| t.id).collect())
            .await?;
    }

    let mut decorated = decorate_posts(&db, vec![post]).await?;
    Ok(ApiResponse::ok(decorated.remove(0)))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/posts/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Post id")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Post updated", body = PostResponse),
        (status = 404, description = "Post not found", body = AppError),
    ),
    tag = "posts"
)]
pub async fn update_post(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdatePostRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    require_admin(&auth_user)?;

    let service = PostService::new(db.clone());
    let post = service
        .update(
            id,
            payload.title.as_deref(),
            payload.slug,
            payload.excerpt,
            payload.content.as_deref(),
            payload.thumbnail_url,
            payload.category_id,
            payload.is_published,
            payload.published_at,
        )
        .await?;

    if let Some(tags) = payload.tags {
        let tag_service = TagService::new(db.clone());
        let tags = tag_service.get_or_create_tags(tags).await?;
        tag_service
            .set_post_tags(post.id, tags.into_iter().map(|t| t.id).collect())
            .await?;
    }

    let mut decorated = decorate_posts(&db, vec![post]).await?;
    Ok(ApiResponse::ok(decorated.remove(0)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/posts/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post deleted", body = String),
        (status = 404, description = "Post not found", body = AppError),
    ),
    tag = "posts"
)]
pub async fn delete_post(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;

    PostService::new(db).delete(id).await?;
    Ok(ApiResponse::ok("Post deleted"))
}
