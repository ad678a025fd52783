use crate::error::{AppError, AppResult};
use crate::response::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::services::tag::TagService;
use axum::extract::{Path, Query};
use axum::{response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct TagResponse {
    pub id: i32,
    pub name: String,
    pub slug: String,
    /// Visible posts carrying this tag
    pub post_count: i64,
}

#[utoipa::path(
    get,
    path = "/api/v1/tags",
    responses(
        (status = 200, description = "All tags with usage counts", body = Vec<TagResponse>),
    ),
    tag = "tags"
)]
pub async fn list_tags(
    Extension(db): Extension<DatabaseConnection>,
) -> AppResult<impl IntoResponse> {
    let tags = TagService::new(db).list_tags_with_counts().await?;
    let response: Vec<TagResponse> = tags
        .into_iter()
        .map(|(t, post_count)| TagResponse {
            id: t.id,
            name: t.name,
            slug: t.slug,
            post_count,
        })
        .collect();
    Ok(ApiResponse::ok(response))
}

#[utoipa::path(
    get,
    path = "/api/v1/tags/{slug}/posts",
    params(
        ("slug" = String, Path, description = "Tag slug"),
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Visible posts carrying the tag", body = PaginatedResponse<super::post::PostResponse>),
        (status = 404, description = "Tag not found", body = AppError),
    ),
    tag = "tags"
)]
pub async fn get_posts_by_tag(
    Extension(db): Extension<DatabaseConnection>,
    Path(slug): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, per_page) = query.normalize();

    let (posts, total) = TagService::new(db.clone())
        .get_posts_by_tag(&slug, page, per_page)
        .await?;
    let items = super::post::decorate_posts(&db, posts).await?;

    Ok(Json(PaginatedResponse::new(items, total, page, per_page)))
}
