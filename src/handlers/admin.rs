use crate::error::{AppError, AppResult};
use crate::middleware::auth::{require_admin, AuthUser};
use crate::response::ApiResponse;
use crate::services::admin::AdminService;
use axum::{response::IntoResponse, Extension};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    pub total_posts: u64,
    pub published_posts: u64,
    pub draft_posts: u64,
    pub total_views: u64,
    pub total_comments: u64,
    pub total_guestbook_entries: u64,
    pub total_categories: u64,
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Dashboard statistics", body = StatsResponse),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "admin"
)]
pub async fn get_stats(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;

    let stats = AdminService::new(db).get_stats().await?;

    Ok(ApiResponse::ok(StatsResponse {
        total_posts: stats.total_posts,
        published_posts: stats.published_posts,
        draft_posts: stats.draft_posts,
        total_views: stats.total_views,
        total_comments: stats.total_comments,
        total_guestbook_entries: stats.total_guestbook_entries,
        total_categories: stats.total_categories,
    }))
}
