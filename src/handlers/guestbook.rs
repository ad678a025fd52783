use crate::error::{AppError, AppResult};
use crate::middleware::auth::{require_admin, AuthUser, MaybeAuthUser};
use crate::models::GuestbookModel;
use crate::response::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::services::guestbook::GuestbookService;
use axum::extract::{Path, Query};
use axum::{response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateGuestbookEntryRequest {
    /// Display name (1-50 characters)
    #[validate(length(min = 1, max = 50))]
    pub author_name: String,
    #[validate(email)]
    pub author_email: Option<String>,
    /// Edit password for later update/delete (4+ characters)
    #[validate(length(min = 4, max = 100))]
    pub password: String,
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
    /// Visible only to the blog owner
    pub is_private: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateGuestbookEntryRequest {
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
    #[validate(length(min = 4, max = 100))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DeleteGuestbookEntryRequest {
    #[validate(length(min = 4, max = 100))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdminReplyRequest {
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GuestbookEntryResponse {
    pub id: i32,
    pub parent_id: Option<i32>,
    pub author_name: String,
    pub content: String,
    pub content_html: String,
    pub is_private: bool,
    pub is_admin_reply: bool,
    pub created_at: String,
    pub updated_at: String,
    pub replies: Vec<GuestbookEntryResponse>,
}

impl GuestbookEntryResponse {
    fn from_model(e: GuestbookModel, unmask: bool) -> Self {
        let visible = !e.is_private || unmask;
        let content = if visible { e.content } else { String::new() };
        let content_html = if visible {
            crate::utils::render_markdown(&content)
        } else {
            String::new()
        };
        Self {
            id: e.id,
            parent_id: e.parent_id,
            author_name: e.author_name,
            content,
            content_html,
            is_private: e.is_private,
            is_admin_reply: e.is_admin_reply,
            created_at: e.created_at.to_string(),
            updated_at: e.updated_at.to_string(),
            replies: Vec::new(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/guestbook",
    params(
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Guestbook entries with replies", body = PaginatedResponse<GuestbookEntryResponse>),
    ),
    tag = "guestbook"
)]
pub async fn list_entries(
    Extension(db): Extension<DatabaseConnection>,
    maybe_user: MaybeAuthUser,
    Query(query): Query<PaginationQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, per_page) = query.normalize();
    let unmask = maybe_user.is_admin();

    let (entries, total) = GuestbookService::new(db).list(page, per_page).await?;
    let items: Vec<GuestbookEntryResponse> = entries
        .into_iter()
        .map(|(root, replies)| {
            let mut response = GuestbookEntryResponse::from_model(root, unmask);
            response.replies = replies
                .into_iter()
                .map(|r| GuestbookEntryResponse::from_model(r, unmask))
                .collect();
            response
        })
        .collect();

    Ok(Json(PaginatedResponse::new(items, total, page, per_page)))
}

#[utoipa::path(
    post,
    path = "/api/v1/guestbook",
    request_body = CreateGuestbookEntryRequest,
    responses(
        (status = 200, description = "Entry created", body = GuestbookEntryResponse),
        (status = 400, description = "Validation error", body = AppError),
    ),
    tag = "guestbook"
)]
pub async fn create_entry(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<CreateGuestbookEntryRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let entry = GuestbookService::new(db)
        .create(
            &payload.author_name,
            payload.author_email,
            &payload.password,
            &payload.content,
            payload.is_private.unwrap_or(false),
        )
        .await?;

    Ok(ApiResponse::ok(GuestbookEntryResponse::from_model(
        entry, true,
    )))
}

#[utoipa::path(
    put,
    path = "/api/v1/guestbook/{id}",
    params(("id" = i32, Path, description = "Entry id")),
    request_body = UpdateGuestbookEntryRequest,
    responses(
        (status = 200, description = "Entry updated", body = GuestbookEntryResponse),
        (status = 403, description = "Wrong password", body = AppError),
        (status = 404, description = "Entry not found", body = AppError),
    ),
    tag = "guestbook"
)]
pub async fn update_entry(
    Extension(db): Extension<DatabaseConnection>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateGuestbookEntryRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let entry = GuestbookService::new(db)
        .update(id, &payload.content, &payload.password)
        .await?;

    Ok(ApiResponse::ok(GuestbookEntryResponse::from_model(
        entry, true,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/guestbook/{id}",
    params(("id" = i32, Path, description = "Entry id")),
    request_body = DeleteGuestbookEntryRequest,
    responses(
        (status = 200, description = "Entry deleted", body = String),
        (status = 403, description = "Wrong password", body = AppError),
        (status = 404, description = "Entry not found", body = AppError),
    ),
    tag = "guestbook"
)]
pub async fn delete_entry(
    Extension(db): Extension<DatabaseConnection>,
    Path(id): Path<i32>,
    Json(payload): Json<DeleteGuestbookEntryRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    GuestbookService::new(db)
        .delete(id, &payload.password)
        .await?;
    Ok(ApiResponse::ok("Entry deleted"))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/guestbook/{id}/reply",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Parent entry id")),
    request_body = AdminReplyRequest,
    responses(
        (status = 200, description = "Reply created", body = GuestbookEntryResponse),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Entry not found", body = AppError),
    ),
    tag = "guestbook"
)]
pub async fn admin_reply(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<AdminReplyRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    require_admin(&auth_user)?;

    let entry = GuestbookService::new(db)
        .admin_reply(id, &payload.content)
        .await?;

    Ok(ApiResponse::ok(GuestbookEntryResponse::from_model(
        entry, true,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/guestbook/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Entry id")),
    responses(
        (status = 200, description = "Entry deleted", body = String),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Entry not found", body = AppError),
    ),
    tag = "guestbook"
)]
pub async fn admin_delete_entry(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;

    GuestbookService::new(db).admin_delete(id).await?;
    Ok(ApiResponse::ok("Entry deleted"))
}
