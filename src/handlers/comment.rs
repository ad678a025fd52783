use crate::error::{AppError, AppResult};
use crate::middleware::auth::{require_admin, AuthUser, MaybeAuthUser};
use crate::models::CommentModel;
use crate::response::ApiResponse;
use crate::services::comment::CommentService;
use axum::extract::{Path, Query};
use axum::{response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCommentRequest {
    pub parent_id: Option<i32>,
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
pub struct UpdateCommentRequest {
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
    #[validate(length(min = 4, max = 100))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DeleteCommentRequest {
    #[validate(length(min = 4, max = 100))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecentQuery {
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentResponse {
    pub id: i32,
    pub post_id: i32,
    pub parent_id: Option<i32>,
    pub author_name: String,
    pub content: String,
    pub content_html: String,
    pub is_private: bool,
    pub created_at: String,
    pub updated_at: String,
    pub replies: Vec<CommentResponse>,
}

impl CommentResponse {
    /// Private comments are readable only by the blog owner; everyone else
    /// sees an empty body.
    fn from_model(c: CommentModel, unmask: bool) -> Self {
        let visible = !c.is_private || unmask;
        let content = if visible { c.content } else { String::new() };
        let content_html = if visible {
            crate::utils::render_markdown(&content)
        } else {
            String::new()
        };
        Self {
            id: c.id,
            post_id: c.post_id,
            parent_id: c.parent_id,
            author_name: c.author_name,
            content,
            content_html,
            is_private: c.is_private,
            created_at: c.created_at.to_string(),
            updated_at: c.updated_at.to_string(),
            replies: Vec::new(),
        }
    }
}

/// Group a chronological flat list into roots with one reply level.
fn assemble_thread(comments: Vec<CommentModel>, unmask: bool) -> Vec<CommentResponse> {
    let mut roots: Vec<CommentResponse> = Vec::new();

    for comment in comments {
        match comment.parent_id {
            None => roots.push(CommentResponse::from_model(comment, unmask)),
            Some(pid) => {
                if let Some(parent) = roots.iter_mut().find(|r| r.id == pid) {
                    parent
                        .replies
                        .push(CommentResponse::from_model(comment, unmask));
                }
                // A reply whose parent is gone mid-listing is dropped; the
                // cascade delete removes it permanently anyway.
            }
        }
    }

    roots
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/{post_id}/comments",
    params(("post_id" = i32, Path, description = "Post id")),
    responses(
        (status = 200, description = "Comment thread for a post", body = Vec<CommentResponse>),
    ),
    tag = "comments"
)]
pub async fn list_comments(
    Extension(db): Extension<DatabaseConnection>,
    maybe_user: MaybeAuthUser,
    Path(post_id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let comments = CommentService::new(db).list_by_post(post_id).await?;
    let thread = assemble_thread(comments, maybe_user.is_admin());
    Ok(ApiResponse::ok(thread))
}

#[utoipa::path(
    get,
    path = "/api/v1/comments/recent",
    params(("limit" = Option<u64>, Query, description = "Max comments, default 5")),
    responses(
        (status = 200, description = "Latest comments across all posts", body = Vec<CommentResponse>),
    ),
    tag = "comments"
)]
pub async fn recent_comments(
    Extension(db): Extension<DatabaseConnection>,
    maybe_user: MaybeAuthUser,
    Query(query): Query<RecentQuery>,
) -> AppResult<impl IntoResponse> {
    let limit = query.limit.unwrap_or(5).clamp(1, 20);
    let comments = CommentService::new(db).recent(limit).await?;
    let unmask = maybe_user.is_admin();
    let items: Vec<CommentResponse> = comments
        .into_iter()
        .map(|c| CommentResponse::from_model(c, unmask))
        .collect();
    Ok(ApiResponse::ok(items))
}

#[utoipa::path(
    post,
    path = "/api/v1/posts/{post_id}/comments",
    params(("post_id" = i32, Path, description = "Post id")),
    request_body = CreateCommentRequest,
    responses(
        (status = 200, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 404, description = "Post not found", body = AppError),
    ),
    tag = "comments"
)]
pub async fn create_comment(
    Extension(db): Extension<DatabaseConnection>,
    Path(post_id): Path<i32>,
    Json(payload): Json<CreateCommentRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let comment = CommentService::new(db)
        .create(
            post_id,
            payload.parent_id,
            &payload.author_name,
            payload.author_email,
            &payload.password,
            &payload.content,
            payload.is_private.unwrap_or(false),
        )
        .await?;

    Ok(ApiResponse::ok(CommentResponse::from_model(comment, true)))
}

#[utoipa::path(
    put,
    path = "/api/v1/comments/{id}",
    params(("id" = i32, Path, description = "Comment id")),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Comment updated", body = CommentResponse),
        (status = 403, description = "Wrong password", body = AppError),
        (status = 404, description = "Comment not found", body = AppError),
    ),
    tag = "comments"
)]
pub async fn update_comment(
    Extension(db): Extension<DatabaseConnection>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCommentRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let comment = CommentService::new(db)
        .update(id, &payload.content, &payload.password)
        .await?;

    Ok(ApiResponse::ok(CommentResponse::from_model(comment, true)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/comments/{id}",
    params(("id" = i32, Path, description = "Comment id")),
    request_body = DeleteCommentRequest,
    responses(
        (status = 200, description = "Comment deleted", body = String),
        (status = 403, description = "Wrong password", body = AppError),
        (status = 404, description = "Comment not found", body = AppError),
    ),
    tag = "comments"
)]
pub async fn delete_comment(
    Extension(db): Extension<DatabaseConnection>,
    Path(id): Path<i32>,
    Json(payload): Json<DeleteCommentRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    CommentService::new(db).delete(id, &payload.password).await?;
    Ok(ApiResponse::ok("Comment deleted"))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/comments/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment deleted", body = String),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Comment not found", body = AppError),
    ),
    tag = "comments"
)]
pub async fn admin_delete_comment(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;

    CommentService::new(db).admin_delete(id).await?;
    Ok(ApiResponse::ok("Comment deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: i32, parent_id: Option<i32>, is_private: bool) -> CommentModel {
        let now = chrono::Utc::now().naive_utc();
        CommentModel {
            id,
            post_id: 1,
            parent_id,
            author_name: "visitor".to_string(),
            author_email: None,
            password_hash: "hash".to_string(),
            content: format!("comment {id}"),
            is_private,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn thread_groups_replies_under_roots() {
        let comments = vec![model(1, None, false), model(2, Some(1), false), model(3, None, false)];
        let thread = assemble_thread(comments, false);

        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].replies.len(), 1);
        assert_eq!(thread[0].replies[0].id, 2);
        assert!(thread[1].replies.is_empty());
    }

    #[test]
    fn private_comment_masked_for_visitors() {
        let thread = assemble_thread(vec![model(1, None, true)], false);
        assert!(thread[0].is_private);
        assert!(thread[0].content.is_empty());
        assert!(thread[0].content_html.is_empty());
    }

    #[test]
    fn private_comment_visible_to_admin() {
        let thread = assemble_thread(vec![model(1, None, true)], true);
        assert_eq!(thread[0].content, "comment 1");
    }
}
