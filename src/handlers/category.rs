use crate::error::{AppError, AppResult};
use crate::middleware::auth::{require_admin, AuthUser};
use crate::models::CategoryModel;
use crate::response::ApiResponse;
use crate::services::cache::CacheService;
use crate::services::category::{CategoryNode, CategoryService};
use axum::{extract::Path, response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    /// Category name (1-100 characters)
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Explicit slug override; derived from the name when omitted
    #[validate(length(max = 100))]
    pub slug: Option<String>,
    /// Parent category id; root-level when omitted
    pub parent_id: Option<i32>,
    /// Sibling display order
    pub order_index: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RenameCategoryRequest {
    /// New category name (1-100 characters)
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Explicit slug override; re-derived from the name when omitted
    #[validate(length(max = 100))]
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReparentCategoryRequest {
    /// New parent id; null moves the category to root level
    pub parent_id: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryOrder {
    pub id: i32,
    pub order_index: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReorderCategoriesRequest {
    #[validate(length(min = 1))]
    pub orders: Vec<CategoryOrder>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i32>,
    pub order_index: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CategoryModel> for CategoryResponse {
    fn from(c: CategoryModel) -> Self {
        Self {
            id: c.id,
            name: c.name,
            slug: c.slug,
            parent_id: c.parent_id,
            order_index: c.order_index,
            created_at: c.created_at.to_string(),
            updated_at: c.updated_at.to_string(),
        }
    }
}

fn make_category_service(db: DatabaseConnection, cache: Option<CacheService>) -> CategoryService {
    let service = CategoryService::new(db);
    match cache {
        Some(c) => service.with_cache(c),
        None => service,
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses(
        (status = 200, description = "Category tree with post counts", body = Vec<CategoryNode>),
    ),
    tag = "categories"
)]
pub async fn get_category_tree(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
) -> AppResult<impl IntoResponse> {
    let service = make_category_service(db, cache.map(|c| c.0));
    let tree = service.tree().await?;
    Ok(ApiResponse::ok(tree))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/{key}",
    params(("key" = String, Path, description = "Category slug (name accepted for legacy links)")),
    responses(
        (status = 200, description = "Category details", body = CategoryResponse),
        (status = 404, description = "Category not found", body = AppError),
    ),
    tag = "categories"
)]
pub async fn get_category(
    Extension(db): Extension<DatabaseConnection>,
    Path(key): Path<String>,
) -> AppResult<impl IntoResponse> {
    let service = CategoryService::new(db);
    let category = service.get_by_slug_or_name(&key).await?;
    Ok(ApiResponse::ok(CategoryResponse::from(category)))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/categories",
    security(("jwt_token" = [])),
    request_body = CreateCategoryRequest,
    responses(
        (status = 200, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Admin only", body = AppError),
        (status = 409, description = "Slug already exists", body = AppError),
    ),
    tag = "categories"
)]
pub async fn create_category(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    require_admin(&auth_user)?;

    let service = make_category_service(db, cache.map(|c| c.0));
    let category = service
        .create(
            &payload.name,
            payload.slug,
            payload.parent_id,
            payload.order_index.unwrap_or(0),
        )
        .await?;

    Ok(ApiResponse::ok(CategoryResponse::from(category)))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/categories/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Category id")),
    request_body = RenameCategoryRequest,
    responses(
        (status = 200, description = "Category renamed", body = CategoryResponse),
        (status = 404, description = "Category not found", body = AppError),
        (status = 409, description = "Slug already exists", body = AppError),
    ),
    tag = "categories"
)]
pub async fn rename_category(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<RenameCategoryRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    require_admin(&auth_user)?;

    let service = make_category_service(db, cache.map(|c| c.0));
    let category = service.rename(id, &payload.name, payload.slug).await?;

    Ok(ApiResponse::ok(CategoryResponse::from(category)))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/categories/{id}/parent",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Category id")),
    request_body = ReparentCategoryRequest,
    responses(
        (status = 200, description = "Category moved", body = CategoryResponse),
        (status = 404, description = "Category not found", body = AppError),
        (status = 409, description = "Move would create a cycle", body = AppError),
    ),
    tag = "categories"
)]
pub async fn reparent_category(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<ReparentCategoryRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;

    let service = make_category_service(db, cache.map(|c| c.0));
    let category = service.reparent(id, payload.parent_id).await?;

    Ok(ApiResponse::ok(CategoryResponse::from(category)))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/categories/reorder",
    security(("jwt_token" = [])),
    request_body = ReorderCategoriesRequest,
    responses(
        (status = 200, description = "Categories reordered", body = String),
        (status = 404, description = "Category not found", body = AppError),
    ),
    tag = "categories"
)]
pub async fn reorder_categories(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    Json(payload): Json<ReorderCategoriesRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    require_admin(&auth_user)?;

    let pairs: Vec<(i32, i32)> = payload
        .orders
        .iter()
        .map(|o| (o.id, o.order_index))
        .collect();

    let service = make_category_service(db, cache.map(|c| c.0));
    service.reorder(&pairs).await?;

    Ok(ApiResponse::ok("Categories reordered"))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/categories/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category deleted", body = String),
        (status = 404, description = "Category not found", body = AppError),
        (status = 409, description = "Category has children", body = AppError),
    ),
    tag = "categories"
)]
pub async fn delete_category(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;

    let service = make_category_service(db, cache.map(|c| c.0));
    service.delete(id).await?;

    Ok(ApiResponse::ok("Category deleted"))
}
