use crate::error::{AppError, AppResult};
use crate::middleware::auth::{require_admin, AuthUser};
use crate::models::SiteSettingModel;
use crate::response::ApiResponse;
use crate::services::settings::SettingsService;
use axum::extract::Path;
use axum::{response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpsertSettingRequest {
    #[validate(length(min = 1, max = 100))]
    pub key: String,
    pub value: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpsertSettingsRequest {
    #[validate(length(min = 1))]
    #[validate(nested)]
    pub settings: Vec<UpsertSettingRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SettingResponse {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub updated_at: String,
}

impl From<SiteSettingModel> for SettingResponse {
    fn from(s: SiteSettingModel) -> Self {
        Self {
            key: s.key,
            value: s.value,
            description: s.description,
            updated_at: s.updated_at.to_string(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/settings",
    responses(
        (status = 200, description = "All site settings", body = Vec<SettingResponse>),
    ),
    tag = "settings"
)]
pub async fn list_settings(
    Extension(db): Extension<DatabaseConnection>,
) -> AppResult<impl IntoResponse> {
    let settings = SettingsService::new(db).list().await?;
    let response: Vec<SettingResponse> = settings.into_iter().map(SettingResponse::from).collect();
    Ok(ApiResponse::ok(response))
}

#[utoipa::path(
    get,
    path = "/api/v1/settings/{key}",
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 200, description = "Setting value", body = SettingResponse),
        (status = 404, description = "Setting not found", body = AppError),
    ),
    tag = "settings"
)]
pub async fn get_setting(
    Extension(db): Extension<DatabaseConnection>,
    Path(key): Path<String>,
) -> AppResult<impl IntoResponse> {
    let setting = SettingsService::new(db).get(&key).await?;
    Ok(ApiResponse::ok(SettingResponse::from(setting)))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/settings",
    security(("jwt_token" = [])),
    request_body = UpsertSettingRequest,
    responses(
        (status = 200, description = "Setting saved", body = SettingResponse),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "settings"
)]
pub async fn upsert_setting(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Json(payload): Json<UpsertSettingRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    require_admin(&auth_user)?;

    let setting = SettingsService::new(db)
        .upsert(&payload.key, &payload.value, payload.description)
        .await?;

    Ok(ApiResponse::ok(SettingResponse::from(setting)))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/settings/bulk",
    security(("jwt_token" = [])),
    request_body = UpsertSettingsRequest,
    responses(
        (status = 200, description = "Settings saved", body = String),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "settings"
)]
pub async fn upsert_settings(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Json(payload): Json<UpsertSettingsRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    require_admin(&auth_user)?;

    let items: Vec<(String, String, Option<String>)> = payload
        .settings
        .into_iter()
        .map(|s| (s.key, s.value, s.description))
        .collect();

    SettingsService::new(db).upsert_many(&items).await?;
    Ok(ApiResponse::ok("Settings saved"))
}
