mod config;
mod error;
mod handlers;
mod middleware;
mod migration;
mod models;
mod response;
mod routes;
mod services;
mod utils;

use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use serde_json::json;
use services::cache::CacheService;
use std::env;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        // Category routes
        crate::handlers::category::get_category_tree,
        crate::handlers::category::get_category,
        crate::handlers::category::create_category,
        crate::handlers::category::rename_category,
        crate::handlers::category::reparent_category,
        crate::handlers::category::reorder_categories,
        crate::handlers::category::delete_category,
        // Post routes
        crate::handlers::post::list_posts,
        crate::handlers::post::get_post,
        crate::handlers::post::count_view,
        crate::handlers::post::popular_posts,
        crate::handlers::post::recent_posts,
        crate::handlers::post::search_posts,
        crate::handlers::post::admin_list_posts,
        crate::handlers::post::create_post,
        crate::handlers::post::update_post,
        crate::handlers::post::delete_post,
        // Tag routes
        crate::handlers::tag::list_tags,
        crate::handlers::tag::get_posts_by_tag,
        // Comment routes
        crate::handlers::comment::list_comments,
        crate::handlers::comment::recent_comments,
        crate::handlers::comment::create_comment,
        crate::handlers::comment::update_comment,
        crate::handlers::comment::delete_comment,
        crate::handlers::comment::admin_delete_comment,
        // Guestbook routes
        crate::handlers::guestbook::list_entries,
        crate::handlers::guestbook::create_entry,
        crate::handlers::guestbook::update_entry,
        crate::handlers::guestbook::delete_entry,
        crate::handlers::guestbook::admin_reply,
        crate::handlers::guestbook::admin_delete_entry,
        // Settings routes
        crate::handlers::settings::list_settings,
        crate::handlers::settings::get_setting,
        crate::handlers::settings::upsert_setting,
        crate::handlers::settings::upsert_settings,
        // Admin routes
        crate::handlers::admin::get_stats,
    ),
    components(
        schemas(
            crate::response::ApiResponse<serde_json::Value>,
            crate::response::PaginatedResponse<serde_json::Value>,
            crate::response::PaginationQuery,
            crate::error::AppError,
            // Category
            crate::services::category::CategoryNode,
            crate::handlers::category::CategoryResponse,
            crate::handlers::category::CreateCategoryRequest,
            crate::handlers::category::RenameCategoryRequest,
            crate::handlers::category::ReparentCategoryRequest,
            crate::handlers::category::ReorderCategoriesRequest,
            crate::handlers::category::CategoryOrder,
            // Post
            crate::handlers::post::PostResponse,
            crate::handlers::post::PostDetailResponse,
            crate::handlers::post::PostSummary,
            crate::handlers::post::CategoryRef,
            crate::handlers::post::CreatePostRequest,
            crate::handlers::post::UpdatePostRequest,
            crate::handlers::post::PostListQuery,
            crate::handlers::post::SearchPostsQuery,
            // Tag
            crate::handlers::tag::TagResponse,
            // Comment
            crate::handlers::comment::CommentResponse,
            crate::handlers::comment::CreateCommentRequest,
            crate::handlers::comment::UpdateCommentRequest,
            crate::handlers::comment::DeleteCommentRequest,
            // Guestbook
            crate::handlers::guestbook::GuestbookEntryResponse,
            crate::handlers::guestbook::CreateGuestbookEntryRequest,
            crate::handlers::guestbook::UpdateGuestbookEntryRequest,
            crate::handlers::guestbook::DeleteGuestbookEntryRequest,
            crate::handlers::guestbook::AdminReplyRequest,
            // Settings
            crate::handlers::settings::SettingResponse,
            crate::handlers::settings::UpsertSettingRequest,
            crate::handlers::settings::UpsertSettingsRequest,
            // Admin
            crate::handlers::admin::StatsResponse,
        )
    ),
    tags(
        (name = "categories", description = "Category tree and management"),
        (name = "posts", description = "Blog post operations"),
        (name = "tags", description = "Tag operations"),
        (name = "comments", description = "Post comment operations"),
        (name = "guestbook", description = "Guestbook operations"),
        (name = "settings", description = "Site settings"),
        (name = "admin", description = "Administrative operations"),
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maru=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration before doing anything else
    let jwt_config = validate_config()?;
    utils::jwt::init_jwt_config(jwt_config)?;

    tracing::info!("Starting Blog API v{}...", env!("CARGO_PKG_VERSION"));

    let db = config::database::get_database().await?;
    tracing::info!("Database connected successfully");

    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    // Redis/Cache is optional - graceful degradation if unavailable
    let cache = match config::redis::get_redis().await {
        Ok(conn) => {
            tracing::info!("Redis connected successfully");
            Some(CacheService::new(conn))
        }
        Err(e) => {
            tracing::warn!("Redis unavailable, running without cache: {}", e);
            None
        }
    };

    let mut app = create_app().layer(Extension(db));

    if let Some(cache) = cache {
        app = app.layer(Extension(cache));
    }

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Validate all required configuration at startup (fail-fast).
fn validate_config() -> anyhow::Result<crate::config::jwt::JwtConfig> {
    // JWT config — validated and cached
    let jwt_config = config::jwt::JwtConfig::from_env()?;

    // DATABASE_URL — checked here for early error; actual connection happens later
    if env::var("DATABASE_URL").is_err() {
        return Err(anyhow::anyhow!(
            "DATABASE_URL environment variable must be set"
        ));
    }

    Ok(jwt_config)
}

fn build_cors_layer() -> CorsLayer {
    use axum::http::{header, HeaderValue, Method};

    let origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins_str == "*" {
        cors.allow_origin(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = origins_str
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

fn create_app() -> Router {
    Router::new()
        .route("/", get(health_check))
        .merge(routes::create_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Health check successful", body = serde_json::Value)
    )
)]
async fn health_check(Extension(db): Extension<DatabaseConnection>) -> impl IntoResponse {
    let db_ok = db
        .query_one(Statement::from_string(
            sea_orm::DatabaseBackend::Postgres,
            "SELECT 1".to_string(),
        ))
        .await
        .is_ok();

    let status = if db_ok { "ok" } else { "degraded" };

    Json(json!({
        "status": status,
        "service": "Blog API",
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_ok,
    }))
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    tracing::info!("Shutdown signal received, gracefully shutting down...");
}
