use crate::config::rate_limit::{RateLimitConfig, RateLimitRule};
use crate::handlers;
use crate::middleware::auth::auth_middleware;
use axum::{middleware, routing, Router};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

pub fn create_routes() -> Router {
    Router::new().nest("/api/v1", api_routes())
}

fn api_routes() -> Router {
    let rate_limit_config = RateLimitConfig::from_env();

    let public_read = public_read_routes(&rate_limit_config);
    let anon_write = anon_write_routes(&rate_limit_config);
    let admin = admin_routes(&rate_limit_config).layer(middleware::from_fn(auth_middleware));

    public_read.merge(anon_write).merge(admin)
}

/// Public reads: everything a visitor sees without an account.
fn public_read_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        // Categories
        .route(
            "/categories",
            routing::get(handlers::category::get_category_tree),
        )
        .route(
            "/categories/{key}",
            routing::get(handlers::category::get_category),
        )
        // Posts
        .route("/posts", routing::get(handlers::post::list_posts))
        .route("/posts/popular", routing::get(handlers::post::popular_posts))
        .route("/posts/recent", routing::get(handlers::post::recent_posts))
        .route("/posts/{slug}", routing::get(handlers::post::get_post))
        // Search
        .route("/search", routing::get(handlers::post::search_posts))
        // Tags
        .route("/tags", routing::get(handlers::tag::list_tags))
        .route(
            "/tags/{slug}/posts",
            routing::get(handlers::tag::get_posts_by_tag),
        )
        // Comments
        .route(
            "/posts/{post_id}/comments",
            routing::get(handlers::comment::list_comments),
        )
        .route(
            "/comments/recent",
            routing::get(handlers::comment::recent_comments),
        )
        // Guestbook
        .route("/guestbook", routing::get(handlers::guestbook::list_entries))
        // Settings
        .route("/settings", routing::get(handlers::settings::list_settings))
        .route(
            "/settings/{key}",
            routing::get(handlers::settings::get_setting),
        );

    with_optional_rate_limit(router, config.enabled, config.public_read)
}

/// Anonymous writes: comments and guestbook entries, plus the view counter.
/// Edit rights are proven with per-entry passwords, not sessions.
fn anon_write_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route(
            "/posts/{id}/view",
            routing::post(handlers::post::count_view),
        )
        .route(
            "/posts/{post_id}/comments",
            routing::post(handlers::comment::create_comment),
        )
        .route(
            "/comments/{id}",
            routing::put(handlers::comment::update_comment)
                .delete(handlers::comment::delete_comment),
        )
        .route(
            "/guestbook",
            routing::post(handlers::guestbook::create_entry),
        )
        .route(
            "/guestbook/{id}",
            routing::put(handlers::guestbook::update_entry)
                .delete(handlers::guestbook::delete_entry),
        );

    with_optional_rate_limit(router, config.enabled, config.anon_write)
}

/// Admin console: requires a provider-issued token with the admin role.
fn admin_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        // Categories
        .route(
            "/admin/categories",
            routing::post(handlers::category::create_category),
        )
        .route(
            "/admin/categories/reorder",
            routing::put(handlers::category::reorder_categories),
        )
        .route(
            "/admin/categories/{id}",
            routing::put(handlers::category::rename_category)
                .delete(handlers::category::delete_category),
        )
        .route(
            "/admin/categories/{id}/parent",
            routing::put(handlers::category::reparent_category),
        )
        // Posts
        .route(
            "/admin/posts",
            routing::get(handlers::post::admin_list_posts).post(handlers::post::create_post),
        )
        .route(
            "/admin/posts/{id}",
            routing::put(handlers::post::update_post).delete(handlers::post::delete_post),
        )
        // Moderation
        .route(
            "/admin/comments/{id}",
            routing::delete(handlers::comment::admin_delete_comment),
        )
        .route(
            "/admin/guestbook/{id}",
            routing::delete(handlers::guestbook::admin_delete_entry),
        )
        .route(
            "/admin/guestbook/{id}/reply",
            routing::post(handlers::guestbook::admin_reply),
        )
        // Settings
        .route(
            "/admin/settings",
            routing::put(handlers::settings::upsert_setting),
        )
        .route(
            "/admin/settings/bulk",
            routing::put(handlers::settings::upsert_settings),
        )
        // Dashboard
        .route("/admin/stats", routing::get(handlers::admin::get_stats));

    with_optional_rate_limit(router, config.enabled, config.admin)
}

fn with_optional_rate_limit(router: Router, enabled: bool, rule: RateLimitRule) -> Router {
    if !enabled {
        return router;
    }

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(rule.per_second)
        .burst_size(rule.burst_size)
        .finish()
        .expect("Invalid rate limit configuration");

    router.layer(GovernorLayer::new(governor_conf))
}
