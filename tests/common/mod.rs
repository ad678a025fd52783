#![allow(dead_code)]

use reqwest::Client;
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Once,
};

static INIT: Once = Once::new();
static MIGRATIONS_RAN: AtomicBool = AtomicBool::new(false);

fn init_env() {
    INIT.call_once(|| {
        dotenv::dotenv().ok();
        std::env::set_var(
            "JWT_SECRET",
            "integration_test_secret_that_is_at_least_32_characters_long",
        );
        // Rate limits off; the suites fire requests much faster than a human
        std::env::set_var("RATE_LIMIT_ENABLED", "false");
        let config = maru::config::jwt::JwtConfig::from_env().unwrap();
        let _ = maru::utils::jwt::init_jwt_config(config);
    });
}

pub struct TestApp {
    pub addr: String,
    pub db: DatabaseConnection,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.addr, path)
    }
}

pub async fn spawn_app() -> TestApp {
    init_env();

    let database_url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"));

    let db = sea_orm::Database::connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    // Run migrations only once globally (using atomic bool for thread safety)
    if !MIGRATIONS_RAN.swap(true, Ordering::SeqCst) {
        maru::migration::Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");
    }

    // Clean data tables (reverse dependency order)
    cleanup_tables(&db).await;

    let app = axum::Router::new()
        .route("/", axum::routing::get(|| async { "ok" }))
        .merge(maru::routes::create_routes())
        .layer(axum::extract::Extension(db.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    let addr_str = format!("http://{}", addr);
    let client = Client::new();

    TestApp {
        addr: addr_str,
        db,
        client,
    }
}

async fn cleanup_tables(db: &DatabaseConnection) {
    let tables = [
        "post_tags",
        "tags",
        "comments",
        "posts",
        "categories",
        "guestbook",
        "site_settings",
    ];

    for table in tables {
        let _ = db
            .execute(Statement::from_string(
                sea_orm::DatabaseBackend::Postgres,
                format!("DELETE FROM {}", table),
            ))
            .await;
    }
}

/// Token with the admin role, as the identity provider would mint it.
pub fn admin_token() -> String {
    maru::utils::jwt::encode_token("test-admin", "admin", 3600).unwrap()
}

/// Token with a non-admin role; must be rejected by admin routes.
pub fn visitor_token() -> String {
    maru::utils::jwt::encode_token("test-visitor", "reader", 3600).unwrap()
}

pub async fn create_category(
    app: &TestApp,
    token: &str,
    name: &str,
    parent_id: Option<i64>,
    order_index: i64,
) -> Value {
    let resp = app
        .client
        .post(app.url("/admin/categories"))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "name": name,
            "parent_id": parent_id,
            "order_index": order_index,
        }))
        .send()
        .await
        .expect("Failed to create category");

    assert_eq!(resp.status(), 200, "category create failed for '{}'", name);
    let body: Value = resp.json().await.unwrap();
    body["data"].clone()
}

pub async fn create_post(
    app: &TestApp,
    token: &str,
    title: &str,
    category_id: Option<i64>,
    is_published: bool,
) -> Value {
    let resp = app
        .client
        .post(app.url("/admin/posts"))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "title": title,
            "content": format!("Body of {title}"),
            "category_id": category_id,
            "is_published": is_published,
        }))
        .send()
        .await
        .expect("Failed to create post");

    assert_eq!(resp.status(), 200, "post create failed for '{}'", title);
    let body: Value = resp.json().await.unwrap();
    body["data"].clone()
}
