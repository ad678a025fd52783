mod common;

use serde_json::Value;

#[tokio::test]
async fn upsert_creates_then_updates() {
    let app = common::spawn_app().await;
    let token = common::admin_token();

    let resp = app
        .client
        .put(app.url("/admin/settings"))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "key": "site_title",
            "value": "My Blog",
            "description": "Shown in the header",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Upsert again with a new value.
    let resp = app
        .client
        .put(app.url("/admin/settings"))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "key": "site_title", "value": "My Better Blog" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .get(app.url("/settings/site_title"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["value"], "My Better Blog");
}

#[tokio::test]
async fn bulk_upsert_saves_all() {
    let app = common::spawn_app().await;
    let token = common::admin_token();

    let resp = app
        .client
        .put(app.url("/admin/settings/bulk"))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "settings": [
                { "key": "site_title", "value": "Blog" },
                { "key": "site_description", "value": "Notes and posts" },
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app.client.get(app.url("/settings")).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn missing_setting_is_not_found() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .get(app.url("/settings/nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn writes_require_admin() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .put(app.url("/admin/settings"))
        .bearer_auth(common::visitor_token())
        .json(&serde_json::json!({ "key": "site_title", "value": "Hacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}
