mod common;

use serde_json::Value;

#[tokio::test]
async fn stats_reflect_content() {
    let app = common::spawn_app().await;
    let token = common::admin_token();

    let category = common::create_category(&app, &token, "Tech", None, 0).await;
    let category_id = category["id"].as_i64().unwrap();
    let post = common::create_post(&app, &token, "Published", Some(category_id), true).await;
    common::create_post(&app, &token, "Draft", None, false).await;

    // One comment and one guestbook entry.
    let resp = app
        .client
        .post(app.url(&format!("/posts/{}/comments", post["id"].as_i64().unwrap())))
        .json(&serde_json::json!({
            "author_name": "visitor",
            "password": "secret99",
            "content": "hi",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .post(app.url("/guestbook"))
        .json(&serde_json::json!({
            "author_name": "guest",
            "password": "secret99",
            "content": "hello",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .get(app.url("/admin/stats"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let data = &body["data"];

    assert_eq!(data["total_posts"], 2);
    assert_eq!(data["published_posts"], 1);
    assert_eq!(data["draft_posts"], 1);
    assert_eq!(data["total_comments"], 1);
    assert_eq!(data["total_guestbook_entries"], 1);
    assert_eq!(data["total_categories"], 1);
}

#[tokio::test]
async fn stats_require_admin() {
    let app = common::spawn_app().await;

    let resp = app.client.get(app.url("/admin/stats")).send().await.unwrap();
    assert_eq!(resp.status(), 401);

    let resp = app
        .client
        .get(app.url("/admin/stats"))
        .bearer_auth(common::visitor_token())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}
