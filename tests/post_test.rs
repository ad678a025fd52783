mod common;

use serde_json::Value;

#[tokio::test]
async fn public_listing_hides_drafts() {
    let app = common::spawn_app().await;
    let token = common::admin_token();

    common::create_post(&app, &token, "Published one", None, true).await;
    common::create_post(&app, &token, "Draft one", None, false).await;

    let resp = app.client.get(app.url("/posts")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();

    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Published one");
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn admin_listing_includes_drafts() {
    let app = common::spawn_app().await;
    let token = common::admin_token();

    common::create_post(&app, &token, "Published one", None, true).await;
    common::create_post(&app, &token, "Draft one", None, false).await;

    let resp = app
        .client
        .get(app.url("/admin/posts"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn post_detail_carries_rendered_markdown_and_category() {
    let app = common::spawn_app().await;
    let token = common::admin_token();

    let category = common::create_category(&app, &token, "Tech", None, 0).await;
    let category_id = category["id"].as_i64().unwrap();

    let resp = app
        .client
        .post(app.url("/admin/posts"))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "title": "Hello Blog",
            "content": "# Heading\n\nSome **bold** text",
            "category_id": category_id,
            "tags": ["rust", "axum"],
            "is_published": true,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .get(app.url("/posts/hello-blog"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let data = &body["data"];

    assert_eq!(data["title"], "Hello Blog");
    assert!(data["content_html"]
        .as_str()
        .unwrap()
        .contains("<strong>bold</strong>"));
    assert_eq!(data["category"]["slug"], "tech");
    let tags = data["tags"].as_array().unwrap();
    assert_eq!(tags.len(), 2);
}

#[tokio::test]
async fn draft_detail_is_not_public() {
    let app = common::spawn_app().await;
    let token = common::admin_token();

    common::create_post(&app, &token, "Secret draft", None, false).await;

    let resp = app
        .client
        .get(app.url("/posts/secret-draft"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn duplicate_slug_conflicts() {
    let app = common::spawn_app().await;
    let token = common::admin_token();

    common::create_post(&app, &token, "Same Title", None, true).await;

    let resp = app
        .client
        .post(app.url("/admin/posts"))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "title": "Same Title",
            "content": "other body",
            "is_published": true,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
}

#[tokio::test]
async fn view_counter_increments() {
    let app = common::spawn_app().await;
    let token = common::admin_token();

    let post = common::create_post(&app, &token, "Counted", None, true).await;
    let id = post["id"].as_i64().unwrap();

    for _ in 0..3 {
        let resp = app
            .client
            .post(app.url(&format!("/posts/{}/view", id)))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    let resp = app.client.get(app.url("/posts/counted")).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["view_count"], 3);
}

#[tokio::test]
async fn search_matches_title_and_filters_by_category() {
    let app = common::spawn_app().await;
    let token = common::admin_token();

    let tech = common::create_category(&app, &token, "Tech", None, 0).await;
    let tech_id = tech["id"].as_i64().unwrap();
    let life = common::create_category(&app, &token, "Life", None, 1).await;
    let life_id = life["id"].as_i64().unwrap();

    common::create_post(&app, &token, "Rust ownership explained", Some(tech_id), true).await;
    common::create_post(&app, &token, "My rust cooking pot", Some(life_id), true).await;
    common::create_post(&app, &token, "Unrelated travel notes", Some(life_id), true).await;

    let resp = app
        .client
        .get(app.url("/search?q=rust"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["items"].as_array().unwrap().len(), 2);

    let resp = app
        .client
        .get(app.url("/search?q=rust&category=tech"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Rust ownership explained");
}

#[tokio::test]
async fn update_post_toggles_publication() {
    let app = common::spawn_app().await;
    let token = common::admin_token();

    let post = common::create_post(&app, &token, "Toggle me", None, false).await;
    let id = post["id"].as_i64().unwrap();
    assert_eq!(post["status"], "draft");

    let resp = app
        .client
        .put(app.url(&format!("/admin/posts/{}", id)))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "is_published": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "published");
    assert!(body["data"]["published_at"].is_string());

    // Now visible publicly.
    let resp = app
        .client
        .get(app.url("/posts/toggle-me"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn delete_post_removes_it() {
    let app = common::spawn_app().await;
    let token = common::admin_token();

    let post = common::create_post(&app, &token, "Doomed", None, true).await;
    let id = post["id"].as_i64().unwrap();

    let resp = app
        .client
        .delete(app.url(&format!("/admin/posts/{}", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app.client.get(app.url("/posts/doomed")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn posts_filtered_by_tag_slug() {
    let app = common::spawn_app().await;
    let token = common::admin_token();

    let resp = app
        .client
        .post(app.url("/admin/posts"))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "title": "Tagged post",
            "content": "body",
            "tags": ["weekend project"],
            "is_published": true,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    common::create_post(&app, &token, "Untagged post", None, true).await;

    let resp = app
        .client
        .get(app.url("/tags/weekend-project/posts"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Tagged post");

    // Tag cloud shows the tag with its count.
    let resp = app.client.get(app.url("/tags")).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    let tags = body["data"].as_array().unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0]["slug"], "weekend-project");
    assert_eq!(tags[0]["post_count"], 1);
}
