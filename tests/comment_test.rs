mod common;

use serde_json::Value;

async fn post_comment(
    app: &common::TestApp,
    post_id: i64,
    body: serde_json::Value,
) -> reqwest::Response {
    app.client
        .post(app.url(&format!("/posts/{}/comments", post_id)))
        .json(&body)
        .send()
        .await
        .expect("Failed to post comment")
}

#[tokio::test]
async fn comment_lifecycle_with_password() {
    let app = common::spawn_app().await;
    let token = common::admin_token();

    let post = common::create_post(&app, &token, "Commented post", None, true).await;
    let post_id = post["id"].as_i64().unwrap();

    let resp = post_comment(
        &app,
        post_id,
        serde_json::json!({
            "author_name": "visitor",
            "password": "secret99",
            "content": "nice read!",
        }),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let comment_id = body["data"]["id"].as_i64().unwrap();

    // Wrong password cannot edit.
    let resp = app
        .client
        .put(app.url(&format!("/comments/{}", comment_id)))
        .json(&serde_json::json!({ "content": "edited", "password": "wrong999" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // Right password can.
    let resp = app
        .client
        .put(app.url(&format!("/comments/{}", comment_id)))
        .json(&serde_json::json!({ "content": "edited", "password": "secret99" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["content"], "edited");

    // Delete with the password.
    let resp = app
        .client
        .delete(app.url(&format!("/comments/{}", comment_id)))
        .json(&serde_json::json!({ "password": "secret99" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .get(app.url(&format!("/posts/{}/comments", post_id)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn replies_nest_under_their_parent() {
    let app = common::spawn_app().await;
    let token = common::admin_token();

    let post = common::create_post(&app, &token, "Threaded post", None, true).await;
    let post_id = post["id"].as_i64().unwrap();

    let resp = post_comment(
        &app,
        post_id,
        serde_json::json!({
            "author_name": "first",
            "password": "secret99",
            "content": "root comment",
        }),
    )
    .await;
    let body: Value = resp.json().await.unwrap();
    let parent_id = body["data"]["id"].as_i64().unwrap();

    let resp = post_comment(
        &app,
        post_id,
        serde_json::json!({
            "author_name": "second",
            "password": "secret99",
            "content": "a reply",
            "parent_id": parent_id,
        }),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let reply_id = body["data"]["id"].as_i64().unwrap();

    // Replies to replies are rejected.
    let resp = post_comment(
        &app,
        post_id,
        serde_json::json!({
            "author_name": "third",
            "password": "secret99",
            "content": "too deep",
            "parent_id": reply_id,
        }),
    )
    .await;
    assert_eq!(resp.status(), 400);

    let resp = app
        .client
        .get(app.url(&format!("/posts/{}/comments", post_id)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let thread = body["data"].as_array().unwrap();
    assert_eq!(thread.len(), 1);
    let replies = thread[0]["replies"].as_array().unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["content"], "a reply");
}

#[tokio::test]
async fn private_comment_masked_for_visitors_but_not_admin() {
    let app = common::spawn_app().await;
    let token = common::admin_token();

    let post = common::create_post(&app, &token, "Private comments", None, true).await;
    let post_id = post["id"].as_i64().unwrap();

    post_comment(
        &app,
        post_id,
        serde_json::json!({
            "author_name": "shy",
            "password": "secret99",
            "content": "only for the owner",
            "is_private": true,
        }),
    )
    .await;

    let resp = app
        .client
        .get(app.url(&format!("/posts/{}/comments", post_id)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let thread = body["data"].as_array().unwrap();
    assert_eq!(thread[0]["is_private"], true);
    assert_eq!(thread[0]["content"], "");

    let resp = app
        .client
        .get(app.url(&format!("/posts/{}/comments", post_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"][0]["content"], "only for the owner");
}

#[tokio::test]
async fn comment_on_missing_post_is_not_found() {
    let app = common::spawn_app().await;

    let resp = post_comment(
        &app,
        99999,
        serde_json::json!({
            "author_name": "visitor",
            "password": "secret99",
            "content": "into the void",
        }),
    )
    .await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn admin_can_delete_any_comment() {
    let app = common::spawn_app().await;
    let token = common::admin_token();

    let post = common::create_post(&app, &token, "Moderated post", None, true).await;
    let post_id = post["id"].as_i64().unwrap();

    let resp = post_comment(
        &app,
        post_id,
        serde_json::json!({
            "author_name": "spammer",
            "password": "secret99",
            "content": "buy cheap things",
        }),
    )
    .await;
    let body: Value = resp.json().await.unwrap();
    let comment_id = body["data"]["id"].as_i64().unwrap();

    let resp = app
        .client
        .delete(app.url(&format!("/admin/comments/{}", comment_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}
