mod common;

use serde_json::Value;

async fn sign_guestbook(app: &common::TestApp, body: serde_json::Value) -> reqwest::Response {
    app.client
        .post(app.url("/guestbook"))
        .json(&body)
        .send()
        .await
        .expect("Failed to sign guestbook")
}

#[tokio::test]
async fn entry_lifecycle_with_password() {
    let app = common::spawn_app().await;

    let resp = sign_guestbook(
        &app,
        serde_json::json!({
            "author_name": "wanderer",
            "password": "secret99",
            "content": "lovely blog!",
        }),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let entry_id = body["data"]["id"].as_i64().unwrap();

    let resp = app
        .client
        .put(app.url(&format!("/guestbook/{}", entry_id)))
        .json(&serde_json::json!({ "content": "even lovelier", "password": "wrong999" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = app
        .client
        .put(app.url(&format!("/guestbook/{}", entry_id)))
        .json(&serde_json::json!({ "content": "even lovelier", "password": "secret99" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .delete(app.url(&format!("/guestbook/{}", entry_id)))
        .json(&serde_json::json!({ "password": "secret99" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app.client.get(app.url("/guestbook")).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn admin_reply_nests_under_entry() {
    let app = common::spawn_app().await;
    let token = common::admin_token();

    let resp = sign_guestbook(
        &app,
        serde_json::json!({
            "author_name": "guest",
            "password": "secret99",
            "content": "any new posts soon?",
        }),
    )
    .await;
    let body: Value = resp.json().await.unwrap();
    let entry_id = body["data"]["id"].as_i64().unwrap();

    // Visitors cannot use the admin reply route.
    let resp = app
        .client
        .post(app.url(&format!("/admin/guestbook/{}/reply", entry_id)))
        .json(&serde_json::json!({ "content": "soon!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = app
        .client
        .post(app.url(&format!("/admin/guestbook/{}/reply", entry_id)))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "content": "soon!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["is_admin_reply"], true);

    let resp = app.client.get(app.url("/guestbook")).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    let replies = items[0]["replies"].as_array().unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["content"], "soon!");
}

#[tokio::test]
async fn listing_paginates_newest_first() {
    let app = common::spawn_app().await;

    for i in 1..=3 {
        let resp = sign_guestbook(
            &app,
            serde_json::json!({
                "author_name": format!("guest{i}"),
                "password": "secret99",
                "content": format!("entry {i}"),
            }),
        )
        .await;
        assert_eq!(resp.status(), 200);
    }

    let resp = app
        .client
        .get(app.url("/guestbook?page=1&per_page=2"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["total"], 3);
    assert_eq!(body["total_pages"], 2);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["content"], "entry 3");
}

#[tokio::test]
async fn private_entry_masked_for_visitors() {
    let app = common::spawn_app().await;
    let token = common::admin_token();

    sign_guestbook(
        &app,
        serde_json::json!({
            "author_name": "shy guest",
            "password": "secret99",
            "content": "secret message",
            "is_private": true,
        }),
    )
    .await;

    let resp = app.client.get(app.url("/guestbook")).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["items"][0]["content"], "");

    let resp = app
        .client
        .get(app.url("/guestbook"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["items"][0]["content"], "secret message");
}
