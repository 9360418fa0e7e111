mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn anonymous_create_uses_configured_actor_and_ignores_read_only_fields() {
    let app = common::spawn().await;

    let created = app
        .create_project(
            None,
            json!({
                "name": "Harbour Road widening",
                "budget": "1250000.50",
                "start_date": "2024-07-01",
                "latitude": 53.35,
                "longitude": -6.26,
                "id": 777,
                "created_by": 12345,
                "created_at": "1999-01-01T00:00:00Z",
                "updated_at": "1999-01-01T00:00:00Z",
            }),
        )
        .await;

    assert_ne!(created["id"], 777);
    assert_eq!(created["created_by_name"], "poc_user");
    assert_ne!(created["created_by"], 12345);
    assert_ne!(created["created_at"], "1999-01-01T00:00:00Z");
    assert_eq!(created["status"], "planned");
    assert_eq!(created["priority"], "medium");
    assert_eq!(created["budget"], "1250000.50");
    assert_eq!(created["description"], "");
    assert_eq!(created["assigned_to"], json!([]));
}

#[tokio::test]
async fn authenticated_create_records_the_caller() {
    let app = common::spawn().await;
    let token = app.token_for("alice").await;

    let created = app
        .create_project(Some(&token), json!({"name": "Ring road"}))
        .await;
    assert_eq!(created["created_by_name"], "alice");
}

#[tokio::test]
async fn invalid_token_is_rejected_even_with_anonymous_writes() {
    let app = common::spawn().await;

    let (status, body) = app
        .post("/projects/", Some("not-a-real-token"), json!({"name": "x"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "not_authenticated");
}

#[tokio::test]
async fn project_routes_require_a_token_when_anonymous_writes_are_off() {
    let app = common::spawn_with(&[("ALLOW_ANONYMOUS_WRITE", "false")]).await;

    let (status, _) = app.post("/projects/", None, json!({"name": "x"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.get("/projects/", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.token_for("bob").await;
    let (status, _) = app.post("/projects/", Some(&token), json!({"name": "x"})).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn validates_fields() {
    let app = common::spawn().await;

    for body in [
        json!({}),
        json!({"name": ""}),
        json!({"name": "x".repeat(201)}),
        json!({"name": "x", "status": "abandoned"}),
        json!({"name": "x", "priority": "urgent"}),
        json!({"name": "x", "budget": "1.234"}),
        json!({"name": "x", "budget": "12345678901"}),
        json!({"name": "x", "start_date": "01/07/2024"}),
    ] {
        let (status, error) = app.post("/projects/", None, body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(error["code"], "validation_error", "{body}");
    }
}

#[tokio::test]
async fn assignments_resolve_usernames_and_reject_unknown_users() {
    let app = common::spawn().await;
    let carol = app.create_user("carol", "pw").await;
    let dave = app.create_user("dave", "pw").await;

    let created = app
        .create_project(
            None,
            json!({"name": "Bypass", "assigned_to": [dave.id, carol.id, dave.id]}),
        )
        .await;
    assert_eq!(created["assigned_to"], json!([carol.id, dave.id]));
    assert_eq!(created["assigned_to_names"], json!(["carol", "dave"]));

    let (status, body) = app
        .post("/projects/", None, json!({"name": "Ghost crew", "assigned_to": [9999]}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid pk \"9999\" - object does not exist.");

    // the failed create left nothing behind
    let (_, list) = app.get("/projects/", None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn put_replaces_and_patch_merges() {
    let app = common::spawn().await;
    let created = app
        .create_project(
            None,
            json!({
                "name": "Old name",
                "description": "resurfacing",
                "priority": "high",
                "budget": 1000,
                "end_date": "2025-01-31",
                "latitude": 10.0,
                "longitude": 20.0,
            }),
        )
        .await;
    let uri = format!("/projects/{}/", created["id"]);

    let (status, patched) = app
        .request(
            Method::PATCH,
            &uri,
            None,
            Some(json!({"status": "in_progress", "budget": null, "latitude": 11.0})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{patched}");
    assert_eq!(patched["status"], "in_progress");
    assert_eq!(patched["budget"], serde_json::Value::Null);
    assert_eq!(patched["name"], "Old name");
    assert_eq!(patched["priority"], "high");
    assert_eq!(patched["end_date"], "2025-01-31");
    assert_eq!(patched["latitude"], 11.0);
    assert_eq!(patched["longitude"], 20.0);
    assert_eq!(patched["created_at"], created["created_at"]);

    let (status, replaced) = app
        .request(Method::PUT, &uri, None, Some(json!({"name": "New name"})))
        .await;
    assert_eq!(status, StatusCode::OK, "{replaced}");
    assert_eq!(replaced["name"], "New name");
    assert_eq!(replaced["description"], "");
    assert_eq!(replaced["priority"], "medium");
    assert_eq!(replaced["end_date"], serde_json::Value::Null);
    assert_eq!(replaced["latitude"], serde_json::Value::Null);

    let (status, _) = app
        .request(Method::PUT, &uri, None, Some(json!({"description": "no name"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patch_with_null_coordinates_clears_the_location() {
    let app = common::spawn().await;
    let created = app
        .create_project(None, json!({"name": "Bridge deck", "latitude": 10.0, "longitude": 20.0}))
        .await;
    let uri = format!("/projects/{}/", created["id"]);

    let (status, patched) = app
        .request(
            Method::PATCH,
            &uri,
            None,
            Some(json!({"latitude": null, "longitude": null})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{patched}");
    assert_eq!(patched["latitude"], serde_json::Value::Null);
    assert_eq!(patched["longitude"], serde_json::Value::Null);
    assert_eq!(patched["name"], "Bridge deck");

    let (_, nearby) = app.get("/projects/nearby/?lat=10&lng=20&radius=1", None).await;
    assert_eq!(nearby, json!([]));
}

#[tokio::test]
async fn filters_and_orders_newest_first() {
    let app = common::spawn().await;
    let token = app.token_for("erin").await;

    app.create_project(None, json!({"name": "first", "status": "completed"}))
        .await;
    app.create_project(Some(&token), json!({"name": "second", "priority": "critical"}))
        .await;
    let third = app
        .create_project(None, json!({"name": "third", "status": "completed"}))
        .await;

    let (_, all) = app.get("/projects/", None).await;
    let order: Vec<&str> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(order, vec!["third", "second", "first"]);

    let (_, completed) = app.get("/projects/?status=completed", None).await;
    assert_eq!(completed.as_array().unwrap().len(), 2);

    let (_, critical) = app.get("/projects/?priority=critical", None).await;
    assert_eq!(critical[0]["name"], "second");

    let uri = format!("/projects/?created_by={}", third["created_by"]);
    let (_, by_anon) = app.get(&uri, None).await;
    assert_eq!(by_anon.as_array().unwrap().len(), 2);

    let (status, _) = app.get("/projects/?status=abandoned", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn paginates_on_request() {
    let app = common::spawn().await;
    for i in 0..5 {
        app.create_project(None, json!({"name": format!("p{i}")})).await;
    }

    let (status, page) = app.get("/projects/?page=2&page_size=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 5);
    assert_eq!(page["total_pages"], 3);
    assert_eq!(page["current_page"], 2);
    assert_eq!(page["results"].as_array().unwrap().len(), 2);

    let (status, _) = app.get("/projects/?page=9&page_size=2", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_project_is_not_found() {
    let app = common::spawn().await;

    let (status, body) = app.get("/projects/4242/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Project not found");

    let (status, _) = app.get("/projects/4242/segments/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_numeric_ids_get_a_json_error() {
    let app = common::spawn().await;
    let token = app.token_for("frank").await;

    for uri in ["/projects/abc/", "/projects/abc/photos/", "/segments/abc/", "/updates/1.5/"] {
        let (status, body) = app.get(uri, Some(&token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["code"], "validation_error", "{uri}");
        assert!(body["error"].is_string(), "{uri}");
    }
}

#[tokio::test]
async fn serves_docs_and_landing_page() {
    let app = common::spawn().await;

    let (status, spec) = app.get("/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(spec["paths"].get("/projects/nearby/").is_some());

    let (status, page) = app.get("/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.as_str().unwrap().contains("Road Projects"));
}
