mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

fn segment_body(project: &Value, name: &str) -> Value {
    json!({
        "project": project,
        "name": name,
        "road_type": "collector",
        "surface_type": "asphalt",
        "length_km": 1.2,
        "width_m": 7.5,
        "start_latitude": 1.0,
        "start_longitude": 2.0,
        "end_latitude": 1.01,
        "end_longitude": 2.01,
    })
}

#[tokio::test]
async fn dependents_require_authentication() {
    let app = common::spawn().await;

    for uri in ["/segments/", "/photos/", "/updates/"] {
        let (status, body) = app.get(uri, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["code"], "not_authenticated");
    }
}

#[tokio::test]
async fn dependents_must_reference_an_existing_project() {
    let app = common::spawn().await;
    let token = app.token_for("ivan").await;

    let (status, body) = app
        .post("/segments/", Some(&token), segment_body(&json!(9999), "Orphan"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid pk \"9999\" - object does not exist.");

    let (status, body) = app
        .post(
            "/updates/",
            Some(&token),
            json!({"project": 9999, "title": "t", "content": "c"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid pk \"9999\" - object does not exist.");

    let png = common::png_bytes();
    let request = common::multipart_request(
        "/photos/",
        &token,
        &[("project", "9999"), ("title", "orphan")],
        Some(("site.png", &png)),
    );
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid pk \"9999\" - object does not exist.");
}

#[tokio::test]
async fn segments_need_all_coordinates_in_simple_mode() {
    let app = common::spawn().await;
    let token = app.token_for("judy").await;
    let project = app.create_project(None, json!({"name": "p"})).await;

    let mut body = segment_body(&project["id"], "Partial");
    body.as_object_mut().unwrap().remove("end_longitude");
    let (status, error) = app.post("/segments/", Some(&token), body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "end_longitude is required");
}

#[tokio::test]
async fn segments_are_listed_by_name_and_filterable() {
    let app = common::spawn().await;
    let token = app.token_for("ken").await;
    let a = app.create_project(None, json!({"name": "a"})).await;
    let b = app.create_project(None, json!({"name": "b"})).await;

    for (project, name) in [(&a, "Zulu"), (&a, "Alpha"), (&b, "Mike")] {
        let (status, body) = app
            .post("/segments/", Some(&token), segment_body(&project["id"], name))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let uri = format!("/projects/{}/segments/", a["id"]);
    let (status, listed) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Alpha", "Zulu"]);

    let uri = format!("/segments/?project={}&road_type=collector", b["id"]);
    let (_, filtered) = app.get(&uri, Some(&token)).await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);
    assert_eq!(filtered[0]["name"], "Mike");

    let (_, none) = app.get("/segments/?surface_type=gravel", Some(&token)).await;
    assert_eq!(none, json!([]));
}

#[tokio::test]
async fn segment_patch_keeps_created_at() {
    let app = common::spawn().await;
    let token = app.token_for("lena").await;
    let project = app.create_project(None, json!({"name": "p"})).await;
    let (_, segment) = app
        .post("/segments/", Some(&token), segment_body(&project["id"], "S"))
        .await;

    let uri = format!("/segments/{}/", segment["id"]);
    let (status, patched) = app
        .request(
            Method::PATCH,
            &uri,
            Some(&token),
            Some(json!({"surface_type": "gravel", "created_at": "2000-01-01T00:00:00Z"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{patched}");
    assert_eq!(patched["surface_type"], "gravel");
    assert_eq!(patched["created_at"], segment["created_at"]);
    assert_eq!(patched["end_longitude"], 2.01);
}

#[tokio::test]
async fn photo_upload_round_trip() {
    let app = common::spawn().await;
    let token = app.token_for("mia").await;
    let project = app.create_project(None, json!({"name": "p"})).await;
    let project_id = project["id"].to_string();

    let png = common::png_bytes();
    let request = common::multipart_request(
        "/photos/",
        &token,
        &[
            ("project", &project_id),
            ("title", "Drainage"),
            ("latitude", "12.5"),
            ("longitude", ""),
            ("uploaded_by", "999"),
        ],
        Some(("drain.png", &png)),
    );
    let (status, photo) = app.send(request).await;
    assert_eq!(status, StatusCode::CREATED, "{photo}");
    assert_eq!(photo["uploaded_by_name"], "mia");
    assert_eq!(photo["latitude"], 12.5);
    assert_eq!(photo["longitude"], Value::Null);

    let image = photo["image"].as_str().unwrap();
    assert!(image.starts_with("/media/project_photos/") && image.ends_with(".png"));
    let stored = app.media.path().join(image.trim_start_matches("/media/"));
    assert!(stored.exists());

    let (status, served) = app.get(image, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!served.is_null());

    let uri = format!("/photos/{}/", photo["id"]);
    let (status, patched) = app
        .request(Method::PATCH, &uri, Some(&token), Some(json!({"title": "Culvert"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["title"], "Culvert");
    assert_eq!(patched["image"], photo["image"]);
    assert_eq!(patched["taken_at"], photo["taken_at"]);

    let (status, cleared) = app
        .request(Method::PATCH, &uri, Some(&token), Some(json!({"latitude": null})))
        .await;
    assert_eq!(status, StatusCode::OK, "{cleared}");
    assert_eq!(cleared["latitude"], Value::Null);
    assert_eq!(cleared["title"], "Culvert");

    let (status, _) = app.request(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!stored.exists());
}

#[tokio::test]
async fn photo_upload_rejects_non_images_and_missing_files() {
    let app = common::spawn().await;
    let token = app.token_for("nina").await;
    let project = app.create_project(None, json!({"name": "p"})).await;
    let project_id = project["id"].to_string();

    let request = common::multipart_request(
        "/photos/",
        &token,
        &[("project", &project_id), ("title", "fake")],
        Some(("fake.jpg", b"plain text, not a jpeg")),
    );
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let request = common::multipart_request(
        "/photos/",
        &token,
        &[("project", &project_id), ("title", "no file")],
        None,
    );
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "image: No file was submitted.");
}

#[tokio::test]
async fn updates_record_author_and_keep_created_at() {
    let app = common::spawn().await;
    let token = app.token_for("olga").await;
    let project = app.create_project(None, json!({"name": "p"})).await;

    let (status, update) = app
        .post(
            "/updates/",
            Some(&token),
            json!({
                "project": project["id"],
                "title": "Week 1",
                "content": "Site cleared",
                "created_by": 4242,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{update}");
    assert_eq!(update["created_by_name"], "olga");

    let uri = format!("/updates/{}/", update["id"]);
    let (status, replaced) = app
        .request(
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({"project": project["id"], "title": "Week 1", "content": "Site cleared and fenced"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replaced["content"], "Site cleared and fenced");
    assert_eq!(replaced["created_at"], update["created_at"]);

    let uri = format!("/projects/{}/updates/", project["id"]);
    let (_, listed) = app.get(&uri, None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn deleting_a_project_removes_everything_under_it() {
    let app = common::spawn().await;
    let token = app.token_for("pete").await;
    let doomed = app.create_project(None, json!({"name": "doomed"})).await;
    let kept = app.create_project(None, json!({"name": "kept"})).await;

    for project in [&doomed, &kept] {
        let (status, _) = app
            .post("/segments/", Some(&token), segment_body(&project["id"], "s"))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = app
            .post(
                "/updates/",
                Some(&token),
                json!({"project": project["id"], "title": "t", "content": "c"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let png = common::png_bytes();
    let doomed_id = doomed["id"].to_string();
    let request = common::multipart_request(
        "/photos/",
        &token,
        &[("project", &doomed_id), ("title", "before")],
        Some(("before.png", &png)),
    );
    let (status, photo) = app.send(request).await;
    assert_eq!(status, StatusCode::CREATED);
    let stored = app
        .media
        .path()
        .join(photo["image"].as_str().unwrap().trim_start_matches("/media/"));
    assert!(stored.exists());

    let uri = format!("/projects/{}/", doomed["id"]);
    let (status, _) = app.request(Method::DELETE, &uri, None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!stored.exists());

    for list in ["/segments/", "/updates/", "/photos/"] {
        let (_, remaining) = app.get(list, Some(&token)).await;
        let remaining = remaining.as_array().unwrap();
        assert!(
            remaining.iter().all(|item| item["project"] == kept["id"]),
            "{list}: {remaining:?}"
        );
    }
    let (_, segments) = app.get("/segments/", Some(&token)).await;
    assert_eq!(segments.as_array().unwrap().len(), 1);
}
