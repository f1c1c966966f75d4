mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{event_body, spawn_app};

#[tokio::test]
async fn create_requires_session() -> Result<()> {
    let app = spawn_app();
    let res = app
        .post("/api/events", None, event_body("Final", "Soccer", "2026-07-04T19:30:00Z", &[]))
        .await?;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body, json!({ "data": null, "error": "You must be logged in to perform this action" }));
    Ok(())
}

#[tokio::test]
async fn create_list_and_show() -> Result<()> {
    let app = spawn_app();
    let token = app.signed_in("owner@example.com").await?;
    let arena = app.venue(&token, "Arena", "Austin").await?;

    let created = app
        .post(
            "/api/events",
            Some(&token),
            event_body("Summer Final", "Soccer", "2026-07-04T19:30:00Z", &[&arena]),
        )
        .await?;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.data()["venues"][0]["id"], arena.as_str());
    let id = created.data()["id"].as_str().unwrap_or_default().to_string();

    app.post(
        "/api/events",
        Some(&token),
        event_body("Spring Open", "Tennis", "2026-04-01T10:00:00Z", &[&arena]),
    )
    .await?;

    // Public listing, ordered by date
    let all = app.get("/api/events", None).await?;
    assert_eq!(all.status, StatusCode::OK);
    let names: Vec<&str> = all.data().as_array().unwrap().iter().filter_map(|e| e["name"].as_str()).collect();
    assert_eq!(names, vec!["Spring Open", "Summer Final"]);

    let filtered = app.get("/api/events?search=final&sport_type=Soccer", None).await?;
    assert_eq!(filtered.data().as_array().map(Vec::len), Some(1));

    let every_sport = app.get("/api/events?sport_type=All%20Sports", None).await?;
    assert_eq!(every_sport.data().as_array().map(Vec::len), Some(2));

    let shown = app.get(&format!("/api/events/{}", id), None).await?;
    assert_eq!(shown.status, StatusCode::OK);
    assert_eq!(shown.data()["name"], "Summer Final");
    Ok(())
}

#[tokio::test]
async fn validation_and_bad_references() -> Result<()> {
    let app = spawn_app();
    let token = app.signed_in("owner@example.com").await?;

    let invalid = app
        .post("/api/events", Some(&token), event_body("", "Soccer", "2026-07-04T19:30:00Z", &[]))
        .await?;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid.error(), Some("Event name is required; At least one venue is required"));

    let unknown = app
        .post(
            "/api/events",
            Some(&token),
            event_body("Final", "Soccer", "2026-07-04T19:30:00Z", &["00000000-0000-0000-0000-000000000001"]),
        )
        .await?;
    assert_eq!(unknown.status, StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}

#[tokio::test]
async fn owner_rules_on_update_and_delete() -> Result<()> {
    let app = spawn_app();
    let owner = app.signed_in("owner@example.com").await?;
    let stranger = app.signed_in("stranger@example.com").await?;
    let arena = app.venue(&owner, "Arena", "Austin").await?;

    let created = app
        .post("/api/events", Some(&owner), event_body("Final", "Soccer", "2026-07-04T19:30:00Z", &[&arena]))
        .await?;
    let id = created.data()["id"].as_str().unwrap_or_default().to_string();
    let uri = format!("/api/events/{}", id);

    let hijack = app
        .request(
            Method::PUT,
            &uri,
            Some(&stranger),
            Some(event_body("Mine now", "Soccer", "2026-07-04T19:30:00Z", &[&arena])),
        )
        .await?;
    assert_eq!(hijack.status, StatusCode::FORBIDDEN);
    assert_eq!(hijack.error(), Some("You can only modify your own events"));

    let updated = app
        .request(
            Method::PUT,
            &uri,
            Some(&owner),
            Some(event_body("Final (replay)", "Soccer", "2026-07-05T19:30:00Z", &[&arena])),
        )
        .await?;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body, json!({ "data": { "id": id }, "error": null }));

    let mine = app.get("/api/events/mine", Some(&owner)).await?;
    assert_eq!(mine.data()[0]["name"], "Final (replay)");
    let theirs = app.get("/api/events/mine", Some(&stranger)).await?;
    assert_eq!(theirs.data().as_array().map(Vec::len), Some(0));

    let deleted = app.request(Method::DELETE, &uri, Some(&owner), None).await?;
    assert_eq!(deleted.status, StatusCode::OK);

    let gone = app.get(&uri, None).await?;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.error(), Some("Event not found"));
    Ok(())
}

#[tokio::test]
async fn bad_path_id_is_rejected_before_the_action() -> Result<()> {
    let app = spawn_app();
    let res = app.get("/api/events/not-a-uuid", None).await?;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["data"].is_null());
    assert!(res.error().unwrap_or_default().starts_with("Invalid path"));
    Ok(())
}

#[tokio::test]
async fn sports_list_starts_with_all_sports() -> Result<()> {
    let app = spawn_app();
    let res = app.get("/api/sports", None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()[0], "All Sports");
    Ok(())
}
