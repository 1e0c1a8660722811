/// Integration tests for the TaskClock API
///
/// Drive the full router (auth middleware, handlers, error mapping) with
/// `tower::ServiceExt::oneshot` over the in-memory store.

mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::TestContext;
use serde_json::{json, Value};

fn id(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new();

    let (status, body) = ctx.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let ctx = TestContext::new();

    let (status, body) = ctx.send("GET", "/v1/projects", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = ctx
        .send("GET", "/v1/projects", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_login_refresh_logout() {
    let ctx = TestContext::new();

    let register = json!({
        "name": "alice",
        "email": "alice@example.com",
        "password": "correct-horse",
        "confirm_password": "correct-horse",
    });

    let (status, tokens) = ctx
        .send("POST", "/v1/auth/register", None, Some(register.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let first_refresh = tokens["refresh_token"].as_str().unwrap().to_string();

    let (status, body) = ctx
        .send("POST", "/v1/auth/register", None, Some(register))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User already exists.");

    let (status, _) = ctx
        .send(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "wrong-horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, tokens) = ctx
        .send(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "correct-horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let access = tokens["access_token"].as_str().unwrap().to_string();
    let refresh = tokens["refresh_token"].as_str().unwrap().to_string();

    // Logging in again superseded the first refresh token
    let (status, _) = ctx
        .send(
            "POST",
            "/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": first_refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = ctx
        .send(
            "POST",
            "/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());

    // Access tokens are not refresh tokens
    let (status, _) = ctx
        .send(
            "POST",
            "/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": access })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx.send("POST", "/v1/auth/logout", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx
        .send(
            "POST",
            "/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_validation() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .send(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({
                "name": "al ice",
                "email": "not-an-email",
                "password": "correct-horse",
                "confirm_password": "battery-staple",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");

    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"name"));
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"confirm_password"));
}

#[tokio::test]
async fn test_project_and_task_flow() {
    let ctx = TestContext::new();
    let alice = ctx.user("alice").await;
    let bob = ctx.user("bob").await;

    let (status, project) = ctx
        .send(
            "POST",
            "/v1/projects",
            Some(&alice.token),
            Some(json!({ "title": "Apollo", "description": "Moon landing" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(project["author_id"], json!(alice.user.id));
    assert_eq!(project["member_ids"], json!([alice.user.id]));
    let project_id = id(&project);

    let new_task = json!({
        "title": "Build the rocket",
        "deadline": "2024-07-01T00:00:00Z",
    });

    let (status, body) = ctx
        .send(
            "POST",
            &format!("/v1/projects/{}/tasks", project_id),
            Some(&bob.token),
            Some(new_task.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "not_a_member");

    let (status, _) = ctx
        .send(
            "POST",
            &format!("/v1/projects/{}/members", project_id),
            Some(&alice.token),
            Some(json!({ "user_id": bob.user.id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, task) = ctx
        .send(
            "POST",
            &format!("/v1/projects/{}/tasks", project_id),
            Some(&bob.token),
            Some(new_task),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["status"], "CREATED");
    assert_eq!(task["initiator_id"], json!(bob.user.id));
    let task_uri = format!("/v1/projects/{}/tasks/{}", project_id, id(&task));

    let (status, task) = ctx
        .send(
            "POST",
            &format!("{}/assign", task_uri),
            Some(&bob.token),
            Some(json!({ "performer_id": bob.user.id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["performer_id"], json!(bob.user.id));

    let status_uri = format!("{}/status", task_uri);

    let (status, body) = ctx
        .send("PATCH", &status_uri, Some(&bob.token), Some(json!({ "status": "DONE" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_transition");

    let (status, task) = ctx
        .send(
            "PATCH",
            &status_uri,
            Some(&bob.token),
            Some(json!({ "status": "IN_PROGRESS" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["status"], "IN_PROGRESS");
    assert!(task["begin_at"].is_string());

    let (status, body) = ctx
        .send(
            "PATCH",
            &status_uri,
            Some(&bob.token),
            Some(json!({ "status": "IN_PROGRESS" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "same_status");

    ctx.clock.advance(Duration::minutes(90));

    let (status, task) = ctx
        .send("PATCH", &status_uri, Some(&bob.token), Some(json!({ "status": "DONE" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["spent_time"], 90 * 60 * 1000);

    let (status, time) = ctx
        .send(
            "GET",
            &format!("/v1/projects/{}/time", project_id),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(time, json!({ "days": 0, "hours": 1, "minutes": 30 }));

    let (status, report) = ctx
        .send(
            "GET",
            &format!("/v1/users/{}/time?time_filter=week", bob.user.id),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report[0]["project_name"], "Apollo");
    assert_eq!(report[0]["time_spent"], json!({ "days": 0, "hours": 1, "minutes": 30 }));

    let (status, mine) = ctx
        .send("GET", "/v1/projects/mine", Some(&bob.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["tasks"][0]["status"], "DONE");
}

#[tokio::test]
async fn test_membership_errors() {
    let ctx = TestContext::new();
    let alice = ctx.user("alice").await;
    let bob = ctx.user("bob").await;

    let (_, project) = ctx
        .send(
            "POST",
            "/v1/projects",
            Some(&alice.token),
            Some(json!({ "title": "Gemini" })),
        )
        .await;
    let project_id = id(&project);

    let (status, body) = ctx
        .send(
            "DELETE",
            &format!("/v1/projects/{}/members/{}", project_id, alice.user.id),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You cannot remove yourself.");

    let (status, body) = ctx
        .send(
            "POST",
            &format!("/v1/projects/{}/members", project_id),
            Some(&bob.token),
            Some(json!({ "user_id": bob.user.id })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "not_author");

    let (status, body) = ctx
        .send(
            "GET",
            &format!("/v1/projects/{}", project_id),
            Some(&bob.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "not_a_member");

    let (status, body) = ctx
        .send(
            "GET",
            &format!("/v1/projects/{}", uuid::Uuid::new_v4()),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "project_not_found");
}

#[tokio::test]
async fn test_delete_project_removes_tasks() {
    let ctx = TestContext::new();
    let alice = ctx.user("alice").await;

    let (_, project) = ctx
        .send(
            "POST",
            "/v1/projects",
            Some(&alice.token),
            Some(json!({ "title": "Mercury" })),
        )
        .await;
    let project_id = id(&project);

    for title in ["Orbit", "Splashdown"] {
        let (status, _) = ctx
            .send(
                "POST",
                &format!("/v1/projects/{}/tasks", project_id),
                Some(&alice.token),
                Some(json!({ "title": title, "deadline": "2024-07-01T00:00:00Z" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, _) = ctx
        .send(
            "DELETE",
            &format!("/v1/projects/{}", project_id),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, all) = ctx.send("GET", "/v1/projects", Some(&alice.token), None).await;
    assert_eq!(all, json!([]));
}

#[tokio::test]
async fn test_query_validation() {
    let ctx = TestContext::new();
    let alice = ctx.user("alice").await;

    let (status, body) = ctx
        .send(
            "GET",
            &format!("/v1/users/{}/time?time_filter=year", alice.user.id),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "time_filter");

    let (status, body) = ctx
        .send(
            "GET",
            &format!("/v1/users/{}/time?project_ids=1,2", alice.user.id),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "project_ids");

    let (status, body) = ctx
        .send(
            "POST",
            "/v1/projects",
            Some(&alice.token),
            Some(json!({ "title": "X" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "title");
}
