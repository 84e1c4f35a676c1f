mod common;

use axum::{
    Router,
    http::{StatusCode, header},
    middleware::from_fn_with_state,
    routing::get,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{empty_request, json_request, test_app};
use taskcrypt::{middleware_layer::encryption::encrypt_response, models::user::Role};

#[tokio::test]
async fn banner_and_fallback_are_sent_in_clear() {
    let app = test_app();

    let (status, body) = app.send(empty_request("GET", "/", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Task Manager API is running!");
    assert!(body.get("encrypted").is_none());

    let (status, body) = app.send(empty_request("GET", "/api/nowhere", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "success": false, "message": "Route not found" }));
}

#[tokio::test]
async fn auth_routes_are_never_wrapped() {
    let app = test_app();

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/auth/register",
            None,
            &json!({ "username": "alice", "email": "alice@example.com", "password": "pw" }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert!(body.get("encrypted").is_none());
    assert_eq!(body["message"], "User registered successfully");
    assert_eq!(body["data"]["user"]["username"], "alice");
    assert_eq!(body["data"]["user"]["role"], "user");
    assert_eq!(body["data"]["tokenType"], "Bearer");
    assert!(body["data"]["user"].get("passwordHash").is_none());

    let token = body["data"]["token"].as_str().unwrap();
    assert!(!token.is_empty());
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));

    let (status, body) = app.send(empty_request("GET", "/api/auth/verify", Some(token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Token is valid");
    assert_eq!(body["data"]["user"]["username"], "alice");
    assert!(body.get("encrypted").is_none());
}

#[tokio::test]
async fn auth_route_bodies_are_not_decrypted() {
    let app = test_app();
    let sealed = app.seal(&json!({ "email": "bob@example.com", "password": "pw" }));

    let (status, body) = app.send(json_request("POST", "/api/auth/login", None, &sealed)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_ne!(body["message"], "Invalid encrypted request data");
}

#[tokio::test]
async fn protected_routes_reject_bad_credentials() {
    let app = test_app();
    let (_, token) = app.user_with_token("carol", Role::User).await;

    let (status, body) = app.send(empty_request("GET", "/api/tasks", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Access denied. No token provided.");

    let truncated = &token[..token.len() - 2];
    let (status, body) = app.send(empty_request("GET", "/api/tasks", Some(truncated))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid encrypted token");
    assert!(body.get("encrypted").is_none());
}

#[tokio::test]
async fn encrypted_task_round_trip() {
    let app = test_app();
    let (user, token) = app.user_with_token("dave", Role::User).await;

    let sealed = app.seal(&json!({ "title": "Write report", "description": "quarterly" }));
    let (status, body) = app.send(json_request("POST", "/api/tasks", Some(token.as_str()), &sealed)).await;
    assert_eq!(status, StatusCode::CREATED);
    let opened = app.open(&body);
    assert_eq!(opened["success"], true);
    assert_eq!(opened["message"], "Task created successfully");
    assert_eq!(opened["data"]["title"], "Write report");
    assert_eq!(opened["data"]["completed"], false);
    assert_eq!(opened["data"]["userId"], user.id.to_string());
    let task_id = opened["data"]["id"].as_str().unwrap().to_string();

    let sealed = app.seal(&json!({ "completed": true }));
    let uri = format!("/api/tasks/{}", task_id);
    let (status, body) = app.send(json_request("PUT", &uri, Some(token.as_str()), &sealed)).await;
    assert_eq!(status, StatusCode::OK);
    let opened = app.open(&body);
    assert_eq!(opened["message"], "Task updated successfully");
    assert_eq!(opened["data"]["completed"], true);
    assert_eq!(opened["data"]["title"], "Write report");

    let (status, body) = app.send(empty_request("GET", "/api/tasks", Some(token.as_str()))).await;
    assert_eq!(status, StatusCode::OK);
    let opened = app.open(&body);
    assert_eq!(opened["count"], 1);
    assert_eq!(opened["data"][0]["id"], task_id.as_str());

    let (status, body) = app.send(empty_request("DELETE", &uri, Some(token.as_str()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.open(&body)["message"], "Task deleted successfully");

    let (status, body) = app.send(empty_request("GET", &uri, Some(token.as_str()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "success": false, "message": "Task not found" }));
}

#[tokio::test]
async fn clear_bodies_pass_through_the_inbound_stage() {
    let app = test_app();
    let (_, token) = app.user_with_token("erin", Role::User).await;

    let (status, body) = app
        .send(json_request("POST", "/api/tasks", Some(token.as_str()), &json!({ "title": "Plain" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.open(&body)["data"]["title"], "Plain");
}

#[tokio::test]
async fn malformed_encrypted_bodies_are_rejected() {
    let app = test_app();
    let (_, token) = app.user_with_token("frank", Role::User).await;

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/tasks",
            Some(token.as_str()),
            &json!({ "encryptedData": "not hex at all" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "success": false, "message": "Invalid encrypted request data" })
    );
}

#[tokio::test]
async fn safe_method_bodies_are_ignored() {
    let app = test_app();
    let (_, token) = app.user_with_token("grace", Role::User).await;

    let (status, body) = app
        .send(json_request(
            "GET",
            "/api/tasks",
            Some(token.as_str()),
            &json!({ "encryptedData": "zz" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.open(&body)["count"], 0);
}

#[tokio::test]
async fn validation_failures_stay_in_clear() {
    let app = test_app();
    let (_, token) = app.user_with_token("heidi", Role::User).await;

    let sealed = app.seal(&json!({ "title": "" }));
    let (status, body) = app.send(json_request("POST", "/api/tasks", Some(token.as_str()), &sealed)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body.get("encrypted").is_none());
}

#[tokio::test]
async fn identical_responses_get_distinct_envelopes() {
    let app = test_app();
    let (_, token) = app.user_with_token("ivan", Role::User).await;

    let (_, first) = app.send(empty_request("GET", "/api/tasks", Some(token.as_str()))).await;
    let (_, second) = app.send(empty_request("GET", "/api/tasks", Some(token.as_str()))).await;
    assert_ne!(first["data"], second["data"]);
    assert_eq!(app.open(&first), app.open(&second));
}

#[tokio::test]
async fn user_routes_enforce_ownership() {
    let app = test_app();
    let (judy, judy_token) = app.user_with_token("judy", Role::User).await;
    let (mallory, _) = app.user_with_token("mallory", Role::User).await;
    let (_, admin_token) = app.user_with_token("root", Role::Admin).await;

    let (status, _) = app.send(empty_request("GET", "/api/users", Some(judy_token.as_str()))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send(empty_request("GET", "/api/users", Some(admin_token.as_str()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.open(&body)["count"], 3);

    let own = format!("/api/users/{}", judy.id);
    let (status, body) = app.send(empty_request("GET", &own, Some(judy_token.as_str()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.open(&body)["data"]["username"], "judy");

    let other = format!("/api/users/{}", mallory.id);
    let (status, body) = app.send(empty_request("GET", &other, Some(judy_token.as_str()))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    app.send(json_request(
        "POST",
        "/api/tasks",
        Some(judy_token.as_str()),
        &app.seal(&json!({ "title": "Mine" })),
    ))
    .await;
    let tasks_uri = format!("/api/users/{}/tasks", judy.id);
    let (status, body) = app.send(empty_request("GET", &tasks_uri, Some(admin_token.as_str()))).await;
    assert_eq!(status, StatusCode::OK);
    let opened = app.open(&body);
    assert_eq!(opened["count"], 1);
    assert_eq!(opened["user"]["username"], "judy");
    assert_eq!(opened["data"][0]["title"], "Mine");
}

#[tokio::test]
async fn unreadable_json_yields_the_fixed_failure() {
    let app = test_app();
    let broken = Router::new()
        .route(
            "/broken",
            get(|| async { ([(header::CONTENT_TYPE, "application/json")], "{\"success\":tr") }),
        )
        .layer(from_fn_with_state(app.state.clone(), encrypt_response));

    let response = broken.oneshot(empty_request("GET", "/broken", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        body,
        json!({ "success": false, "message": "Response encryption failed" })
    );
}

#[tokio::test]
async fn malformed_path_ids_get_a_json_error() {
    let app = test_app();
    let (_, token) = app.user_with_token("oscar", Role::User).await;

    for uri in ["/api/tasks/not-a-uuid", "/api/users/not-a-uuid/tasks"] {
        let response = app
            .router
            .clone()
            .oneshot(empty_request("GET", uri, Some(token.as_str())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("application/json"));

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert!(body.get("encrypted").is_none());
        assert!(body["message"].as_str().unwrap().contains("not-a-uuid"));
    }
}

#[tokio::test]
async fn blank_markers_reach_the_handler_in_clear() {
    let app = test_app();
    let (_, token) = app.user_with_token("peggy", Role::User).await;

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/tasks",
            Some(token.as_str()),
            &json!({ "encryptedData": "", "title": "Unsealed" }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.open(&body)["data"]["title"], "Unsealed");

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/tasks",
            Some(token.as_str()),
            &json!({ "encryptedData": null }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_ne!(body["message"], "Invalid encrypted request data");
}
