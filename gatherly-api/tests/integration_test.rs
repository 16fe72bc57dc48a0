/// Integration tests for the Gatherly API
///
/// Drives the full router end-to-end:
/// - Signup/login flow and token handling
/// - Event CRUD with ownership and admin checks
/// - Registration endpoints
/// - Nearby filter
/// - Comment authorization and cascade deletes

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{body_json, TestContext, TestEvent};
use gatherly_shared::models::registration::Registration;
use gatherly_shared::models::user::UserRole;
use serde_json::json;
use tower::Service as _;
use uuid::Uuid;

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn get_auth(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn send_json(method: &str, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");

    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }

    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_signup_and_login_flow() {
    let ctx = TestContext::new().await.unwrap();
    let email = format!("signup-{}@example.com", Uuid::new_v4());

    // Signup
    let response = ctx
        .app
        .clone()
        .call(send_json(
            "POST",
            "/v1/auth/signup",
            None,
            json!({
                "name": "New User",
                "email": email,
                "password": "sufficiently-strong-1"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["status"], 201);
    assert!(body["data"]["access_token"].is_string());
    assert!(body["data"]["refresh_token"].is_string());

    // Duplicate signup conflicts
    let response = ctx
        .app
        .clone()
        .call(send_json(
            "POST",
            "/v1/auth/signup",
            None,
            json!({
                "name": "New User",
                "email": email,
                "password": "sufficiently-strong-1"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Login with the right password
    let response = ctx
        .app
        .clone()
        .call(send_json(
            "POST",
            "/v1/auth/login",
            None,
            json!({ "email": email, "password": "sufficiently-strong-1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let refresh_token = body["data"]["refresh_token"].as_str().unwrap().to_string();

    // Login with the wrong password
    let response = ctx
        .app
        .clone()
        .call(send_json(
            "POST",
            "/v1/auth/login",
            None,
            json!({ "email": email, "password": "wrong-password-1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Refresh issues a new access token
    let response = ctx
        .app
        .clone()
        .call(send_json(
            "POST",
            "/v1/auth/refresh",
            None,
            json!({ "refresh_token": refresh_token }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["data"]["access_token"].is_string());
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx.app.clone().call(get("/v1/users/profile")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = ctx
        .app
        .clone()
        .call(send_json("POST", "/v1/events", None, json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Garbage token fails closed
    let response = ctx
        .app
        .clone()
        .call(get_auth("/v1/users/profile", "not-a-jwt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_event_crud_and_authorization() {
    let ctx = TestContext::new().await.unwrap();
    let community = common::create_test_community(&ctx.db, ctx.user.id).await.unwrap();

    let start = chrono::Utc::now() + chrono::Duration::days(14);
    let end = start + chrono::Duration::hours(3);

    // Create through the API; organizer is the caller
    let response = ctx
        .app
        .clone()
        .call(send_json(
            "POST",
            "/v1/events",
            Some(&ctx.jwt_token),
            json!({
                "title": "Park Cleanup",
                "description": "Bring gloves",
                "community_id": community.id,
                "start_time": start,
                "end_time": end,
                "capacity": 10
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let event_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["organizer_id"], json!(ctx.user.id));

    // end <= start is a validation failure
    let response = ctx
        .app
        .clone()
        .call(send_json(
            "POST",
            "/v1/events",
            Some(&ctx.jwt_token),
            json!({
                "title": "Backwards",
                "description": "Time flows the wrong way",
                "community_id": community.id,
                "start_time": end,
                "end_time": start
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Lookup
    let response = ctx
        .app
        .clone()
        .call(get(&format!("/v1/events/{}", event_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["title"], "Park Cleanup");
    assert_eq!(body["data"]["attending"], 0);

    // Unknown id is a 404
    let response = ctx
        .app
        .clone()
        .call(get(&format!("/v1/events/{}", Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // A stranger cannot update
    let (_, stranger_token) = ctx.other_user(UserRole::Member).await.unwrap();
    let response = ctx
        .app
        .clone()
        .call(send_json(
            "PUT",
            &format!("/v1/events/{}", event_id),
            Some(&stranger_token),
            json!({ "title": "Hijacked" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // An admin can
    let (_, admin_token) = ctx.other_user(UserRole::Admin).await.unwrap();
    let response = ctx
        .app
        .clone()
        .call(send_json(
            "PUT",
            &format!("/v1/events/{}", event_id),
            Some(&admin_token),
            json!({ "title": "Park Cleanup (Moderated)" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // A stranger cannot delete, the organizer can
    let response = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .method("DELETE")
                .uri(format!("/v1/events/{}", event_id))
                .header("authorization", format!("Bearer {}", stranger_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .method("DELETE")
                .uri(format!("/v1/events/{}", event_id))
                .header("authorization", ctx.auth_header())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_register_and_unregister_endpoints() {
    let ctx = TestContext::new().await.unwrap();
    let community = common::create_test_community(&ctx.db, ctx.user.id).await.unwrap();
    let event =
        common::create_test_event(&ctx.db, community.id, ctx.user.id, TestEvent::default())
            .await
            .unwrap();

    let (_, attendee_token) = ctx.other_user(UserRole::Member).await.unwrap();

    // Register
    let response = ctx
        .app
        .clone()
        .call(send_json(
            "POST",
            &format!("/v1/events/{}/register", event.id),
            Some(&attendee_token),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "registered");

    // Unregister
    let response = ctx
        .app
        .clone()
        .call(send_json(
            "POST",
            &format!("/v1/events/{}/unregister", event.id),
            Some(&attendee_token),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "cancelled");

    // Unregistering again is a negative result, not an error
    let response = ctx
        .app
        .clone()
        .call(send_json(
            "POST",
            &format!("/v1/events/{}/unregister", event.id),
            Some(&attendee_token),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["data"].is_null());

    // Registering for a missing event is a 404
    let response = ctx
        .app
        .clone()
        .call(send_json(
            "POST",
            &format!("/v1/events/{}/register", Uuid::new_v4()),
            Some(&attendee_token),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_nearby_events_endpoint() {
    let ctx = TestContext::new().await.unwrap();
    let community = common::create_test_community(&ctx.db, ctx.user.id).await.unwrap();

    let origin_event = common::create_test_event(
        &ctx.db,
        community.id,
        ctx.user.id,
        TestEvent {
            coordinates: Some((0.0, 0.0)),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    // (1,1) is roughly 157 km from the origin
    let far_event = common::create_test_event(
        &ctx.db,
        community.id,
        ctx.user.id,
        TestEvent {
            coordinates: Some((1.0, 1.0)),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    // No coordinates: never eligible for the nearby filter
    let no_coords_event =
        common::create_test_event(&ctx.db, community.id, ctx.user.id, TestEvent::default())
            .await
            .unwrap();

    let response = ctx
        .app
        .clone()
        .call(get("/v1/events/nearby?latitude=0&longitude=0&radius_km=10"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();

    assert!(ids.contains(&origin_event.id.to_string().as_str()));
    assert!(!ids.contains(&far_event.id.to_string().as_str()));
    assert!(!ids.contains(&no_coords_event.id.to_string().as_str()));

    // A 200 km radius picks up the far event too
    let response = ctx
        .app
        .clone()
        .call(get("/v1/events/nearby?latitude=0&longitude=0&radius_km=200"))
        .await
        .unwrap();
    let body = body_json(response).await;
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&origin_event.id.to_string().as_str()));
    assert!(ids.contains(&far_event.id.to_string().as_str()));

    // Out-of-range coordinates are rejected
    let response = ctx
        .app
        .clone()
        .call(get("/v1/events/nearby?latitude=91&longitude=0"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_comment_authorization_and_moderation() {
    let ctx = TestContext::new().await.unwrap();
    let community = common::create_test_community(&ctx.db, ctx.user.id).await.unwrap();
    let event =
        common::create_test_event(&ctx.db, community.id, ctx.user.id, TestEvent::default())
            .await
            .unwrap();

    // Author comments via the API
    let response = ctx
        .app
        .clone()
        .call(send_json(
            "POST",
            "/v1/comments",
            Some(&ctx.jwt_token),
            json!({ "event_id": event.id, "content": "See you there!" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let comment_id = body["data"]["id"].as_str().unwrap().to_string();

    // The author can edit
    let response = ctx
        .app
        .clone()
        .call(send_json(
            "PUT",
            &format!("/v1/comments/{}", comment_id),
            Some(&ctx.jwt_token),
            json!({ "content": "See you all there!" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Admins get no bypass on comment edits
    let (_, admin_token) = ctx.other_user(UserRole::Admin).await.unwrap();
    let response = ctx
        .app
        .clone()
        .call(send_json(
            "PUT",
            &format!("/v1/comments/{}", comment_id),
            Some(&admin_token),
            json!({ "content": "Rewritten by admin" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // But they can hide, which removes the comment from the listing
    let response = ctx
        .app
        .clone()
        .call(send_json(
            "POST",
            &format!("/v1/comments/{}/hide", comment_id),
            Some(&admin_token),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .clone()
        .call(get(&format!("/v1/comments/event/{}", event.id)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    // Non-admins cannot moderate
    let (_, member_token) = ctx.other_user(UserRole::Member).await.unwrap();
    let response = ctx
        .app
        .clone()
        .call(send_json(
            "POST",
            &format!("/v1/comments/{}/hide", comment_id),
            Some(&member_token),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_event_delete_cascades() {
    let ctx = TestContext::new().await.unwrap();
    let community = common::create_test_community(&ctx.db, ctx.user.id).await.unwrap();
    let event =
        common::create_test_event(&ctx.db, community.id, ctx.user.id, TestEvent::default())
            .await
            .unwrap();

    // Seed a registration and a threaded comment pair
    let (attendee, _) = ctx.other_user(UserRole::Member).await.unwrap();
    Registration::register(&ctx.db, event.id, attendee.id).await.unwrap();

    let response = ctx
        .app
        .clone()
        .call(send_json(
            "POST",
            "/v1/comments",
            Some(&ctx.jwt_token),
            json!({ "event_id": event.id, "content": "Root comment" }),
        ))
        .await
        .unwrap();
    let root_id = body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = ctx
        .app
        .clone()
        .call(send_json(
            "POST",
            "/v1/comments",
            Some(&ctx.jwt_token),
            json!({ "event_id": event.id, "content": "A reply", "parent_id": root_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Delete the event through the API
    let response = ctx
        .app
        .clone()
        .call(
            Request::builder()
                .method("DELETE")
                .uri(format!("/v1/events/{}", event.id))
                .header("authorization", ctx.auth_header())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Comments are gone
    let response = ctx
        .app
        .clone()
        .call(get(&format!("/v1/comments/event/{}", event.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    // The registration is no longer retrievable
    let registration = Registration::find_active(&ctx.db, event.id, attendee.id)
        .await
        .unwrap();
    assert!(registration.is_none());
}

#[tokio::test]
async fn test_community_membership_flow() {
    let ctx = TestContext::new().await.unwrap();

    // Create a community via the API
    let response = ctx
        .app
        .clone()
        .call(send_json(
            "POST",
            "/v1/communities",
            Some(&ctx.jwt_token),
            json!({ "name": "Urban Gardeners" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let community_id = body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    // Creator sees it under my-communities
    let response = ctx
        .app
        .clone()
        .call(get_auth("/v1/communities/my-communities", &ctx.jwt_token))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!(body["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|c| c["id"] == json!(community_id)));

    // Another user joins, then leaves
    let (_, member_token) = ctx.other_user(UserRole::Member).await.unwrap();
    let response = ctx
        .app
        .clone()
        .call(send_json(
            "POST",
            &format!("/v1/communities/{}/join", community_id),
            Some(&member_token),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .clone()
        .call(send_json(
            "POST",
            &format!("/v1/communities/{}/leave", community_id),
            Some(&member_token),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["data"]["left_at"].is_string());

    // Leaving again is a negative result
    let response = ctx
        .app
        .clone()
        .call(send_json(
            "POST",
            &format!("/v1/communities/{}/leave", community_id),
            Some(&member_token),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["data"].is_null());
}
