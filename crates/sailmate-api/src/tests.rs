use std::sync::Arc;

use axum::{
    Router,
    body::{Body, Bytes},
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use sailmate_db::{Database, NewUser};

use crate::middleware::create_token;
use crate::{AppState, AppStateInner, router};

const SECRET: &str = "test-secret";

struct TestApp {
    router: Router,
    state: AppState,
    uploads: TempDir,
}

fn app() -> TestApp {
    let uploads = tempfile::tempdir().unwrap();
    let state = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        jwt_secret: SECRET.into(),
        upload_dir: uploads.path().to_path_buf(),
        token_ttl: chrono::Duration::days(7),
    });
    TestApp {
        router: router(state.clone()),
        state,
        uploads,
    }
}

/// Insert a user directly and mint a token, skipping password hashing.
fn seed(app: &TestApp, username: &str) -> (Uuid, String) {
    let id = Uuid::new_v4();
    let email = format!("{}@example.com", username);
    app.state
        .db
        .create_user(&NewUser {
            id,
            email: email.clone(),
            username: username.into(),
            password_hash: "unused".into(),
            first_name: None,
            last_name: None,
        })
        .unwrap();
    let token = create_token(SECRET, chrono::Duration::days(1), id, &email, username).unwrap();
    (id, token)
}

async fn send_raw(app: &TestApp, req: Request<Body>) -> (StatusCode, Bytes) {
    let resp = app.router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, bytes)
}

async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let req = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let (status, bytes) = send_raw(app, req).await;
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn swipe(app: &TestApp, token: &str, target: Uuid, direction: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/api/swipes",
        Some(token),
        Some(json!({ "targetUserId": target, "direction": direction })),
    )
    .await
}

fn multipart_request(token: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let boundary = "sailmate-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"boat\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/api/profile/upload-photo")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn register_login_and_me() {
    let app = app();
    let registration = json!({
        "email": "Ahab@Pequod.sea",
        "password": "white-whale",
        "username": "ahab",
        "firstName": "  ",
    });

    let (status, body) =
        send(&app, Method::POST, "/api/auth/register", None, Some(registration.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "ahab");
    let user_id = body["userId"].as_str().unwrap().to_string();

    let (status, body) =
        send(&app, Method::POST, "/api/auth/register", None, Some(registration)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already exists"));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "ahab@pequod.sea", "password": "white-whale" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userId"], user_id.as_str());
    let token = body["token"].as_str().unwrap().to_string();

    let (status, me) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "ahab@pequod.sea");
    assert_eq!(me["id"], user_id.as_str());
    assert_eq!(me["firstName"], Value::Null);

    for attempt in [
        json!({ "email": "ahab@pequod.sea", "password": "wrong-password" }),
        json!({ "email": "nobody@pequod.sea", "password": "white-whale" }),
    ] {
        let (status, body) = send(&app, Method::POST, "/api/auth/login", None, Some(attempt)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");
    }
}

#[tokio::test]
async fn register_rejects_bad_input() {
    let app = app();
    for body in [
        json!({ "email": "a@b.c", "password": "long-enough" }),
        json!({ "email": "a@b.c", "password": "short", "username": "ahab" }),
        json!({ "email": "not-an-email", "password": "long-enough", "username": "ahab" }),
        json!({ "email": "a@b.c", "password": "long-enough", "username": "ab" }),
    ] {
        let (status, body) = send(&app, Method::POST, "/api/auth/register", None, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn protected_routes_require_valid_token() {
    let app = app();
    let (status, _) = send(&app, Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/api/matches", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let foreign =
        create_token("other-secret", chrono::Duration::days(1), Uuid::new_v4(), "x@y.z", "x")
            .unwrap();
    let (status, _) = send(&app, Method::GET, "/api/swipes/stats", Some(&foreign), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn swipes_resolve_into_a_single_match() {
    let app = app();
    let (a, a_token) = seed(&app, "alice");
    let (b, b_token) = seed(&app, "bob");
    let (_, c_token) = seed(&app, "carol");

    let (status, body) = swipe(&app, &a_token, b, "right").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "matched": false }));

    let (status, _) = swipe(&app, &a_token, b, "right").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = swipe(&app, &b_token, a, "right").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matched"], true);
    let match_id = body["matchId"].as_str().unwrap().to_string();

    let (status, _) = swipe(&app, &b_token, a, "right").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, list) = send(&app, Method::GET, "/api/matches", Some(&a_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["matchId"], match_id.as_str());
    assert_eq!(list[0]["userId"], b.to_string().as_str());
    assert_eq!(list[0]["username"], "bob");

    let uri = format!("/api/matches/{}", match_id);
    let (status, found) = send(&app, Method::GET, &uri, Some(&b_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (lo, hi) = sailmate_db::canonical_pair(a, b);
    assert_eq!(found["user1Id"], lo.to_string().as_str());
    assert_eq!(found["user2Id"], hi.to_string().as_str());

    let (status, _) = send(&app, Method::GET, &uri, Some(&c_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, stats) = send(&app, Method::GET, "/api/swipes/stats", Some(&a_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats, json!({ "right": 1, "left": 0 }));
}

#[tokio::test]
async fn left_swipe_on_a_fan_does_not_match() {
    let app = app();
    let (a, a_token) = seed(&app, "alice");
    let (b, b_token) = seed(&app, "bob");

    swipe(&app, &a_token, b, "right").await;
    let (status, body) = swipe(&app, &b_token, a, "left").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "matched": false }));

    let (_, list) = send(&app, Method::GET, "/api/matches", Some(&a_token), None).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn invalid_swipes_are_rejected() {
    let app = app();
    let (a, a_token) = seed(&app, "alice");
    let (b, _) = seed(&app, "bob");

    let (status, _) = swipe(&app, &a_token, b, "up").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = swipe(&app, &a_token, a, "right").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot swipe on yourself");

    let (status, _) = swipe(&app, &a_token, Uuid::new_v4(), "right").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/swipes",
        Some(&a_token),
        Some(json!({ "targetUserId": "not-a-uuid", "direction": "left" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, stats) = send(&app, Method::GET, "/api/swipes/stats", Some(&a_token), None).await;
    assert_eq!(stats, json!({ "right": 0, "left": 0 }));
}

#[tokio::test]
async fn chat_is_limited_to_participants() {
    let app = app();
    let (a, a_token) = seed(&app, "alice");
    let (b, b_token) = seed(&app, "bob");
    let (_, c_token) = seed(&app, "carol");

    swipe(&app, &a_token, b, "right").await;
    let (_, body) = swipe(&app, &b_token, a, "right").await;
    let match_id = body["matchId"].as_str().unwrap().to_string();
    let uri = format!("/api/chat/{}/messages", match_id);

    let script = [(&a_token, "ahoy"), (&b_token, "ahoy yourself"), (&a_token, "fair winds")];
    for (token, content) in script {
        let body = json!({ "content": content });
        let (status, msg) = send(&app, Method::POST, &uri, Some(token), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(msg["content"], content);
        assert_eq!(msg["matchId"], match_id.as_str());
    }

    let (status, messages) = send(&app, Method::GET, &uri, Some(&b_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let contents: Vec<&str> = messages
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["ahoy", "ahoy yourself", "fair winds"]);
    assert_eq!(messages[0]["senderId"], a.to_string().as_str());

    let blank = json!({ "content": "   " });
    let (status, _) = send(&app, Method::POST, &uri, Some(&a_token), Some(blank)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let hello = json!({ "content": "hi" });
    let (status, _) = send(&app, Method::POST, &uri, Some(&c_token), Some(hello)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::GET, &uri, Some(&c_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let negative = format!("{}?page=-1", uri);
    let (status, _) = send(&app, Method::GET, &negative, Some(&a_token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let next = format!("{}?page=1", uri);
    let (status, empty) = send(&app, Method::GET, &next, Some(&a_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(empty, json!([]));
}

#[tokio::test]
async fn profile_update_and_public_view() {
    let app = app();
    let (id, token) = seed(&app, "ishmael");

    let (status, profile) = send(
        &app,
        Method::PUT,
        "/api/profile",
        Some(&token),
        Some(json!({
            "firstName": "Ishmael",
            "bio": "Call me Ishmael",
            "age": 29,
            "sailingLevel": "beginner",
            "boatType": "Whaler",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["sailingLevel"], "beginner");

    let (status, profile) = send(
        &app,
        Method::PUT,
        "/api/profile",
        Some(&token),
        Some(json!({ "bio": "", "location": "New Bedford" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["bio"], Value::Null);
    assert_eq!(profile["firstName"], "Ishmael");
    assert_eq!(profile["location"], "New Bedford");

    let (status, _) =
        send(&app, Method::PUT, "/api/profile", Some(&token), Some(json!({ "age": 7 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, public) =
        send(&app, Method::GET, &format!("/api/profile/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(public["username"], "ishmael");
    assert_eq!(public["age"], 29);
    assert!(public.get("email").is_none());

    // Form inputs post the age as text.
    let (status, profile) =
        send(&app, Method::PUT, "/api/profile", Some(&token), Some(json!({ "age": "30" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["age"], 30);

    let (status, profile) = send(
        &app,
        Method::PUT,
        "/api/profile",
        Some(&token),
        Some(json!({ "bio": "", "age": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["age"], Value::Null);
    assert_eq!(profile["firstName"], "Ishmael");

    let unknown = format!("/api/profile/{}", Uuid::new_v4());
    let (status, _) = send(&app, Method::GET, &unknown, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::GET, "/api/profile/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn photo_upload_stores_and_serves_file() {
    let app = app();
    let (_, token) = seed(&app, "photographer");
    let data = b"\x89PNG\r\n\x1a\nnot really a png";

    let (status, bytes) = send_raw(&app, multipart_request(&token, "image/png", data)).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    let url = body["photoUrl"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/photos/") && url.ends_with(".png"));
    assert_eq!(body["photos"], json!([url.clone()]));

    let file_name = url.trim_start_matches("/uploads/photos/");
    let on_disk = std::fs::read(app.uploads.path().join("photos").join(file_name)).unwrap();
    assert_eq!(on_disk, data);

    let req = Request::builder().uri(url.as_str()).body(Body::empty()).unwrap();
    let (status, served) = send_raw(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&served[..], data);

    let (status, _) = send_raw(&app, multipart_request(&token, "application/pdf", b"%PDF")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, me) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(me["photos"], json!([url]));
}

#[tokio::test]
async fn discover_hides_self_and_swiped_profiles() {
    let app = app();
    let (_, me_token) = seed(&app, "viewer");
    let (liked, _) = seed(&app, "liked");
    let (fresh, _) = seed(&app, "fresh");

    swipe(&app, &me_token, liked, "right").await;

    let (status, profiles) =
        send(&app, Method::GET, "/api/profile/discover/available", Some(&me_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = profiles
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![fresh.to_string().as_str()]);
}
