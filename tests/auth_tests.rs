use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use metamaps::config::Config;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();

    let state = metamaps::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    metamaps::api::router(state).await
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    cookie: Option<&str>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body, cookie)
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = spawn_app().await;

    let (status, _, _) = call(&app, "GET", "/api/internal/user/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body, cookie) = call(
        &app,
        "POST",
        "/api/internal/user/register",
        Some(json!({"name": "cartographer", "password": "correct horse"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "cartographer");
    let cookie = cookie.expect("session cookie");

    let (status, body, _) = call(&app, "GET", "/api/internal/user/me", None, Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "cartographer");

    let (status, _, _) = call(
        &app,
        "POST",
        "/api/internal/user/login",
        Some(json!({"name": "cartographer", "password": "wrong password"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body, cookie) = call(
        &app,
        "POST",
        "/api/internal/user/login",
        Some(json!({"name": "cartographer", "password": "correct horse"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "cartographer");
    assert!(cookie.is_some());
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_short_input() {
    let app = spawn_app().await;

    let payload = json!({"name": "surveyor", "password": "long enough"});
    let (status, _, _) = call(
        &app,
        "POST",
        "/api/internal/user/register",
        Some(payload.clone()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body, _) = call(
        &app,
        "POST",
        "/api/internal/user/register",
        Some(payload),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["name"][0], "The name has already been taken.");

    let (status, body, _) = call(
        &app,
        "POST",
        "/api/internal/user/register",
        Some(json!({"name": "ab"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["name"].is_array());
    assert!(body["password"].is_array());

    let (status, _, _) = call(
        &app,
        "POST",
        "/api/internal/user/register",
        Some(json!({"name": "mapper", "password": "short"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = spawn_app().await;

    let (_, _, cookie) = call(
        &app,
        "POST",
        "/api/internal/user/register",
        Some(json!({"name": "navigator", "password": "compass rose"})),
        None,
    )
    .await;
    let cookie = cookie.expect("session cookie");

    let (status, _, _) = call(
        &app,
        "POST",
        "/api/internal/user/logout",
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = call(&app, "GET", "/api/internal/user/me", None, Some(&cookie)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
