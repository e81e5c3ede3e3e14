use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use metamaps::config::Config;
use metamaps::domain::{LayerId, TimeRange};
use metamaps::metadata::{MetadataError, MetadataParser, MetadataRegistry, canonical_url};
use metamaps::models::{Geodata, Layer, ParsedMetadata};
use metamaps::state::SharedState;
use sea_orm::ConnectionTrait;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

const RIVERS_URL: &str = "http://maps.example.org/wms";
const EUROPE_BBOX: &str = "POLYGON((5 45,15 45,15 55,5 55,5 45))";

/// Answers every URL with the same two-layer service, except URLs containing
/// `broken`, which fail like an unreachable server.
struct StubParser;

#[async_trait]
impl MetadataParser for StubParser {
    fn code(&self) -> &str {
        "wms"
    }

    fn name(&self) -> &str {
        "Stub Map Service"
    }

    async fn parse(&self, url: &str) -> Result<ParsedMetadata, MetadataError> {
        if url.contains("broken") {
            return Err(MetadataError::Status(503));
        }

        let mut geodata = Geodata::new(canonical_url(url), "wms");
        geodata.title = "Parsed title".to_string();
        geodata.bbox = Some(EUROPE_BBOX.to_string());
        geodata.keywords = vec!["hydrology".to_string()];
        geodata.time = TimeRange::default();

        let layer = |name: &str, title: &str| Layer {
            id: LayerId::new(0),
            name: name.to_string(),
            title: Some(title.to_string()),
            bbox: Some(EUROPE_BBOX.to_string()),
        };

        Ok(ParsedMetadata {
            geodata,
            layers: vec![layer("rivers", "Rivers"), layer("lakes", "Lakes")],
        })
    }
}

async fn spawn_app() -> (Router, Arc<SharedState>) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();

    let mut registry = MetadataRegistry::new();
    registry.register(Arc::new(StubParser));

    let shared = Arc::new(
        SharedState::with_registry(config, registry)
            .await
            .expect("Failed to create shared state"),
    );
    let state = metamaps::api::create_app_state(shared.clone(), None)
        .await
        .expect("Failed to create app state");
    (metamaps::api::router(state).await, shared)
}

struct TestResponse {
    status: StatusCode,
    body: Value,
    cookie: Option<String>,
}

async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };

    TestResponse {
        status,
        body,
        cookie,
    }
}

async fn post(app: &Router, uri: &str, body: Value, cookie: Option<&str>) -> TestResponse {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    send(app, builder.body(Body::from(body.to_string())).unwrap()).await
}

async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> TestResponse {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    send(app, builder.body(Body::empty()).unwrap()).await
}

async fn add_comment(app: &Router, fields: Value) -> TestResponse {
    let mut body = json!({
        "url": RIVERS_URL,
        "datatype": "wms",
        "title": "Rivers of Europe",
        "text": "Useful overview"
    });
    if let (Some(body), Some(fields)) = (body.as_object_mut(), fields.as_object()) {
        for (k, v) in fields {
            body.insert(k.clone(), v.clone());
        }
    }
    post(app, "/api/internal/geodata/add", body, None).await
}

#[tokio::test]
async fn test_add_imports_geodata_once() {
    let (app, shared) = spawn_app().await;

    let first = add_comment(&app, json!({})).await;
    assert_eq!(first.status, StatusCode::OK);
    let geodata = &first.body["geodata"];
    let id = geodata["id"].as_i64().unwrap();
    assert!(id > 0);
    assert_eq!(geodata["metadata"]["title"], "Rivers of Europe");
    assert_eq!(geodata["metadata"]["datatype"], "wms");
    assert_eq!(
        geodata["permalink"],
        format!("http://localhost:8000/geodata/{id}")
    );
    assert!(geodata.get("layer").is_none());
    assert!(geodata.get("comments").is_none());

    let second = post(
        &app,
        "/api/internal/geodata/add",
        json!({
            "url": format!("{RIVERS_URL}?SERVICE=WMS&REQUEST=GetCapabilities"),
            "text": "Second opinion"
        }),
        None,
    )
    .await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.body["geodata"]["id"].as_i64(), Some(id));
    assert_eq!(second.body["geodata"]["metadata"]["title"], "Rivers of Europe");

    assert_eq!(shared.store.count_geodata().await.unwrap(), 1);
    assert_eq!(shared.store.count_comments().await.unwrap(), 2);
}

#[tokio::test]
async fn test_add_validation() {
    let (app, shared) = spawn_app().await;

    let response = post(
        &app,
        "/api/internal/geodata/add",
        json!({"url": "not a url", "text": "x", "rating": 9}),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    for field in ["url", "datatype", "title", "text", "rating"] {
        assert!(
            response.body[field].is_array(),
            "expected error for {field}: {}",
            response.body
        );
    }
    assert_eq!(response.body["datatype"][0], "The datatype field is required.");

    let response = add_comment(&app, json!({"datatype": "kml"})).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["datatype"][0], "The selected datatype is invalid.");

    let response = add_comment(&app, json!({"geometry": "POINT(1)"})).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert!(response.body["geometry"].is_array());

    let response = add_comment(&app, json!({"url": "http://broken.example.org/wms"})).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body, json!({}));

    assert_eq!(shared.store.count_geodata().await.unwrap(), 0);
}

#[tokio::test]
async fn test_metadata_known_and_unknown() {
    let (app, _) = spawn_app().await;

    let response = post(
        &app,
        "/api/internal/geodata/metadata",
        json!({"url": RIVERS_URL, "datatype": "wms"}),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let geodata = &response.body["geodata"];
    assert_eq!(geodata["id"], 0);
    assert_eq!(geodata["isNew"], true);
    assert_eq!(geodata["metadata"]["title"], "Parsed title");
    assert_eq!(geodata["layer"].as_array().unwrap().len(), 2);

    let stored = add_comment(&app, json!({})).await;
    let id = stored.body["geodata"]["id"].as_i64().unwrap();

    // Form-encoded bodies are accepted as well.
    let response = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/internal/geodata/metadata")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(
                "url=http%3A%2F%2Fmaps.example.org%2Fwms%3Fservice%3DWMS&datatype=wms",
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let geodata = &response.body["geodata"];
    assert_eq!(geodata["id"].as_i64(), Some(id));
    assert_eq!(geodata["isNew"], false);
    assert_eq!(geodata["metadata"]["title"], "Rivers of Europe");
    let layers = geodata["layer"].as_array().unwrap();
    assert_eq!(layers[0]["id"], "lakes");
    assert_eq!(layers[1]["id"], "rivers");
}

#[tokio::test]
async fn test_metadata_parse_failure() {
    let (app, _) = spawn_app().await;

    let response = post(
        &app,
        "/api/internal/geodata/metadata",
        json!({"url": "http://broken.example.org/wms", "datatype": "wms"}),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body, json!({"url": ["The URL format is invalid."]}));

    let response = post(
        &app,
        "/api/internal/geodata/metadata",
        json!({"url": RIVERS_URL}),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["datatype"][0], "The datatype field is required.");
}

#[tokio::test]
async fn test_keywords_is_not_found() {
    let (app, _) = spawn_app().await;

    let response = post(
        &app,
        "/api/internal/geodata/keywords",
        json!({"q": "riv", "metadata": true}),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body, Value::Null);
}

#[tokio::test]
async fn test_search_save_and_load() {
    let (app, _) = spawn_app().await;

    let response = post(
        &app,
        "/api/internal/geodata/search/save",
        json!({"q": "flood"}),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert!(response.body["bbox"].is_array());

    let response = post(
        &app,
        "/api/internal/geodata/search/save",
        json!({
            "q": "flood",
            "bbox": EUROPE_BBOX,
            "radius": 25,
            "minrating": 3,
            "metadata": "1",
            "start": "2014-01-01",
            "end": "not a date"
        }),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let permalink = response.body["permalink"].as_str().unwrap();
    let id = permalink
        .strip_prefix("http://localhost:8000/geodata/search/")
        .unwrap();
    assert_eq!(id.len(), 10);
    assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));

    let response = get(&app, &format!("/api/internal/geodata/search/load/{id}"), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        json!({
            "permalink": {
                "q": "flood",
                "metadata": true,
                "bbox": EUROPE_BBOX,
                "radius": 25,
                "time": {"start": "2014-01-01T00:00:00Z", "end": null},
                "minrating": 3
            }
        })
    );

    let response = get(&app, "/api/internal/geodata/search/load/doesnotexist", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failed_writes_are_conflicts() {
    let (app, shared) = spawn_app().await;
    shared
        .store
        .conn
        .execute_unprepared("DROP TABLE saved_searches")
        .await
        .unwrap();
    shared
        .store
        .conn
        .execute_unprepared("DROP TABLE comments")
        .await
        .unwrap();

    let response = post(
        &app,
        "/api/internal/geodata/search/save",
        json!({"bbox": EUROPE_BBOX}),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body, json!({}));

    let response = add_comment(&app, json!({"rating": 4})).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body, json!({}));
}

#[tokio::test]
async fn test_comments_grouped_by_layer() {
    let (app, _) = spawn_app().await;

    let first = add_comment(&app, json!({"layer": "rivers", "rating": 5})).await;
    let id = first.body["geodata"]["id"].as_i64().unwrap();
    add_comment(&app, json!({"layer": "lakes", "rating": 2, "text": "Lakes are outdated"})).await;
    add_comment(&app, json!({"text": "No layer given"})).await;
    add_comment(&app, json!({"layer": "glaciers", "text": "Unknown layer name"})).await;

    let response = post(
        &app,
        &format!("/api/internal/geodata/comments/{id}"),
        json!({}),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let geodata = &response.body["geodata"];
    assert_eq!(geodata["commentCount"], json!({"all": 4, "filtered": 4}));
    assert_eq!(geodata["ratingAvg"], json!({"all": 3.5, "filtered": 3.5}));
    assert_eq!(geodata["comments"].as_array().unwrap().len(), 2);

    let layers = geodata["layer"].as_array().unwrap();
    let grouped: usize = layers
        .iter()
        .map(|l| l["comments"].as_array().unwrap().len())
        .sum::<usize>()
        + geodata["comments"].as_array().unwrap().len();
    assert_eq!(grouped, 4);

    let rivers = layers.iter().find(|l| l["id"] == "rivers").unwrap();
    let comment = &rivers["comments"][0];
    assert_eq!(comment["rating"], 5);
    assert_eq!(comment["user"], Value::Null);
    assert!(
        comment["permalink"]
            .as_str()
            .unwrap()
            .starts_with("http://localhost:8000/comment/")
    );

    let response = post(
        &app,
        &format!("/api/internal/geodata/{id}/comments"),
        json!({"minrating": 4}),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let geodata = &response.body["geodata"];
    assert_eq!(geodata["commentCount"], json!({"all": 4, "filtered": 1}));
    assert_eq!(geodata["ratingAvg"], json!({"all": 3.5, "filtered": 5.0}));
    assert_eq!(geodata["comments"], json!([]));
    let lakes = geodata["layer"]
        .as_array()
        .unwrap()
        .iter()
        .find(|l| l["id"] == "lakes")
        .unwrap();
    assert_eq!(lakes["comments"], json!([]));

    let response = post(
        &app,
        &format!("/api/internal/geodata/comments/{id}"),
        json!({"q": "nothing matches this"}),
        None,
    )
    .await;
    assert_eq!(
        response.body["geodata"]["ratingAvg"],
        json!({"all": 3.5, "filtered": 0.0})
    );

    let response = post(&app, "/api/internal/geodata/comments/999", json!({}), None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_filters() {
    let (app, _) = spawn_app().await;

    add_comment(&app, json!({"text": "Flood extents look right", "rating": 4})).await;
    add_comment(&app, json!({"text": "Colours are hard to read", "rating": 2})).await;

    let response = post(&app, "/api/internal/geodata/list", json!({}), None).await;
    assert_eq!(response.status, StatusCode::OK);
    let list = response.body["geodata"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["comments"], 2);

    let response = post(
        &app,
        "/api/internal/geodata/list",
        json!({"q": "flood", "bbox": "POLYGON((8 48,9 48,9 49,8 49,8 48))"}),
        None,
    )
    .await;
    let list = response.body["geodata"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["comments"], 1);

    let response = post(
        &app,
        "/api/internal/geodata/list",
        json!({"bbox": "POLYGON((100 -10,110 -10,110 0,100 0,100 -10))"}),
        None,
    )
    .await;
    assert_eq!(response.body["geodata"], json!([]));

    let response = post(
        &app,
        "/api/internal/geodata/list",
        json!({"q": "hydrology"}),
        None,
    )
    .await;
    assert_eq!(response.body["geodata"], json!([]));

    let response = post(
        &app,
        "/api/internal/geodata/list",
        json!({"q": "hydrology", "metadata": true}),
        None,
    )
    .await;
    assert_eq!(response.body["geodata"].as_array().unwrap().len(), 1);

    let response = post(
        &app,
        "/api/internal/geodata/list",
        json!({"minrating": 4}),
        None,
    )
    .await;
    assert_eq!(response.body["geodata"], json!([]));
}

#[tokio::test]
async fn test_services() {
    let (app, _) = spawn_app().await;

    let response = get(&app, "/api/internal/geodata/services", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        json!({"services": [{"code": "wms", "name": "Stub Map Service"}]})
    );
}

#[tokio::test]
async fn test_comment_attributed_to_session_user() {
    let (app, _) = spawn_app().await;

    let response = post(
        &app,
        "/api/internal/user/register",
        json!({"name": "hydrologist", "password": "riverbanks"}),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let cookie = response.cookie.expect("session cookie");

    let response = post(
        &app,
        "/api/internal/geodata/add",
        json!({
            "url": RIVERS_URL,
            "datatype": "wms",
            "title": "Rivers of Europe",
            "text": "Checked against field data",
            "geometry": "POINT(10 50)",
            "start": "2014-05-01",
            "end": "2014-06-01"
        }),
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let id = response.body["geodata"]["id"].as_i64().unwrap();

    let response = post(
        &app,
        &format!("/api/internal/geodata/comments/{id}"),
        json!({"start": "2014-05-15"}),
        None,
    )
    .await;
    let comment = &response.body["geodata"]["comments"][0];
    assert_eq!(comment["user"]["name"], "hydrologist");
    assert_eq!(comment["geometry"], "POINT(10 50)");
    assert_eq!(
        comment["time"],
        json!({"start": "2014-05-01T00:00:00Z", "end": "2014-06-01T00:00:00Z"})
    );

    let response = post(
        &app,
        &format!("/api/internal/geodata/comments/{id}"),
        json!({"start": "2015-01-01"}),
        None,
    )
    .await;
    assert_eq!(response.body["geodata"]["commentCount"]["filtered"], 0);
}
