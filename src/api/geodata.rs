//! Geodata endpoints under `/api/internal/geodata`.

use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::current_user_id;
use super::input::Input;
use super::validation::{Rule, Validator};
use super::{
    ApiError, AppState, GeodataDto, GeodataListResponse, GeodataResponse, PermalinkResponse,
    SavedSearchResponse, ServicesResponse,
};
use crate::domain::time::parse_iso8601;
use crate::domain::{CommentId, GeodataId, GeometryKind, TimeRange};
use crate::models::SearchFilter;
use crate::services::{AddComment, GeodataError};

const ADD_FIELDS: &[&str] = &[
    "url", "datatype", "layer", "text", "geometry", "start", "end", "rating", "title",
];

const FILTER_FIELDS: &[&str] = &[
    "q",
    "bbox",
    "radius",
    "start",
    "end",
    "minrating",
    "metadata",
    "comment",
];

/// Builds a search filter from request input.
///
/// Invalid optional fields are dropped and replaced by their defaults. A field
/// listed in `required` that is missing or invalid fails the whole filter.
pub fn filter_input(input: Input, required: &[&'static str]) -> Result<SearchFilter, ApiError> {
    let input = input.only(FILTER_FIELDS);
    let mut validator = Validator::new(&input)
        .rule("q", vec![])
        .rule("bbox", vec![Rule::Geometry(Some(GeometryKind::Polygon))])
        .rule("radius", vec![Rule::Integer, Rule::Between(1, 500)])
        .rule("start", vec![Rule::Date8601])
        .rule("end", vec![Rule::Date8601])
        .rule("minrating", vec![Rule::Integer, Rule::Between(1, 5)])
        .rule("metadata", vec![Rule::Boolean])
        .rule("comment", vec![Rule::Integer]);
    for &field in required {
        validator = validator.require(field);
    }

    let mut errors = validator.errors();
    errors.retain(|field, _| required.contains(&field.as_str()));
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let valid = validator.valid();
    let string = |field: &str| {
        valid
            .contains(field)
            .then(|| input.string(field))
            .flatten()
    };
    let int = |field: &str| {
        valid
            .contains(field)
            .then(|| input.integer(field))
            .flatten()
            .and_then(|v| i32::try_from(v).ok())
    };

    Ok(SearchFilter {
        q: string("q").unwrap_or_default(),
        bbox: string("bbox"),
        radius: int("radius"),
        time: TimeRange::new(
            string("start").as_deref().and_then(parse_iso8601),
            string("end").as_deref().and_then(parse_iso8601),
        ),
        min_rating: int("minrating"),
        metadata: valid.contains("metadata") && input.boolean("metadata").unwrap_or(false),
        comment: int("comment").filter(|id| *id != 0).map(CommentId::new),
    })
}

/// `POST /geodata/add`
///
/// Stores a comment and imports the geodata on first use.
pub async fn add(
    State(state): State<Arc<AppState>>,
    session: Session,
    input: Input,
) -> Result<Json<GeodataResponse>, ApiError> {
    let input = input.only(ADD_FIELDS);
    let service = state.geodata_service();
    let codes = service.service_codes();

    let datatype = input.string("datatype").filter(|d| codes.contains(d));
    let existing = match input.string("url") {
        Some(url) if Rule::Url.passes(&input, "url") => {
            service.find_by_url(&url, datatype.as_deref()).await?
        }
        _ => None,
    };
    let is_new = existing.is_none();

    let mut validator = Validator::new(&input)
        .rule("url", vec![Rule::Required, Rule::Url])
        .rule("datatype", vec![Rule::In(codes)])
        .rule("title", vec![Rule::Min(3), Rule::Max(200)])
        .rule(
            "text",
            vec![Rule::Required, Rule::Min(3), Rule::Max(100_000)],
        )
        .rule("geometry", vec![Rule::Geometry(None)])
        .rule("start", vec![Rule::Date8601])
        .rule("end", vec![Rule::Date8601])
        .rule("rating", vec![Rule::Integer, Rule::Between(1, 5)]);
    if is_new {
        validator = validator.require("datatype").require("title");
    }
    validator.validate()?;

    let request = AddComment {
        url: input.string("url").unwrap_or_default(),
        datatype,
        layer: input.string("layer"),
        title: input.string("title").filter(|_| is_new),
        text: input.string("text").unwrap_or_default(),
        geometry: input.string("geometry"),
        time: TimeRange::new(
            input.string("start").as_deref().and_then(parse_iso8601),
            input.string("end").as_deref().and_then(parse_iso8601),
        ),
        rating: input.integer("rating").and_then(|r| i32::try_from(r).ok()),
        user_id: current_user_id(&session).await,
    };

    let geodata = service.add_comment(request).await?;
    let base_url = state.base_url().await;

    Ok(Json(GeodataResponse {
        geodata: GeodataDto::new(geodata, &base_url),
    }))
}

/// `POST /geodata/metadata`
///
/// Returns stored geodata for known URLs, otherwise parses the remote service
/// without persisting anything.
pub async fn metadata(
    State(state): State<Arc<AppState>>,
    input: Input,
) -> Result<Json<GeodataResponse>, ApiError> {
    let input = input.only(&["url", "datatype"]);
    let service = state.geodata_service();

    Validator::new(&input)
        .rule("url", vec![Rule::Required, Rule::Url])
        .rule(
            "datatype",
            vec![Rule::Required, Rule::In(service.service_codes())],
        )
        .validate()?;

    let url = input.string("url").unwrap_or_default();
    let datatype = input.string("datatype").unwrap_or_default();

    let lookup = service
        .lookup_metadata(&url, &datatype)
        .await
        .map_err(|e| match e {
            GeodataError::ParseFailed(_) => {
                ApiError::field_error("url", "The URL format is invalid.")
            }
            other => other.into(),
        })?;

    let base_url = state.base_url().await;
    let mut geodata = GeodataDto::new(lookup.geodata, &base_url).with_layers(lookup.layers);
    geodata.is_new = Some(lookup.is_new);

    Ok(Json(GeodataResponse { geodata }))
}

/// `POST /geodata/keywords`
///
/// Keyword suggestions are not available; always answers 404.
pub async fn keywords(input: Input) -> ApiError {
    let input = input.only(&["q", "metadata"]);
    tracing::debug!(q = ?input.string("q"), "Keyword suggestions requested");
    ApiError::NotFound("Keyword suggestions".to_string())
}

/// `POST /geodata/search/save`
pub async fn search_save(
    State(state): State<Arc<AppState>>,
    input: Input,
) -> Result<Json<PermalinkResponse>, ApiError> {
    let filter = filter_input(input, &["bbox"])?;
    let search = state.geodata_service().save_search(&filter).await?;
    let base_url = state.base_url().await;

    Ok(Json(PermalinkResponse {
        permalink: format!("{base_url}/geodata/search/{}", search.id),
    }))
}

/// `GET /geodata/search/load/{id}`
pub async fn search_load(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SavedSearchResponse>, ApiError> {
    let search = state.geodata_service().load_search(&id).await?;
    Ok(Json(SavedSearchResponse {
        permalink: search.into(),
    }))
}

/// `POST /geodata/list`
pub async fn list(
    State(state): State<Arc<AppState>>,
    input: Input,
) -> Result<Json<GeodataListResponse>, ApiError> {
    let filter = filter_input(input, &[])?;
    let entries = state.geodata_service().list(&filter).await?;
    let base_url = state.base_url().await;

    Ok(Json(GeodataListResponse {
        geodata: entries
            .into_iter()
            .map(|entry| GeodataDto::listed(entry, &base_url))
            .collect(),
    }))
}

/// `POST /geodata/comments/{id}` and `POST /geodata/{id}/comments`
pub async fn comments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    input: Input,
) -> Result<Json<GeodataResponse>, ApiError> {
    let filter = filter_input(input, &[])?;
    let data = state
        .geodata_service()
        .comments(GeodataId::new(id), &filter)
        .await?;
    let base_url = state.base_url().await;

    Ok(Json(GeodataResponse {
        geodata: GeodataDto::with_comments(data, &base_url),
    }))
}

/// `GET /geodata/services`
pub async fn services(State(state): State<Arc<AppState>>) -> Json<ServicesResponse> {
    Json(ServicesResponse {
        services: state.geodata_service().services(),
    })
}
