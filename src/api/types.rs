use serde::Serialize;

use crate::domain::{CommentId, GeodataId, TimeRange, UserId};
use crate::models::{Comment, Geodata, Layer, SavedSearch};
use crate::services::{CommentCount, GeodataComments, GeodataListEntry, RatingSummary};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetadataDto {
    pub datatype: String,
    pub title: String,
    pub bbox: Option<String>,
    pub keywords: Vec<String>,
    pub language: Option<String>,
    pub copyright: Option<String>,
    pub author: Option<String>,
    pub time: TimeRange,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub license: Option<String>,
}

/// Either the matching comments themselves or just their number.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CommentsDto {
    Count(usize),
    List(Vec<CommentDto>),
}

#[derive(Debug, Serialize)]
pub struct CommentUserDto {
    pub id: UserId,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CommentDto {
    pub id: CommentId,
    pub permalink: String,
    pub text: String,
    pub rating: Option<i32>,
    pub geometry: Option<String>,
    pub time: TimeRange,
    pub user: Option<CommentUserDto>,
}

impl CommentDto {
    #[must_use]
    pub fn new(comment: Comment, base_url: &str) -> Self {
        Self {
            permalink: format!("{base_url}/comment/{}", comment.id),
            id: comment.id,
            text: comment.text,
            rating: comment.rating,
            geometry: comment.geometry,
            time: comment.time,
            user: comment.user.map(|u| CommentUserDto {
                id: u.id,
                name: u.name,
            }),
        }
    }

    #[must_use]
    pub fn list(comments: Vec<Comment>, base_url: &str) -> Vec<Self> {
        comments
            .into_iter()
            .map(|c| Self::new(c, base_url))
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct LayerDto {
    /// Layer name, which identifies the layer within its service.
    pub id: String,
    pub title: Option<String>,
    pub bbox: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<CommentsDto>,
}

impl From<Layer> for LayerDto {
    fn from(layer: Layer) -> Self {
        Self {
            id: layer.name,
            title: layer.title,
            bbox: layer.bbox,
            comments: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeodataDto {
    pub id: GeodataId,
    pub permalink: String,
    pub url: String,
    pub metadata: MetadataDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_avg: Option<RatingSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<CommentCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<CommentsDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<Vec<LayerDto>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_new: Option<bool>,
}

impl GeodataDto {
    #[must_use]
    pub fn new(geodata: Geodata, base_url: &str) -> Self {
        Self {
            permalink: format!("{base_url}/geodata/{}", geodata.id),
            id: geodata.id,
            url: geodata.url,
            metadata: MetadataDto {
                datatype: geodata.datatype,
                title: geodata.title,
                bbox: geodata.bbox,
                keywords: geodata.keywords,
                language: geodata.language,
                copyright: geodata.copyright,
                author: geodata.author,
                time: geodata.time,
                abstract_text: geodata.abstract_text,
                license: geodata.license,
            },
            rating_avg: None,
            comment_count: None,
            comments: None,
            layer: None,
            is_new: None,
        }
    }

    #[must_use]
    pub fn with_layers(mut self, layers: Vec<Layer>) -> Self {
        self.layer = Some(layers.into_iter().map(LayerDto::from).collect());
        self
    }

    #[must_use]
    pub fn listed(entry: GeodataListEntry, base_url: &str) -> Self {
        let mut dto = Self::new(entry.geodata, base_url);
        dto.comments = Some(CommentsDto::Count(entry.comments));
        dto
    }

    /// Geodata with aggregates and comments grouped onto its layers.
    #[must_use]
    pub fn with_comments(data: GeodataComments, base_url: &str) -> Self {
        let mut dto = Self::new(data.geodata, base_url);
        dto.rating_avg = Some(data.rating_avg);
        dto.comment_count = Some(data.comment_count);
        dto.comments = Some(CommentsDto::List(CommentDto::list(data.comments, base_url)));
        dto.layer = Some(
            data.layers
                .into_iter()
                .map(|group| LayerDto {
                    comments: Some(CommentsDto::List(CommentDto::list(
                        group.comments,
                        base_url,
                    ))),
                    ..LayerDto::from(group.layer)
                })
                .collect(),
        );
        dto
    }
}

#[derive(Debug, Serialize)]
pub struct GeodataResponse {
    pub geodata: GeodataDto,
}

#[derive(Debug, Serialize)]
pub struct GeodataListResponse {
    pub geodata: Vec<GeodataDto>,
}

#[derive(Debug, Serialize)]
pub struct PermalinkResponse {
    pub permalink: String,
}

#[derive(Debug, Serialize)]
pub struct SavedSearchDto {
    pub q: String,
    pub metadata: bool,
    pub bbox: Option<String>,
    pub radius: Option<i32>,
    pub time: TimeRange,
    pub minrating: Option<i32>,
}

impl From<SavedSearch> for SavedSearchDto {
    fn from(search: SavedSearch) -> Self {
        Self {
            q: search.keywords,
            metadata: search.metadata,
            bbox: search.bbox,
            radius: search.radius,
            time: search.time,
            minrating: search.min_rating,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SavedSearchResponse {
    pub permalink: SavedSearchDto,
}

#[derive(Debug, Serialize)]
pub struct ServicesResponse {
    pub services: Vec<crate::metadata::ServiceInfo>,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime: u64,
    pub database: bool,
    pub geodata: u64,
    pub comments: u64,
    pub services: Vec<String>,
}
