//! Domain service for geodata, comments and saved searches.

use thiserror::Error;

use crate::domain::{GeodataId, TimeRange, UserId};
use crate::metadata::ServiceInfo;
use crate::models::{Comment, Geodata, Layer, SavedSearch, SearchFilter};
use crate::services::comment_groups::{CommentCount, RatingSummary};

#[derive(Debug, Error)]
pub enum GeodataError {
    #[error("Geodata not found: {0}")]
    NotFound(GeodataId),

    #[error("Saved search not found: {0}")]
    SearchNotFound(String),

    #[error("Unknown service type: {0}")]
    UnknownService(String),

    #[error("Could not read metadata from {0}")]
    ParseFailed(String),

    #[error("Could not store {0}")]
    SaveFailed(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for GeodataError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for GeodataError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A validated comment submission.
#[derive(Debug, Clone)]
pub struct AddComment {
    pub url: String,
    /// Service code, only needed when the geodata is not stored yet.
    pub datatype: Option<String>,
    /// Layer name within the geodata set.
    pub layer: Option<String>,
    /// Overrides the parsed title of new geodata.
    pub title: Option<String>,
    pub text: String,
    pub geometry: Option<String>,
    pub time: TimeRange,
    pub rating: Option<i32>,
    pub user_id: Option<UserId>,
}

/// Result of a metadata lookup for the add-comment form.
#[derive(Debug, Clone)]
pub struct MetadataLookup {
    pub geodata: Geodata,
    pub layers: Vec<Layer>,
    /// Whether the geodata would be created by the first comment.
    pub is_new: bool,
}

#[derive(Debug, Clone)]
pub struct GeodataListEntry {
    pub geodata: Geodata,
    /// Number of comments that match the filter.
    pub comments: usize,
}

#[derive(Debug, Clone)]
pub struct LayerComments {
    pub layer: Layer,
    pub comments: Vec<Comment>,
}

/// One geodata set with its filtered comments grouped by layer.
#[derive(Debug, Clone)]
pub struct GeodataComments {
    pub geodata: Geodata,
    pub rating_avg: RatingSummary,
    pub comment_count: CommentCount,
    /// Comments not attached to any layer.
    pub comments: Vec<Comment>,
    pub layers: Vec<LayerComments>,
}

#[async_trait::async_trait]
pub trait GeodataService: Send + Sync {
    /// Codes of the registered metadata parsers.
    fn service_codes(&self) -> Vec<String>;

    fn services(&self) -> Vec<ServiceInfo>;

    /// Looks up stored geodata by the canonical form of `url`.
    ///
    /// The parser for `datatype` decides the canonical form; without a known
    /// datatype the generic OGC rules apply.
    async fn find_by_url(
        &self,
        url: &str,
        datatype: Option<&str>,
    ) -> Result<Option<Geodata>, GeodataError>;

    /// Stores a comment, importing the geodata first if it is new.
    ///
    /// # Errors
    ///
    /// - [`GeodataError::UnknownService`] if new geodata lack a valid datatype
    /// - [`GeodataError::ParseFailed`] if the remote metadata cannot be read
    /// - [`GeodataError::SaveFailed`] if the geodata or comment cannot be stored
    async fn add_comment(&self, request: AddComment) -> Result<Geodata, GeodataError>;

    /// Stored geodata for `url`, or freshly parsed metadata that is not saved.
    ///
    /// # Errors
    ///
    /// Returns [`GeodataError::ParseFailed`] if the URL is unknown and cannot be parsed.
    async fn lookup_metadata(
        &self,
        url: &str,
        datatype: &str,
    ) -> Result<MetadataLookup, GeodataError>;

    /// Imports geodata without a comment. Existing geodata are returned as is.
    async fn import(&self, url: &str, datatype: &str) -> Result<MetadataLookup, GeodataError>;

    /// Persists the filter and returns the new saved search.
    async fn save_search(&self, filter: &SearchFilter) -> Result<SavedSearch, GeodataError>;

    /// # Errors
    ///
    /// Returns [`GeodataError::SearchNotFound`] for unknown ids.
    async fn load_search(&self, id: &str) -> Result<SavedSearch, GeodataError>;

    /// Geodata matching the filter, each with its number of matching comments.
    async fn list(&self, filter: &SearchFilter) -> Result<Vec<GeodataListEntry>, GeodataError>;

    /// Filtered comments of one geodata set with rating and count aggregates.
    ///
    /// # Errors
    ///
    /// Returns [`GeodataError::NotFound`] if the geodata does not exist.
    async fn comments(
        &self,
        id: GeodataId,
        filter: &SearchFilter,
    ) -> Result<GeodataComments, GeodataError>;
}
