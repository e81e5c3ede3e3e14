//! Search filters shared by geodata listing, comment listing and saved searches.

use crate::domain::{CommentId, Envelope, Geometry, TimeRange};

use super::{Comment, Geodata};

/// Validated filter input with defaults already applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    /// Keyword query, empty when not searching by keyword.
    pub q: String,
    /// WKT polygon of the visible map area.
    pub bbox: Option<String>,
    /// Additional search radius around `bbox` in kilometres.
    pub radius: Option<i32>,
    pub time: TimeRange,
    pub min_rating: Option<i32>,
    /// Whether the keyword query also searches the geodata metadata.
    pub metadata: bool,
    pub comment: Option<CommentId>,
}

impl SearchFilter {
    /// Spatial window of the filter, widened by the radius.
    #[must_use]
    pub fn envelope(&self) -> Option<Envelope> {
        let envelope = Geometry::parse(self.bbox.as_deref()?).ok()?.envelope();
        Some(match self.radius {
            Some(km) if km > 0 => envelope.expand_km(f64::from(km)),
            _ => envelope,
        })
    }

    /// True if the keyword query is satisfied by the geodata metadata itself.
    #[must_use]
    pub fn metadata_hit(&self, geodata: &Geodata) -> bool {
        self.metadata && !self.q.is_empty() && geodata.metadata_contains(&self.q)
    }

    /// Whether a geodata set can only be listed if one of its comments matches.
    #[must_use]
    pub fn needs_matching_comment(&self, metadata_hit: bool) -> bool {
        (!self.q.is_empty() && !metadata_hit) || !self.time.is_unbounded() || self.comment.is_some()
    }

    fn keyword_time_id_match(&self, comment: &Comment, metadata_hit: bool) -> bool {
        if !self.q.is_empty()
            && !metadata_hit
            && !comment.text.to_lowercase().contains(&self.q.to_lowercase())
        {
            return false;
        }
        if let Some(id) = self.comment
            && comment.id != id
        {
            return false;
        }
        comment.time.matches(&self.time)
    }

    /// Comment-level predicates used when deciding whether a geodata set is listed.
    #[must_use]
    pub fn comment_qualifies_geodata(&self, comment: &Comment, metadata_hit: bool) -> bool {
        self.keyword_time_id_match(comment, metadata_hit)
    }

    /// Full comment predicate for the comments of one geodata set.
    ///
    /// Comments without a geometry are not restricted by the spatial window.
    #[must_use]
    pub fn matches_comment(
        &self,
        comment: &Comment,
        metadata_hit: bool,
        window: Option<&Envelope>,
    ) -> bool {
        if !self.keyword_time_id_match(comment, metadata_hit) {
            return false;
        }
        if let Some(min) = self.min_rating
            && !comment.rating.is_some_and(|r| r >= min)
        {
            return false;
        }
        match (window, comment.envelope.as_ref()) {
            (Some(window), Some(env)) => window.intersects(env),
            _ => true,
        }
    }

    /// Geodata-level predicates: spatial window and overall rating.
    #[must_use]
    pub fn matches_geodata(
        &self,
        geodata: &Geodata,
        rating_avg: f64,
        window: Option<&Envelope>,
    ) -> bool {
        if let Some(window) = window {
            match geodata.envelope() {
                Some(env) if window.intersects(&env) => {}
                _ => return false,
            }
        }
        match self.min_rating {
            Some(min) => rating_avg >= f64::from(min),
            None => true,
        }
    }
}

/// A stored search, addressable by its permalink token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedSearch {
    pub id: String,
    pub keywords: String,
    pub metadata: bool,
    pub min_rating: Option<i32>,
    pub time: TimeRange,
    pub bbox: Option<String>,
    pub radius: Option<i32>,
}

impl SavedSearch {
    #[must_use]
    pub fn from_filter(id: String, filter: &SearchFilter) -> Self {
        Self {
            id,
            keywords: filter.q.clone(),
            metadata: filter.metadata,
            min_rating: filter.min_rating,
            time: filter.time,
            bbox: filter.bbox.clone(),
            radius: filter.radius,
        }
    }
}
