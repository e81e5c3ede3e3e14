use crate::domain::{TimeRange, time::format_iso8601};
use crate::entities::{prelude::*, saved_searches};
use crate::models::SavedSearch;
use anyhow::Result;
use sea_orm::{DatabaseConnection, EntityTrait, Set};

pub struct SavedSearchRepository {
    conn: DatabaseConnection,
}

impl SavedSearchRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn exists(&self, id: &str) -> Result<bool> {
        Ok(SavedSearches::find_by_id(id.to_string())
            .one(&self.conn)
            .await?
            .is_some())
    }

    pub async fn get(&self, id: &str) -> Result<Option<SavedSearch>> {
        let model = SavedSearches::find_by_id(id.to_string())
            .one(&self.conn)
            .await?;

        Ok(model.map(|m| SavedSearch {
            id: m.id,
            keywords: m.keywords,
            metadata: m.metadata,
            min_rating: m.rating,
            time: TimeRange::from_stored(m.start_time.as_deref(), m.end_time.as_deref()),
            bbox: m.bbox,
            radius: m.radius,
        }))
    }

    pub async fn insert(&self, search: &SavedSearch) -> Result<()> {
        let active_model = saved_searches::ActiveModel {
            id: Set(search.id.clone()),
            keywords: Set(search.keywords.clone()),
            metadata: Set(search.metadata),
            rating: Set(search.min_rating),
            start_time: Set(search.time.start.as_ref().map(format_iso8601)),
            end_time: Set(search.time.end.as_ref().map(format_iso8601)),
            bbox: Set(search.bbox.clone()),
            radius: Set(search.radius),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
        };

        SavedSearches::insert(active_model)
            .exec_without_returning(&self.conn)
            .await?;
        Ok(())
    }
}
