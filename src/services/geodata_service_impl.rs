//! `SeaORM` implementation of the `GeodataService` trait.

use async_trait::async_trait;
use rand::Rng;
use rand::distr::Alphanumeric;
use std::collections::HashMap;
use tracing::{error, info, warn};

use crate::db::Store;
use crate::domain::GeodataId;
use crate::metadata::{MetadataRegistry, ServiceInfo, canonical_url};
use crate::models::{
    Comment, Geodata, Layer, NewComment, ParsedMetadata, SavedSearch, SearchFilter,
};
use crate::services::comment_groups::{UNASSIGNED, average_rating, group_by_layer, summarize};
use crate::services::geodata_service::{
    AddComment, GeodataComments, GeodataError, GeodataListEntry, GeodataService, LayerComments,
    MetadataLookup,
};

const SEARCH_ID_LENGTH: usize = 10;
const SEARCH_ID_ATTEMPTS: usize = 5;

/// Write failures are reported to clients as conflicts.
fn save_failed(what: &str, err: &anyhow::Error) -> GeodataError {
    error!(error = %err, "Failed to store {what}");
    GeodataError::SaveFailed(what.to_string())
}

pub struct SeaOrmGeodataService {
    store: Store,
    registry: MetadataRegistry,
}

impl SeaOrmGeodataService {
    #[must_use]
    pub const fn new(store: Store, registry: MetadataRegistry) -> Self {
        Self { store, registry }
    }

    fn service_url(&self, url: &str, datatype: Option<&str>) -> String {
        datatype
            .and_then(|code| self.registry.get_service(code))
            .map_or_else(|| canonical_url(url), |parser| parser.service_url(url))
    }

    async fn parse(&self, url: &str, datatype: &str) -> Result<ParsedMetadata, GeodataError> {
        if self.registry.get_service(datatype).is_none() {
            return Err(GeodataError::UnknownService(datatype.to_string()));
        }
        self.registry
            .parse_metadata(url, datatype)
            .await
            .ok_or_else(|| GeodataError::ParseFailed(url.to_string()))
    }

    /// Returns stored geodata and layers, importing them if needed.
    async fn find_or_import(
        &self,
        url: &str,
        datatype: Option<&str>,
        title: Option<&str>,
    ) -> Result<(Geodata, Vec<Layer>, bool), GeodataError> {
        if let Some(existing) = self.find_by_url(url, datatype).await? {
            let layers = self.store.get_layers(existing.id).await?;
            return Ok((existing, layers, false));
        }

        let datatype = datatype.ok_or_else(|| GeodataError::UnknownService(String::new()))?;
        let mut parsed = self.parse(url, datatype).await?;
        if let Some(title) = title {
            parsed.geodata.title = title.to_string();
        }

        match self.store.insert_geodata(&parsed).await {
            Ok((geodata, layers)) => {
                metrics::counter!("geodata_imported_total", "datatype" => datatype.to_string())
                    .increment(1);
                Ok((geodata, layers, true))
            }
            Err(e) => {
                // Another request may have imported the same service meanwhile.
                warn!(
                    url = %parsed.geodata.url,
                    error = %e,
                    "Geodata insert failed, retrying lookup"
                );
                let Some(geodata) = self.store.find_geodata_by_url(&parsed.geodata.url).await?
                else {
                    return Err(save_failed("geodata", &e));
                };
                let layers = self.store.get_layers(geodata.id).await?;
                Ok((geodata, layers, false))
            }
        }
    }

    async fn try_save_search(&self, filter: &SearchFilter) -> anyhow::Result<Option<SavedSearch>> {
        for _ in 0..SEARCH_ID_ATTEMPTS {
            let id = Self::generate_search_id();
            if self.store.saved_search_exists(&id).await? {
                continue;
            }

            let search = SavedSearch::from_filter(id, filter);
            self.store.insert_saved_search(&search).await?;
            return Ok(Some(search));
        }
        Ok(None)
    }

    fn generate_search_id() -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(SEARCH_ID_LENGTH)
            .map(char::from)
            .collect()
    }
}

#[async_trait]
impl GeodataService for SeaOrmGeodataService {
    fn service_codes(&self) -> Vec<String> {
        self.registry.service_codes()
    }

    fn services(&self) -> Vec<ServiceInfo> {
        self.registry.services()
    }

    async fn find_by_url(
        &self,
        url: &str,
        datatype: Option<&str>,
    ) -> Result<Option<Geodata>, GeodataError> {
        let canonical = self.service_url(url, datatype);
        Ok(self.store.find_geodata_by_url(&canonical).await?)
    }

    async fn add_comment(&self, request: AddComment) -> Result<Geodata, GeodataError> {
        let (geodata, layers, _) = self
            .find_or_import(
                &request.url,
                request.datatype.as_deref(),
                request.title.as_deref(),
            )
            .await?;

        let layer_id = request.layer.as_deref().and_then(|name| {
            layers
                .iter()
                .find(|layer| layer.name == name)
                .map(|layer| layer.id)
        });

        let comment = self
            .store
            .add_comment(&NewComment {
                geodata_id: geodata.id,
                layer_id,
                user_id: request.user_id,
                text: request.text,
                rating: request.rating,
                geometry: request.geometry,
                time: request.time,
            })
            .await
            .map_err(|e| save_failed("comment", &e))?;

        metrics::counter!("comments_created_total").increment(1);
        info!(
            comment_id = %comment.id,
            geodata_id = %geodata.id,
            layer = ?layer_id,
            "Comment added"
        );

        Ok(geodata)
    }

    async fn lookup_metadata(
        &self,
        url: &str,
        datatype: &str,
    ) -> Result<MetadataLookup, GeodataError> {
        if let Some(geodata) = self.find_by_url(url, Some(datatype)).await? {
            let layers = self.store.get_layers(geodata.id).await?;
            return Ok(MetadataLookup {
                geodata,
                layers,
                is_new: false,
            });
        }

        let parsed = self.parse(url, datatype).await?;
        Ok(MetadataLookup {
            geodata: parsed.geodata,
            layers: parsed.layers,
            is_new: true,
        })
    }

    async fn import(&self, url: &str, datatype: &str) -> Result<MetadataLookup, GeodataError> {
        let (geodata, layers, is_new) = self.find_or_import(url, Some(datatype), None).await?;
        Ok(MetadataLookup {
            geodata,
            layers,
            is_new,
        })
    }

    async fn save_search(&self, filter: &SearchFilter) -> Result<SavedSearch, GeodataError> {
        match self.try_save_search(filter).await {
            Ok(Some(search)) => {
                info!(id = %search.id, "Saved search");
                Ok(search)
            }
            Ok(None) => Err(GeodataError::Internal(
                "Could not generate a unique search id".to_string(),
            )),
            Err(e) => Err(save_failed("search", &e)),
        }
    }

    async fn load_search(&self, id: &str) -> Result<SavedSearch, GeodataError> {
        self.store
            .get_saved_search(id)
            .await?
            .ok_or_else(|| GeodataError::SearchNotFound(id.to_string()))
    }

    async fn list(&self, filter: &SearchFilter) -> Result<Vec<GeodataListEntry>, GeodataError> {
        let window = filter.envelope();
        let candidates = match &window {
            Some(window) => self.store.list_geodata_intersecting(window).await?,
            None => self.store.list_geodata().await?,
        };

        let ids: Vec<GeodataId> = candidates.iter().map(|g| g.id).collect();
        let mut by_geodata: HashMap<GeodataId, Vec<Comment>> = HashMap::new();
        for comment in self.store.get_comments_for_geodata_ids(&ids).await? {
            by_geodata
                .entry(comment.geodata_id)
                .or_default()
                .push(comment);
        }

        let mut entries = Vec::new();
        for geodata in candidates {
            let comments = by_geodata.remove(&geodata.id).unwrap_or_default();
            let metadata_hit = filter.metadata_hit(&geodata);

            if !filter.matches_geodata(&geodata, average_rating(&comments), window.as_ref()) {
                continue;
            }
            if filter.needs_matching_comment(metadata_hit)
                && !comments
                    .iter()
                    .any(|c| filter.comment_qualifies_geodata(c, metadata_hit))
            {
                continue;
            }

            let matching = comments
                .iter()
                .filter(|c| filter.matches_comment(c, metadata_hit, window.as_ref()))
                .count();
            entries.push(GeodataListEntry {
                geodata,
                comments: matching,
            });
        }

        Ok(entries)
    }

    async fn comments(
        &self,
        id: GeodataId,
        filter: &SearchFilter,
    ) -> Result<GeodataComments, GeodataError> {
        let geodata = self
            .store
            .get_geodata(id)
            .await?
            .ok_or(GeodataError::NotFound(id))?;
        let layers = self.store.get_layers(id).await?;
        let all = self.store.get_comments(id).await?;

        let window = filter.envelope();
        let metadata_hit = filter.metadata_hit(&geodata);
        let filtered: Vec<Comment> = all
            .iter()
            .filter(|c| filter.matches_comment(c, metadata_hit, window.as_ref()))
            .cloned()
            .collect();

        let (rating_avg, comment_count) = summarize(&all, &filtered);
        let mut groups = group_by_layer(filtered);

        let layers = layers
            .into_iter()
            .map(|layer| LayerComments {
                comments: groups.remove(&layer.id.value()).unwrap_or_default(),
                layer,
            })
            .collect();

        // Anything left over has no layer in this set and counts as unassigned.
        let mut unassigned = groups.remove(&UNASSIGNED).unwrap_or_default();
        unassigned.extend(groups.into_values().flatten());

        Ok(GeodataComments {
            geodata,
            rating_avg,
            comment_count,
            comments: unassigned,
            layers,
        })
    }
}
