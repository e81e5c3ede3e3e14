use crate::domain::{Envelope, GeodataId, LayerId, TimeRange, time::format_iso8601};
use crate::entities::{geodata, layers};
use crate::models::{Geodata, Layer, ParsedMetadata};
use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::info;

pub struct GeodataRepository {
    conn: DatabaseConnection,
}

impl GeodataRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(model: geodata::Model) -> Geodata {
        Geodata {
            id: GeodataId::new(model.id),
            url: model.url,
            datatype: model.datatype,
            title: model.title,
            bbox: model.bbox,
            keywords: serde_json::from_str(&model.keywords).unwrap_or_default(),
            language: model.language,
            copyright: model.copyright,
            author: model.author,
            abstract_text: model.abstract_text,
            license: model.license,
            time: TimeRange::from_stored(model.start_time.as_deref(), model.end_time.as_deref()),
        }
    }

    fn map_layer(model: layers::Model) -> Layer {
        Layer {
            id: LayerId::new(model.id),
            name: model.name,
            title: model.title,
            bbox: model.bbox,
        }
    }

    pub async fn get(&self, id: GeodataId) -> Result<Option<Geodata>> {
        let model = geodata::Entity::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query geodata by ID")?;

        Ok(model.map(Self::map_model))
    }

    pub async fn find_by_url(&self, url: &str) -> Result<Option<Geodata>> {
        let model = geodata::Entity::find()
            .filter(geodata::Column::Url.eq(url))
            .one(&self.conn)
            .await
            .context("Failed to query geodata by URL")?;

        Ok(model.map(Self::map_model))
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(geodata::Entity::find().count(&self.conn).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<Geodata>> {
        let rows = geodata::Entity::find()
            .order_by_asc(geodata::Column::Title)
            .order_by_asc(geodata::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    /// Candidates whose stored envelope intersects `window`.
    pub async fn list_intersecting(&self, window: &Envelope) -> Result<Vec<Geodata>> {
        let rows = geodata::Entity::find()
            .filter(geodata::Column::MinX.lte(window.max_x))
            .filter(geodata::Column::MaxX.gte(window.min_x))
            .filter(geodata::Column::MinY.lte(window.max_y))
            .filter(geodata::Column::MaxY.gte(window.min_y))
            .order_by_asc(geodata::Column::Title)
            .order_by_asc(geodata::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    /// Layers of one geodata set, ordered by title then id.
    pub async fn layers(&self, id: GeodataId) -> Result<Vec<Layer>> {
        let rows = layers::Entity::find()
            .filter(layers::Column::GeodataId.eq(id.value()))
            .order_by_asc(layers::Column::Title)
            .order_by_asc(layers::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_layer).collect())
    }

    /// Stores parsed metadata with its layers in one transaction.
    pub async fn insert(&self, parsed: &ParsedMetadata) -> Result<(Geodata, Vec<Layer>)> {
        let g = &parsed.geodata;
        let envelope = g.envelope();
        let txn = self.conn.begin().await?;

        let model = geodata::ActiveModel {
            url: Set(g.url.clone()),
            datatype: Set(g.datatype.clone()),
            title: Set(g.title.clone()),
            bbox: Set(g.bbox.clone()),
            min_x: Set(envelope.map(|e| e.min_x)),
            min_y: Set(envelope.map(|e| e.min_y)),
            max_x: Set(envelope.map(|e| e.max_x)),
            max_y: Set(envelope.map(|e| e.max_y)),
            keywords: Set(serde_json::to_string(&g.keywords)?),
            language: Set(g.language.clone()),
            copyright: Set(g.copyright.clone()),
            author: Set(g.author.clone()),
            abstract_text: Set(g.abstract_text.clone()),
            license: Set(g.license.clone()),
            start_time: Set(g.time.start.as_ref().map(format_iso8601)),
            end_time: Set(g.time.end.as_ref().map(format_iso8601)),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert geodata")?;

        let mut stored_layers = Vec::with_capacity(parsed.layers.len());
        for layer in &parsed.layers {
            let row = layers::ActiveModel {
                geodata_id: Set(model.id),
                name: Set(layer.name.clone()),
                title: Set(layer.title.clone()),
                bbox: Set(layer.bbox.clone()),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .context("Failed to insert layer")?;
            stored_layers.push(Self::map_layer(row));
        }

        txn.commit().await?;

        info!(
            "Stored geodata {} ({}) with {} layers",
            model.id,
            model.url,
            stored_layers.len()
        );

        Ok((Self::map_model(model), stored_layers))
    }
}
