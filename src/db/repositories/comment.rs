use crate::domain::{CommentId, Envelope, GeodataId, Geometry, LayerId, TimeRange, UserId, time};
use crate::entities::{comments, prelude::*, users};
use crate::models::{Comment, CommentAuthor, NewComment};
use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

pub struct CommentRepository {
    conn: DatabaseConnection,
}

impl CommentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(model: comments::Model, user: Option<users::Model>) -> Comment {
        let envelope = match (model.min_x, model.min_y, model.max_x, model.max_y) {
            (Some(min_x), Some(min_y), Some(max_x), Some(max_y)) => {
                Some(Envelope::new(min_x, min_y, max_x, max_y))
            }
            _ => None,
        };

        Comment {
            id: CommentId::new(model.id),
            geodata_id: GeodataId::new(model.geodata_id),
            layer_id: model.layer_id.map(LayerId::new),
            user: user.map(|u| CommentAuthor {
                id: UserId::new(u.id),
                name: u.name,
            }),
            text: model.text,
            rating: model.rating,
            geometry: model.geom,
            envelope,
            time: TimeRange::from_stored(model.start_time.as_deref(), model.end_time.as_deref()),
        }
    }

    pub async fn insert(&self, comment: &NewComment) -> Result<Comment> {
        let envelope = comment
            .geometry
            .as_deref()
            .and_then(|wkt| Geometry::parse(wkt).ok())
            .map(|g| g.envelope());

        let model = comments::ActiveModel {
            geodata_id: Set(comment.geodata_id.value()),
            layer_id: Set(comment.layer_id.map(|id| id.value())),
            user_id: Set(comment.user_id.map(|id| id.value())),
            text: Set(comment.text.clone()),
            rating: Set(comment.rating),
            geom: Set(comment.geometry.clone()),
            min_x: Set(envelope.map(|e| e.min_x)),
            min_y: Set(envelope.map(|e| e.min_y)),
            max_x: Set(envelope.map(|e| e.max_x)),
            max_y: Set(envelope.map(|e| e.max_y)),
            start_time: Set(comment.time.start.as_ref().map(time::format_iso8601)),
            end_time: Set(comment.time.end.as_ref().map(time::format_iso8601)),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert comment")?;

        let user = match model.user_id {
            Some(id) => Users::find_by_id(id).one(&self.conn).await?,
            None => None,
        };

        Ok(Self::map_model(model, user))
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(Comments::find().count(&self.conn).await?)
    }

    /// All comments of one geodata set in creation order, with their authors.
    pub async fn list_for_geodata(&self, geodata_id: GeodataId) -> Result<Vec<Comment>> {
        let rows = Comments::find()
            .filter(comments::Column::GeodataId.eq(geodata_id.value()))
            .order_by_asc(comments::Column::Id)
            .find_also_related(users::Entity)
            .all(&self.conn)
            .await
            .context("Failed to query comments")?;

        Ok(rows
            .into_iter()
            .map(|(comment, user)| Self::map_model(comment, user))
            .collect())
    }

    pub async fn list_for_geodata_ids(&self, ids: &[GeodataId]) -> Result<Vec<Comment>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = Comments::find()
            .filter(comments::Column::GeodataId.is_in(ids.iter().map(GeodataId::value)))
            .order_by_asc(comments::Column::Id)
            .find_also_related(users::Entity)
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(comment, user)| Self::map_model(comment, user))
            .collect())
    }
}
