
use crate::domain::{CommentId, Envelope, GeodataId, LayerId, TimeRange, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentAuthor {
    pub id: UserId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: CommentId,
    pub geodata_id: GeodataId,
    pub layer_id: Option<LayerId>,
    pub user: Option<CommentAuthor>,
    pub text: String,
    pub rating: Option<i32>,
    pub geometry: Option<String>,
    pub envelope: Option<Envelope>,
    pub time: TimeRange,
}

/// A validated comment ready to be stored.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub geodata_id: GeodataId,
    pub layer_id: Option<LayerId>,
    pub user_id: Option<UserId>,
    pub text: String,
    pub rating: Option<i32>,
    pub geometry: Option<String>,
    pub time: TimeRange,
}
