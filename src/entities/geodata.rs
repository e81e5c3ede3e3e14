use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "geodata")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Canonical service URL, used to detect repeated imports.
    #[sea_orm(unique)]
    pub url: String,

    pub datatype: String,
    pub title: String,

    /// WKT polygon in EPSG:4326
    pub bbox: Option<String>,
    pub min_x: Option<f64>,
    pub min_y: Option<f64>,
    pub max_x: Option<f64>,
    pub max_y: Option<f64>,

    /// JSON encoded list of keywords
    pub keywords: String,
    pub language: Option<String>,
    pub copyright: Option<String>,
    pub author: Option<String>,
    #[sea_orm(column_name = "abstract", column_type = "Text", nullable)]
    pub abstract_text: Option<String>,
    pub license: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::layers::Entity")]
    Layers,
    #[sea_orm(has_many = "super::comments::Entity")]
    Comments,
}

impl Related<super::layers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Layers.def()
    }
}

impl Related<super::comments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
