use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "comments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub geodata_id: i32,
    pub layer_id: Option<i32>,
    pub user_id: Option<i32>,
    #[sea_orm(column_type = "Text")]
    pub text: String,
    pub rating: Option<i32>,

    /// WKT geometry in EPSG:4326
    pub geom: Option<String>,
    pub min_x: Option<f64>,
    pub min_y: Option<f64>,
    pub max_x: Option<f64>,
    pub max_y: Option<f64>,

    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::geodata::Entity",
        from = "Column::GeodataId",
        to = "super::geodata::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Geodata,
    #[sea_orm(
        belongs_to = "super::layers::Entity",
        from = "Column::LayerId",
        to = "super::layers::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Layers,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Users,
}

impl Related<super::geodata::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Geodata.def()
    }
}

impl Related<super::layers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Layers.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
