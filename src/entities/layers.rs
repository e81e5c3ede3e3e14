use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "layers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub geodata_id: i32,
    pub name: String,
    pub title: Option<String>,
    pub bbox: Option<String>,
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
    #[sea_orm(has_many = "super::comments::Entity")]
    Comments,
}

impl Related<super::geodata::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Geodata.def()
    }
}

impl Related<super::comments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
