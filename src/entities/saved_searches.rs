use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "saved_searches")]
pub struct Model {
    /// Generated permalink token
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub keywords: String,
    pub metadata: bool,
    pub rating: Option<i32>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub bbox: Option<String>,
    pub radius: Option<i32>,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
