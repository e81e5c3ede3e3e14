use sea_orm_migration::prelude::*;

mod m20150101_initial;
mod m20150301_saved_searches;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20150101_initial::Migration),
            Box::new(m20150301_saved_searches::Migration),
        ]
    }
}
