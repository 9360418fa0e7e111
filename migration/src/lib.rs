pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_users_table;
mod m20250301_000002_create_auth_tokens_table;
mod m20250302_000003_create_road_projects_table;
mod m20250302_000004_create_project_assignments_table;
mod m20250303_000005_create_road_segments_table;
mod m20250303_000006_create_project_photos_table;
mod m20250303_000007_create_project_updates_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_users_table::Migration),
            Box::new(m20250301_000002_create_auth_tokens_table::Migration),
            Box::new(m20250302_000003_create_road_projects_table::Migration),
            Box::new(m20250302_000004_create_project_assignments_table::Migration),
            Box::new(m20250303_000005_create_road_segments_table::Migration),
            Box::new(m20250303_000006_create_project_photos_table::Migration),
            Box::new(m20250303_000007_create_project_updates_table::Migration),
        ]
    }
}
