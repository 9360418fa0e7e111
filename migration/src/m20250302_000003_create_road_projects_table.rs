use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RoadProject::RoadProjects)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RoadProject::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RoadProject::Name).string_len(200).not_null())
                    .col(ColumnDef::new(RoadProject::Description).text().not_null().default(""))
                    .col(
                        ColumnDef::new(RoadProject::Status)
                            .string_len(20)
                            .not_null()
                            .default("planned"),
                    )
                    .col(
                        ColumnDef::new(RoadProject::Priority)
                            .string_len(20)
                            .not_null()
                            .default("medium"),
                    )
                    .col(ColumnDef::new(RoadProject::Budget).decimal_len(12, 2))
                    .col(ColumnDef::new(RoadProject::StartDate).date())
                    .col(ColumnDef::new(RoadProject::EndDate).date())
                    // Simple-mode location
                    .col(ColumnDef::new(RoadProject::Latitude).double())
                    .col(ColumnDef::new(RoadProject::Longitude).double())
                    // Spatial-mode location, stored as GeoJSON
                    .col(ColumnDef::new(RoadProject::ProjectArea).json())
                    .col(ColumnDef::new(RoadProject::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(RoadProject::UpdatedAt).timestamp().not_null())
                    .col(ColumnDef::new(RoadProject::CreatedBy).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_road_project_created_by")
                            .from(RoadProject::RoadProjects, RoadProject::CreatedBy)
                            .to(User::Users, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_road_projects_lat_lng")
                    .table(RoadProject::RoadProjects)
                    .col(RoadProject::Latitude)
                    .col(RoadProject::Longitude)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RoadProject::RoadProjects).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum RoadProject {
    RoadProjects,
    Id,
    Name,
    Description,
    Status,
    Priority,
    Budget,
    StartDate,
    EndDate,
    Latitude,
    Longitude,
    ProjectArea,
    CreatedAt,
    UpdatedAt,
    CreatedBy,
}

#[derive(DeriveIden)]
enum User {
    Users,
    Id,
}
