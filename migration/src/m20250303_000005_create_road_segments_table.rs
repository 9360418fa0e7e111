use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RoadSegment::RoadSegments)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RoadSegment::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RoadSegment::ProjectId).integer().not_null())
                    .col(ColumnDef::new(RoadSegment::Name).string_len(200).not_null())
                    .col(ColumnDef::new(RoadSegment::RoadType).string_len(20).not_null())
                    .col(ColumnDef::new(RoadSegment::SurfaceType).string_len(20).not_null())
                    .col(ColumnDef::new(RoadSegment::LengthKm).double().not_null())
                    .col(ColumnDef::new(RoadSegment::WidthM).double().not_null())
                    // Simple-mode path; the geo strategy requires all four in that mode
                    .col(ColumnDef::new(RoadSegment::StartLatitude).double())
                    .col(ColumnDef::new(RoadSegment::StartLongitude).double())
                    .col(ColumnDef::new(RoadSegment::EndLatitude).double())
                    .col(ColumnDef::new(RoadSegment::EndLongitude).double())
                    // Spatial-mode path, stored as GeoJSON
                    .col(ColumnDef::new(RoadSegment::Centerline).json())
                    .col(ColumnDef::new(RoadSegment::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(RoadSegment::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_road_segment_project")
                            .from(RoadSegment::RoadSegments, RoadSegment::ProjectId)
                            .to(RoadProject::RoadProjects, RoadProject::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RoadSegment::RoadSegments).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum RoadSegment {
    RoadSegments,
    Id,
    ProjectId,
    Name,
    RoadType,
    SurfaceType,
    LengthKm,
    WidthM,
    StartLatitude,
    StartLongitude,
    EndLatitude,
    EndLongitude,
    Centerline,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum RoadProject {
    RoadProjects,
    Id,
}
