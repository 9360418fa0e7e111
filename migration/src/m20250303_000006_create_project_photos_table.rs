use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProjectPhoto::ProjectPhotos)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProjectPhoto::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProjectPhoto::ProjectId).integer().not_null())
                    .col(ColumnDef::new(ProjectPhoto::Title).string_len(200).not_null())
                    .col(ColumnDef::new(ProjectPhoto::Description).text().not_null().default(""))
                    .col(ColumnDef::new(ProjectPhoto::Image).string().not_null().unique_key())
                    .col(ColumnDef::new(ProjectPhoto::Latitude).double())
                    .col(ColumnDef::new(ProjectPhoto::Longitude).double())
                    .col(ColumnDef::new(ProjectPhoto::Location).json())
                    .col(ColumnDef::new(ProjectPhoto::TakenAt).timestamp().not_null())
                    .col(ColumnDef::new(ProjectPhoto::UploadedBy).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_photo_project")
                            .from(ProjectPhoto::ProjectPhotos, ProjectPhoto::ProjectId)
                            .to(RoadProject::RoadProjects, RoadProject::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_photo_uploaded_by")
                            .from(ProjectPhoto::ProjectPhotos, ProjectPhoto::UploadedBy)
                            .to(User::Users, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProjectPhoto::ProjectPhotos).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProjectPhoto {
    ProjectPhotos,
    Id,
    ProjectId,
    Title,
    Description,
    Image,
    Latitude,
    Longitude,
    Location,
    TakenAt,
    UploadedBy,
}

#[derive(DeriveIden)]
enum RoadProject {
    RoadProjects,
    Id,
}

#[derive(DeriveIden)]
enum User {
    Users,
    Id,
}
