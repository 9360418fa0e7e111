use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProjectUpdate::ProjectUpdates)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProjectUpdate::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProjectUpdate::ProjectId).integer().not_null())
                    .col(ColumnDef::new(ProjectUpdate::Title).string_len(200).not_null())
                    .col(ColumnDef::new(ProjectUpdate::Content).text().not_null())
                    .col(ColumnDef::new(ProjectUpdate::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(ProjectUpdate::CreatedBy).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_update_project")
                            .from(ProjectUpdate::ProjectUpdates, ProjectUpdate::ProjectId)
                            .to(RoadProject::RoadProjects, RoadProject::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_update_created_by")
                            .from(ProjectUpdate::ProjectUpdates, ProjectUpdate::CreatedBy)
                            .to(User::Users, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProjectUpdate::ProjectUpdates).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProjectUpdate {
    ProjectUpdates,
    Id,
    ProjectId,
    Title,
    Content,
    CreatedAt,
    CreatedBy,
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
