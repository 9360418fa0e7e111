use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProjectAssignment::ProjectAssignments)
                    .if_not_exists()
                    .col(ColumnDef::new(ProjectAssignment::ProjectId).integer().not_null())
                    .col(ColumnDef::new(ProjectAssignment::UserId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(ProjectAssignment::ProjectId)
                            .col(ProjectAssignment::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_assignment_project")
                            .from(ProjectAssignment::ProjectAssignments, ProjectAssignment::ProjectId)
                            .to(RoadProject::RoadProjects, RoadProject::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_assignment_user")
                            .from(ProjectAssignment::ProjectAssignments, ProjectAssignment::UserId)
                            .to(User::Users, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(ProjectAssignment::ProjectAssignments)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum ProjectAssignment {
    ProjectAssignments,
    ProjectId,
    UserId,
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
