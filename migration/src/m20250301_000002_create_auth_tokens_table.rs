use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AuthToken::AuthTokens)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuthToken::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuthToken::UserId).integer().not_null())
                    .col(ColumnDef::new(AuthToken::TokenHash).string().not_null().unique_key())
                    .col(ColumnDef::new(AuthToken::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_auth_token_user")
                            .from(AuthToken::AuthTokens, AuthToken::UserId)
                            .to(User::Users, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuthToken::AuthTokens).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AuthToken {
    AuthTokens,
    Id,
    UserId,
    TokenHash,
    CreatedAt,
}

#[derive(DeriveIden)]
enum User {
    Users,
    Id,
}
