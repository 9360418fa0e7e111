use anyhow::Context;
use sea_orm::{ConnectionTrait, Database};

/// Children first so the statements also work without CASCADE support.
const TABLES: [&str; 8] = [
    "project_updates",
    "project_photos",
    "road_segments",
    "project_assignments",
    "road_projects",
    "auth_tokens",
    "users",
    "seaql_migrations",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter("info").init();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let db = Database::connect(&database_url)
        .await
        .context("failed to connect to database")?;

    let cascade = match db.get_database_backend() {
        sea_orm::DbBackend::Postgres => " CASCADE",
        _ => "",
    };

    for table in TABLES {
        db.execute_unprepared(&format!("DROP TABLE IF EXISTS \"{table}\"{cascade};"))
            .await
            .with_context(|| format!("failed to drop {table}"))?;
        tracing::info!(table, "dropped");
    }

    tracing::info!("database reset successfully; uploaded files under MEDIA_ROOT are left in place");
    Ok(())
}
