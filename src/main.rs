use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use tracing_subscriber::EnvFilter;

use road_projects::{
    config::Config,
    routes::create_routes,
    services::accounts::{self, NewUser},
    AppState,
};

#[derive(Parser)]
#[command(name = "road-projects", version, about = "Road construction project records API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run migrations and start the HTTP server (default)
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// Create a login account; the password is read from the terminal
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
        /// Grant staff and superuser flags
        #[arg(long)]
        superuser: bool,
    },
}

async fn connect(config: &Config) -> anyhow::Result<DatabaseConnection> {
    let db = Database::connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    Migrator::up(&db, None).await.context("failed to run migrations")?;
    Ok(db)
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let db = connect(&config).await?;

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(db, config)
        .await
        .context("failed to initialise application state")?;
    state
        .geo
        .prepare(&state.db)
        .await
        .with_context(|| format!("failed to prepare {} geo mode", state.geo.mode()))?;
    let app = create_routes(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn create_user(config: Config, new_user: NewUser) -> anyhow::Result<()> {
    let db = connect(&config).await?;

    let password = rpassword::prompt_password("Password: ")?;
    let confirm = rpassword::prompt_password("Password (again): ")?;
    if password != confirm {
        bail!("passwords do not match");
    }
    if password.is_empty() {
        bail!("password must not be empty");
    }

    let user = accounts::create_user(&db, NewUser { password, ..new_user })
        .await
        .context("failed to create user")?;
    tracing::info!(user_id = user.id, username = %user.username, "user created");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("road_projects=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Migrate => {
            connect(&config).await?;
            tracing::info!("migrations applied");
            Ok(())
        }
        Command::CreateUser {
            username,
            email,
            first_name,
            last_name,
            superuser,
        } => {
            create_user(
                config,
                NewUser {
                    username,
                    email,
                    first_name,
                    last_name,
                    is_staff: superuser,
                    is_superuser: superuser,
                    ..Default::default()
                },
            )
            .await
        }
    }
}
