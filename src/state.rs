use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::Config;
use crate::geo::GeoStrategy;
use crate::middleware::auth::AuthUser;
use crate::services::media::MediaStore;

/// Shared by every handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub geo: Arc<dyn GeoStrategy>,
    pub config: Arc<Config>,
    pub media: MediaStore,
    /// Acting user for unauthenticated project writes, resolved at startup.
    /// `None` when anonymous writes are disabled.
    pub anonymous_actor: Option<AuthUser>,
}

impl AppState {
    /// Builds the shared state, creating the anonymous actor if the
    /// configuration allows unauthenticated project writes.
    pub async fn new(db: DatabaseConnection, config: Config) -> crate::AppResult<Self> {
        let anonymous_actor = if config.allow_anonymous_write {
            let user = crate::services::accounts::ensure_user(&db, &config.anonymous_username).await?;
            tracing::info!(username = %user.username, "anonymous project writes enabled");
            Some(AuthUser::from(&user))
        } else {
            None
        };

        Ok(Self {
            db,
            geo: crate::geo::strategy_for(config.geo_mode),
            media: MediaStore::new(config.media_root.clone()),
            config: Arc::new(config),
            anonymous_actor,
        })
    }
}
