mod auth;
mod home;
mod photos;
mod projects;
mod segments;
mod updates;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::auth::{require_auth, resolve_actor};
use crate::state::AppState;

/// Upper bound for a photo upload request.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        home::root,
        auth::login,
        auth::logout,
        auth::user_profile,
        projects::list_projects,
        projects::nearby_projects,
        projects::create_project,
        projects::get_project,
        projects::update_project,
        projects::patch_project,
        projects::delete_project,
        projects::project_segments,
        projects::project_photos,
        projects::project_updates,
        segments::list_segments,
        segments::create_segment,
        segments::get_segment,
        segments::update_segment,
        segments::patch_segment,
        segments::delete_segment,
        photos::list_photos,
        photos::create_photo,
        photos::get_photo,
        photos::update_photo,
        photos::patch_photo,
        photos::delete_photo,
        updates::list_updates,
        updates::create_update,
        updates::get_update,
        updates::replace_update,
        updates::patch_update,
        updates::delete_update,
    ),
    components(
        schemas(
            auth::LoginRequest,
            auth::LoginResponse,
            auth::LogoutResponse,
            auth::ErrorResponse,
            auth::UserProfile,
            crate::models::project::ProjectCreate,
            crate::models::project::ProjectPatch,
            crate::models::segment::SegmentCreate,
            crate::models::segment::SegmentPatch,
            crate::models::photo::PhotoUploadForm,
            crate::models::photo::PhotoUpdate,
            crate::models::photo::PhotoPatch,
            crate::models::update::UpdateCreate,
            crate::models::update::UpdatePatch,
            crate::entities::road_project::ProjectStatus,
            crate::entities::road_project::Priority,
            crate::entities::road_segment::RoadType,
            crate::entities::road_segment::SurfaceType,
            crate::pagination::PageInfo,
        )
    ),
    tags(
        (name = "General", description = "Landing page"),
        (name = "Authentication", description = "Token login, logout and profile"),
        (name = "Projects", description = "Road projects and the nearby search"),
        (name = "Segments", description = "Road segments of a project"),
        (name = "Photos", description = "Site photos with optional location"),
        (name = "Updates", description = "Project status updates")
    ),
    info(
        title = "Road Projects API",
        version = "0.1.0",
        description = "Record management for road-construction projects with simple or PostGIS-backed location search",
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "token_auth",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "Authorization",
                    "`Token <key>` or `Bearer <key>` as returned by /auth/login/",
                ))),
            );
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring unparsable CORS origin");
                None
            }
        }))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn create_routes(state: AppState) -> Router {
    let swagger_router: Router = SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into();

    // Open to the anonymous actor when the configuration allows it
    let project_routes = Router::new()
        .route(
            "/projects/",
            get(projects::list_projects).post(projects::create_project),
        )
        .route("/projects/nearby/", get(projects::nearby_projects))
        .route(
            "/projects/{id}/",
            get(projects::get_project)
                .put(projects::update_project)
                .patch(projects::patch_project)
                .delete(projects::delete_project),
        )
        .route("/projects/{id}/segments/", get(projects::project_segments))
        .route("/projects/{id}/photos/", get(projects::project_photos))
        .route("/projects/{id}/updates/", get(projects::project_updates))
        .layer(middleware::from_fn_with_state(state.clone(), resolve_actor));

    let protected_routes = Router::new()
        .route("/auth/user/", get(auth::user_profile))
        .route(
            "/segments/",
            get(segments::list_segments).post(segments::create_segment),
        )
        .route(
            "/segments/{id}/",
            get(segments::get_segment)
                .put(segments::update_segment)
                .patch(segments::patch_segment)
                .delete(segments::delete_segment),
        )
        .route("/photos/", get(photos::list_photos).post(photos::create_photo))
        .route(
            "/photos/{id}/",
            get(photos::get_photo)
                .put(photos::update_photo)
                .patch(photos::patch_photo)
                .delete(photos::delete_photo),
        )
        .route(
            "/updates/",
            get(updates::list_updates).post(updates::create_update),
        )
        .route(
            "/updates/{id}/",
            get(updates::get_update)
                .put(updates::replace_update)
                .patch(updates::patch_update)
                .delete(updates::delete_update),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let media = ServeDir::new(state.media.root());
    let cors = cors_layer(&state.config.cors_origins);

    let app_routes = Router::new()
        .route("/", get(home::root))
        .route("/auth/login/", post(auth::login))
        .route("/auth/logout/", post(auth::logout))
        .merge(project_routes)
        .merge(protected_routes)
        .with_state(state);

    Router::new()
        .merge(swagger_router)
        .merge(app_routes)
        .nest_service("/media", media)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
