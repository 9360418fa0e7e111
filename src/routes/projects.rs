use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use axum_extra::extract::WithRejection;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::IntoParams;

use crate::entities::{
    project_assignment::{self, Entity as ProjectAssignment},
    project_photo::{self, Entity as ProjectPhoto},
    project_update::{self, Entity as ProjectUpdate},
    road_project::{self, Entity as RoadProject, Priority, ProjectStatus},
    road_segment::{self, Entity as RoadSegment},
};
use crate::error::{AppError, AppResult};
use crate::geo::{NearbyQuery, PointInput, PointSlot};
use crate::middleware::auth::AuthUser;
use crate::models::fields::{ensure_users_exist, from_body};
use crate::models::project::{
    normalize_assignees, render_project, render_projects, stored_point, ProjectCreate, ProjectPatch,
};
use crate::models::{photo::render_photos, segment::render_segment, update::render_updates};
use crate::pagination::{envelope, Pagination};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub created_by: Option<i32>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[allow(dead_code)]
pub struct NearbyParams {
    /// Latitude of the search centre.
    lat: String,
    /// Longitude of the search centre.
    lng: String,
    /// Search radius in kilometres.
    #[param(default = "10")]
    radius: Option<String>,
}

pub(crate) async fn find_project<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<road_project::Model> {
    RoadProject::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Project"))
}

/// Replaces the assignee set of a project.
async fn sync_assignments<C: ConnectionTrait>(db: &C, project_id: i32, user_ids: &[i32]) -> AppResult<()> {
    ensure_users_exist(db, user_ids).await?;

    ProjectAssignment::delete_many()
        .filter(project_assignment::Column::ProjectId.eq(project_id))
        .exec(db)
        .await?;

    if !user_ids.is_empty() {
        let rows = user_ids.iter().map(|user_id| project_assignment::ActiveModel {
            project_id: Set(project_id),
            user_id: Set(*user_id),
        });
        ProjectAssignment::insert_many(rows)
            .exec_without_returning(db)
            .await?;
    }
    Ok(())
}

async fn list_response(
    state: &AppState,
    projects: Vec<road_project::Model>,
    page: Option<crate::pagination::PageInfo>,
) -> AppResult<Json<Value>> {
    let rendered = render_projects(&state.db, state.geo.as_ref(), projects).await?;
    Ok(Json(envelope(state.geo.render_collection(rendered), page)))
}

#[utoipa::path(
    get,
    path = "/projects/",
    params(ProjectFilter, Pagination),
    responses(
        (status = 200, description = "Projects, newest first. A FeatureCollection in spatial mode"),
        (status = 400, description = "Invalid filter value")
    ),
    security((), ("token_auth" = [])),
    tag = "Projects"
)]
pub async fn list_projects(
    State(state): State<AppState>,
    WithRejection(Query(filter), _): WithRejection<Query<ProjectFilter>, AppError>,
    WithRejection(Query(pagination), _): WithRejection<Query<Pagination>, AppError>,
) -> AppResult<Json<Value>> {
    let mut select = RoadProject::find();
    if let Some(status) = filter.status {
        select = select.filter(road_project::Column::Status.eq(status));
    }
    if let Some(priority) = filter.priority {
        select = select.filter(road_project::Column::Priority.eq(priority));
    }
    if let Some(created_by) = filter.created_by {
        select = select.filter(road_project::Column::CreatedBy.eq(created_by));
    }
    let select = select
        .order_by_desc(road_project::Column::CreatedAt)
        .order_by_desc(road_project::Column::Id);

    let (projects, page) = pagination.fetch(&state.db, select).await?;
    list_response(&state, projects, page).await
}

#[utoipa::path(
    get,
    path = "/projects/nearby/",
    params(NearbyParams, Pagination),
    responses(
        (status = 200, description = "Projects within the radius, same shape as the project list"),
        (status = 400, description = "Missing or invalid coordinates")
    ),
    security((), ("token_auth" = [])),
    tag = "Projects"
)]
pub async fn nearby_projects(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    WithRejection(Query(pagination), _): WithRejection<Query<Pagination>, AppError>,
) -> AppResult<Json<Value>> {
    let query = NearbyQuery::parse(
        params.get("lat").map(String::as_str),
        params.get("lng").map(String::as_str),
        params.get("radius").map(String::as_str),
    )?;

    tracing::debug!(lat = query.lat, lng = query.lng, radius_km = query.radius_km, "nearby search");

    let select = RoadProject::find()
        .filter(state.geo.nearby_condition(&query))
        .order_by_desc(road_project::Column::CreatedAt)
        .order_by_desc(road_project::Column::Id);

    let (projects, page) = pagination.fetch(&state.db, select).await?;
    list_response(&state, projects, page).await
}

#[utoipa::path(
    post,
    path = "/projects/",
    request_body = ProjectCreate,
    responses(
        (status = 201, description = "Project created"),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Authentication required")
    ),
    security((), ("token_auth" = [])),
    tag = "Projects"
)]
pub async fn create_project(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    WithRejection(Json(body), _): WithRejection<Json<Value>, AppError>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let payload: ProjectCreate = from_body(state.geo.unwrap_feature(body, PointSlot::ProjectArea.field()))?;
    payload.validate()?;
    let columns = state.geo.point_columns(PointSlot::ProjectArea, payload.point())?;
    let assignees = normalize_assignees(payload.assigned_to.clone());

    let now = chrono::Utc::now().naive_utc();
    let mut model = road_project::ActiveModel {
        created_by: Set(actor.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    payload.apply(&mut model, columns);

    let txn = state.db.begin().await?;
    let project = model.insert(&txn).await?;
    sync_assignments(&txn, project.id, &assignees).await?;
    txn.commit().await?;

    tracing::info!(project_id = project.id, user = %actor.username, "project created");
    let body = render_project(&state.db, state.geo.as_ref(), project).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(
    get,
    path = "/projects/{id}/",
    params(("id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project details"),
        (status = 404, description = "Project not found")
    ),
    security((), ("token_auth" = [])),
    tag = "Projects"
)]
pub async fn get_project(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> AppResult<Json<Value>> {
    let project = find_project(&state.db, id).await?;
    Ok(Json(render_project(&state.db, state.geo.as_ref(), project).await?))
}

#[utoipa::path(
    put,
    path = "/projects/{id}/",
    params(("id" = i32, Path, description = "Project ID")),
    request_body = ProjectCreate,
    responses(
        (status = 200, description = "Project replaced"),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Project not found")
    ),
    security((), ("token_auth" = [])),
    tag = "Projects"
)]
pub async fn update_project(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
    WithRejection(Json(body), _): WithRejection<Json<Value>, AppError>,
) -> AppResult<Json<Value>> {
    let project = find_project(&state.db, id).await?;
    let payload: ProjectCreate = from_body(state.geo.unwrap_feature(body, PointSlot::ProjectArea.field()))?;
    payload.validate()?;
    let columns = state.geo.point_columns(PointSlot::ProjectArea, payload.point())?;
    let assignees = normalize_assignees(payload.assigned_to.clone());

    let mut model = project.into_active_model();
    payload.apply(&mut model, columns);
    model.updated_at = Set(chrono::Utc::now().naive_utc());

    let txn = state.db.begin().await?;
    let project = model.update(&txn).await?;
    sync_assignments(&txn, project.id, &assignees).await?;
    txn.commit().await?;

    tracing::info!(project_id = project.id, user = %actor.username, "project replaced");
    Ok(Json(render_project(&state.db, state.geo.as_ref(), project).await?))
}

#[utoipa::path(
    patch,
    path = "/projects/{id}/",
    params(("id" = i32, Path, description = "Project ID")),
    request_body = ProjectPatch,
    responses(
        (status = 200, description = "Project updated"),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Project not found")
    ),
    security((), ("token_auth" = [])),
    tag = "Projects"
)]
pub async fn patch_project(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
    WithRejection(Json(body), _): WithRejection<Json<Value>, AppError>,
) -> AppResult<Json<Value>> {
    let project = find_project(&state.db, id).await?;
    let payload: ProjectPatch = from_body(state.geo.unwrap_feature(body, PointSlot::ProjectArea.field()))?;
    payload.validate()?;

    let merged = PointInput::from_columns(&stored_point(&project)).overlay(payload.point());
    let columns = state.geo.point_columns(PointSlot::ProjectArea, merged)?;
    let assignees = payload.assigned_to.clone().map(normalize_assignees);

    let mut model = project.into_active_model();
    payload.apply(&mut model, columns);
    model.updated_at = Set(chrono::Utc::now().naive_utc());

    let txn = state.db.begin().await?;
    let project = model.update(&txn).await?;
    if let Some(assignees) = assignees {
        sync_assignments(&txn, project.id, &assignees).await?;
    }
    txn.commit().await?;

    tracing::info!(project_id = project.id, user = %actor.username, "project updated");
    Ok(Json(render_project(&state.db, state.geo.as_ref(), project).await?))
}

#[utoipa::path(
    delete,
    path = "/projects/{id}/",
    params(("id" = i32, Path, description = "Project ID")),
    responses(
        (status = 204, description = "Project and its segments, photos and updates deleted"),
        (status = 404, description = "Project not found")
    ),
    security((), ("token_auth" = [])),
    tag = "Projects"
)]
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> AppResult<StatusCode> {
    let project = find_project(&state.db, id).await?;

    let txn = state.db.begin().await?;
    let images: Vec<String> = ProjectPhoto::find()
        .filter(project_photo::Column::ProjectId.eq(project.id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|photo| photo.image)
        .collect();
    ProjectPhoto::delete_many()
        .filter(project_photo::Column::ProjectId.eq(project.id))
        .exec(&txn)
        .await?;
    RoadSegment::delete_many()
        .filter(road_segment::Column::ProjectId.eq(project.id))
        .exec(&txn)
        .await?;
    ProjectUpdate::delete_many()
        .filter(project_update::Column::ProjectId.eq(project.id))
        .exec(&txn)
        .await?;
    ProjectAssignment::delete_many()
        .filter(project_assignment::Column::ProjectId.eq(project.id))
        .exec(&txn)
        .await?;
    RoadProject::delete_by_id(project.id).exec(&txn).await?;
    txn.commit().await?;

    for image in &images {
        state.media.delete(image).await;
    }

    tracing::info!(project_id = id, user = %actor.username, photos = images.len(), "project deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/projects/{id}/segments/",
    params(("id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Segments of the project, by name"),
        (status = 404, description = "Project not found")
    ),
    security((), ("token_auth" = [])),
    tag = "Projects"
)]
pub async fn project_segments(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> AppResult<Json<Value>> {
    let project = find_project(&state.db, id).await?;
    let segments = RoadSegment::find()
        .filter(road_segment::Column::ProjectId.eq(project.id))
        .order_by_asc(road_segment::Column::Name)
        .order_by_asc(road_segment::Column::Id)
        .all(&state.db)
        .await?;

    let rendered = segments
        .into_iter()
        .map(|segment| render_segment(state.geo.as_ref(), segment))
        .collect();
    Ok(Json(state.geo.render_collection(rendered)))
}

#[utoipa::path(
    get,
    path = "/projects/{id}/photos/",
    params(("id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Photos of the project, newest first"),
        (status = 404, description = "Project not found")
    ),
    security((), ("token_auth" = [])),
    tag = "Projects"
)]
pub async fn project_photos(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> AppResult<Json<Value>> {
    let project = find_project(&state.db, id).await?;
    let photos = ProjectPhoto::find()
        .filter(project_photo::Column::ProjectId.eq(project.id))
        .order_by_desc(project_photo::Column::TakenAt)
        .order_by_desc(project_photo::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(Value::Array(
        render_photos(&state.db, state.geo.as_ref(), photos).await?,
    )))
}

#[utoipa::path(
    get,
    path = "/projects/{id}/updates/",
    params(("id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Status updates of the project, newest first"),
        (status = 404, description = "Project not found")
    ),
    security((), ("token_auth" = [])),
    tag = "Projects"
)]
pub async fn project_updates(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> AppResult<Json<Value>> {
    let project = find_project(&state.db, id).await?;
    let updates = ProjectUpdate::find()
        .filter(project_update::Column::ProjectId.eq(project.id))
        .order_by_desc(project_update::Column::CreatedAt)
        .order_by_desc(project_update::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(Value::Array(render_updates(&state.db, updates).await?)))
}
