use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use axum_extra::extract::WithRejection;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::IntoParams;

use crate::entities::road_segment::{self, Entity as RoadSegment, RoadType, SurfaceType};
use crate::error::{AppError, AppResult};
use crate::geo::{PathInput, PATH_FIELD};
use crate::middleware::auth::AuthUser;
use crate::models::fields::{ensure_project_exists, from_body};
use crate::models::segment::{render_segment, stored_path, SegmentCreate, SegmentPatch};
use crate::pagination::{envelope, Pagination};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SegmentFilter {
    pub project: Option<i32>,
    pub road_type: Option<RoadType>,
    pub surface_type: Option<SurfaceType>,
}

async fn find_segment(state: &AppState, id: i32) -> AppResult<road_segment::Model> {
    RoadSegment::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("Segment"))
}

#[utoipa::path(
    get,
    path = "/segments/",
    params(SegmentFilter, Pagination),
    responses(
        (status = 200, description = "Segments ordered by name. A FeatureCollection in spatial mode"),
        (status = 401, description = "Authentication required")
    ),
    security(("token_auth" = [])),
    tag = "Segments"
)]
pub async fn list_segments(
    State(state): State<AppState>,
    WithRejection(Query(filter), _): WithRejection<Query<SegmentFilter>, AppError>,
    WithRejection(Query(pagination), _): WithRejection<Query<Pagination>, AppError>,
) -> AppResult<Json<Value>> {
    let mut select = RoadSegment::find();
    if let Some(project) = filter.project {
        select = select.filter(road_segment::Column::ProjectId.eq(project));
    }
    if let Some(road_type) = filter.road_type {
        select = select.filter(road_segment::Column::RoadType.eq(road_type));
    }
    if let Some(surface_type) = filter.surface_type {
        select = select.filter(road_segment::Column::SurfaceType.eq(surface_type));
    }
    let select = select
        .order_by_asc(road_segment::Column::Name)
        .order_by_asc(road_segment::Column::Id);

    let (segments, page) = pagination.fetch(&state.db, select).await?;
    let rendered = segments
        .into_iter()
        .map(|segment| render_segment(state.geo.as_ref(), segment))
        .collect();
    Ok(Json(envelope(state.geo.render_collection(rendered), page)))
}

#[utoipa::path(
    post,
    path = "/segments/",
    request_body = SegmentCreate,
    responses(
        (status = 201, description = "Segment created"),
        (status = 400, description = "Validation error or unknown project"),
        (status = 401, description = "Authentication required")
    ),
    security(("token_auth" = [])),
    tag = "Segments"
)]
pub async fn create_segment(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    WithRejection(Json(body), _): WithRejection<Json<Value>, AppError>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let payload: SegmentCreate = from_body(state.geo.unwrap_feature(body, PATH_FIELD))?;
    payload.validate()?;
    ensure_project_exists(&state.db, payload.project).await?;
    let columns = state.geo.path_columns(payload.path())?;

    let now = chrono::Utc::now().naive_utc();
    let mut model = road_segment::ActiveModel {
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    payload.apply(&mut model, columns);
    let segment = model.insert(&state.db).await?;

    tracing::info!(segment_id = segment.id, project_id = segment.project_id, user = %actor.username, "segment created");
    Ok((StatusCode::CREATED, Json(render_segment(state.geo.as_ref(), segment))))
}

#[utoipa::path(
    get,
    path = "/segments/{id}/",
    params(("id" = i32, Path, description = "Segment ID")),
    responses(
        (status = 200, description = "Segment details"),
        (status = 404, description = "Segment not found")
    ),
    security(("token_auth" = [])),
    tag = "Segments"
)]
pub async fn get_segment(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> AppResult<Json<Value>> {
    let segment = find_segment(&state, id).await?;
    Ok(Json(render_segment(state.geo.as_ref(), segment)))
}

#[utoipa::path(
    put,
    path = "/segments/{id}/",
    params(("id" = i32, Path, description = "Segment ID")),
    request_body = SegmentCreate,
    responses(
        (status = 200, description = "Segment replaced"),
        (status = 400, description = "Validation error or unknown project"),
        (status = 404, description = "Segment not found")
    ),
    security(("token_auth" = [])),
    tag = "Segments"
)]
pub async fn update_segment(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
    WithRejection(Json(body), _): WithRejection<Json<Value>, AppError>,
) -> AppResult<Json<Value>> {
    let segment = find_segment(&state, id).await?;
    let payload: SegmentCreate = from_body(state.geo.unwrap_feature(body, PATH_FIELD))?;
    payload.validate()?;
    ensure_project_exists(&state.db, payload.project).await?;
    let columns = state.geo.path_columns(payload.path())?;

    let mut model = segment.into_active_model();
    payload.apply(&mut model, columns);
    model.updated_at = Set(chrono::Utc::now().naive_utc());
    let segment = model.update(&state.db).await?;

    Ok(Json(render_segment(state.geo.as_ref(), segment)))
}

#[utoipa::path(
    patch,
    path = "/segments/{id}/",
    params(("id" = i32, Path, description = "Segment ID")),
    request_body = SegmentPatch,
    responses(
        (status = 200, description = "Segment updated"),
        (status = 400, description = "Validation error or unknown project"),
        (status = 404, description = "Segment not found")
    ),
    security(("token_auth" = [])),
    tag = "Segments"
)]
pub async fn patch_segment(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
    WithRejection(Json(body), _): WithRejection<Json<Value>, AppError>,
) -> AppResult<Json<Value>> {
    let segment = find_segment(&state, id).await?;
    let payload: SegmentPatch = from_body(state.geo.unwrap_feature(body, PATH_FIELD))?;
    payload.validate()?;
    if let Some(project) = payload.project {
        ensure_project_exists(&state.db, project).await?;
    }

    let merged = PathInput::from_columns(&stored_path(&segment)).overlay(payload.path());
    let columns = state.geo.path_columns(merged)?;

    let mut model = segment.into_active_model();
    payload.apply(&mut model, columns);
    model.updated_at = Set(chrono::Utc::now().naive_utc());
    let segment = model.update(&state.db).await?;

    Ok(Json(render_segment(state.geo.as_ref(), segment)))
}

#[utoipa::path(
    delete,
    path = "/segments/{id}/",
    params(("id" = i32, Path, description = "Segment ID")),
    responses(
        (status = 204, description = "Segment deleted"),
        (status = 404, description = "Segment not found")
    ),
    security(("token_auth" = [])),
    tag = "Segments"
)]
pub async fn delete_segment(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> AppResult<StatusCode> {
    let segment = find_segment(&state, id).await?;
    RoadSegment::delete_by_id(segment.id).exec(&state.db).await?;

    tracing::info!(segment_id = id, user = %actor.username, "segment deleted");
    Ok(StatusCode::NO_CONTENT)
}
