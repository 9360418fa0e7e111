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

use crate::entities::project_update::{self, Entity as ProjectUpdate};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::models::fields::ensure_project_exists;
use crate::models::update::{render_update, render_updates, UpdateCreate, UpdatePatch};
use crate::pagination::{envelope, Pagination};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct UpdateFilter {
    pub project: Option<i32>,
}

async fn find_update(state: &AppState, id: i32) -> AppResult<project_update::Model> {
    ProjectUpdate::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("Update"))
}

#[utoipa::path(
    get,
    path = "/updates/",
    params(UpdateFilter, Pagination),
    responses(
        (status = 200, description = "Status updates, newest first"),
        (status = 401, description = "Authentication required")
    ),
    security(("token_auth" = [])),
    tag = "Updates"
)]
pub async fn list_updates(
    State(state): State<AppState>,
    WithRejection(Query(filter), _): WithRejection<Query<UpdateFilter>, AppError>,
    WithRejection(Query(pagination), _): WithRejection<Query<Pagination>, AppError>,
) -> AppResult<Json<Value>> {
    let mut select = ProjectUpdate::find();
    if let Some(project) = filter.project {
        select = select.filter(project_update::Column::ProjectId.eq(project));
    }
    let select = select
        .order_by_desc(project_update::Column::CreatedAt)
        .order_by_desc(project_update::Column::Id);

    let (updates, page) = pagination.fetch(&state.db, select).await?;
    let rendered = render_updates(&state.db, updates).await?;
    Ok(Json(envelope(Value::Array(rendered), page)))
}

#[utoipa::path(
    post,
    path = "/updates/",
    request_body = UpdateCreate,
    responses(
        (status = 201, description = "Update posted"),
        (status = 400, description = "Validation error or unknown project"),
        (status = 401, description = "Authentication required")
    ),
    security(("token_auth" = [])),
    tag = "Updates"
)]
pub async fn create_update(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateCreate>, AppError>,
) -> AppResult<(StatusCode, Json<Value>)> {
    payload.validate()?;
    ensure_project_exists(&state.db, payload.project).await?;

    let mut model = project_update::ActiveModel {
        created_at: Set(chrono::Utc::now().naive_utc()),
        created_by: Set(actor.id),
        ..Default::default()
    };
    payload.apply(&mut model);
    let update = model.insert(&state.db).await?;

    tracing::info!(update_id = update.id, project_id = update.project_id, user = %actor.username, "update posted");
    Ok((StatusCode::CREATED, Json(render_update(&state.db, update).await?)))
}

#[utoipa::path(
    get,
    path = "/updates/{id}/",
    params(("id" = i32, Path, description = "Update ID")),
    responses(
        (status = 200, description = "Update details"),
        (status = 404, description = "Update not found")
    ),
    security(("token_auth" = [])),
    tag = "Updates"
)]
pub async fn get_update(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> AppResult<Json<Value>> {
    let update = find_update(&state, id).await?;
    Ok(Json(render_update(&state.db, update).await?))
}

#[utoipa::path(
    put,
    path = "/updates/{id}/",
    params(("id" = i32, Path, description = "Update ID")),
    request_body = UpdateCreate,
    responses(
        (status = 200, description = "Update replaced"),
        (status = 400, description = "Validation error or unknown project"),
        (status = 404, description = "Update not found")
    ),
    security(("token_auth" = [])),
    tag = "Updates"
)]
pub async fn replace_update(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateCreate>, AppError>,
) -> AppResult<Json<Value>> {
    let update = find_update(&state, id).await?;
    payload.validate()?;
    ensure_project_exists(&state.db, payload.project).await?;

    let mut model = update.into_active_model();
    payload.apply(&mut model);
    let update = model.update(&state.db).await?;

    Ok(Json(render_update(&state.db, update).await?))
}

#[utoipa::path(
    patch,
    path = "/updates/{id}/",
    params(("id" = i32, Path, description = "Update ID")),
    request_body = UpdatePatch,
    responses(
        (status = 200, description = "Update changed"),
        (status = 400, description = "Validation error or unknown project"),
        (status = 404, description = "Update not found")
    ),
    security(("token_auth" = [])),
    tag = "Updates"
)]
pub async fn patch_update(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdatePatch>, AppError>,
) -> AppResult<Json<Value>> {
    let update = find_update(&state, id).await?;
    payload.validate()?;
    if let Some(project) = payload.project {
        ensure_project_exists(&state.db, project).await?;
    }

    let mut model = update.into_active_model();
    payload.apply(&mut model);
    let update = model.update(&state.db).await?;

    Ok(Json(render_update(&state.db, update).await?))
}

#[utoipa::path(
    delete,
    path = "/updates/{id}/",
    params(("id" = i32, Path, description = "Update ID")),
    responses(
        (status = 204, description = "Update deleted"),
        (status = 404, description = "Update not found")
    ),
    security(("token_auth" = [])),
    tag = "Updates"
)]
pub async fn delete_update(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> AppResult<StatusCode> {
    let update = find_update(&state, id).await?;
    ProjectUpdate::delete_by_id(update.id).exec(&state.db).await?;

    tracing::info!(update_id = id, user = %actor.username, "update deleted");
    Ok(StatusCode::NO_CONTENT)
}
