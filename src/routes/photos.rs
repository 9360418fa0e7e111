use axum::{
    extract::{Multipart, Path, Query, State},
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

use crate::entities::project_photo::{self, Entity as ProjectPhoto};
use crate::error::{AppError, AppResult};
use crate::geo::{PointInput, PointSlot};
use crate::middleware::auth::AuthUser;
use crate::models::fields::{ensure_project_exists, from_body};
use crate::models::photo::{
    render_photo, render_photos, set_point, stored_point, PhotoPatch, PhotoUpdate, PhotoUpload,
    PhotoUploadForm,
};
use crate::pagination::{envelope, Pagination};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PhotoFilter {
    pub project: Option<i32>,
}

async fn find_photo(state: &AppState, id: i32) -> AppResult<project_photo::Model> {
    ProjectPhoto::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("Photo"))
}

#[utoipa::path(
    get,
    path = "/photos/",
    params(PhotoFilter, Pagination),
    responses(
        (status = 200, description = "Photos, newest first"),
        (status = 401, description = "Authentication required")
    ),
    security(("token_auth" = [])),
    tag = "Photos"
)]
pub async fn list_photos(
    State(state): State<AppState>,
    WithRejection(Query(filter), _): WithRejection<Query<PhotoFilter>, AppError>,
    WithRejection(Query(pagination), _): WithRejection<Query<Pagination>, AppError>,
) -> AppResult<Json<Value>> {
    let mut select = ProjectPhoto::find();
    if let Some(project) = filter.project {
        select = select.filter(project_photo::Column::ProjectId.eq(project));
    }
    let select = select
        .order_by_desc(project_photo::Column::TakenAt)
        .order_by_desc(project_photo::Column::Id);

    let (photos, page) = pagination.fetch(&state.db, select).await?;
    let rendered = render_photos(&state.db, state.geo.as_ref(), photos).await?;
    Ok(Json(envelope(Value::Array(rendered), page)))
}

#[utoipa::path(
    post,
    path = "/photos/",
    request_body(content = PhotoUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Photo uploaded"),
        (status = 400, description = "Missing field, unknown project or invalid image"),
        (status = 401, description = "Authentication required")
    ),
    security(("token_auth" = [])),
    tag = "Photos"
)]
pub async fn create_photo(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    WithRejection(multipart, _): WithRejection<Multipart, AppError>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let mut upload = PhotoUpload::from_multipart(multipart).await?;
    let (project, title, image) = upload.required()?;
    ensure_project_exists(&state.db, project).await?;
    let columns = state.geo.point_columns(PointSlot::PhotoLocation, upload.point())?;

    let stored = state.media.put_image(&image).await?;

    let mut model = project_photo::ActiveModel {
        project_id: Set(project),
        title: Set(title),
        description: Set(upload.description),
        image: Set(stored.clone()),
        taken_at: Set(chrono::Utc::now().naive_utc()),
        uploaded_by: Set(actor.id),
        ..Default::default()
    };
    set_point(&mut model, columns);

    let photo = match model.insert(&state.db).await {
        Ok(photo) => photo,
        Err(e) => {
            state.media.delete(&stored).await;
            return Err(e.into());
        }
    };

    tracing::info!(photo_id = photo.id, project_id = photo.project_id, user = %actor.username, bytes = image.len(), "photo uploaded");
    let body = render_photo(&state.db, state.geo.as_ref(), photo).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(
    get,
    path = "/photos/{id}/",
    params(("id" = i32, Path, description = "Photo ID")),
    responses(
        (status = 200, description = "Photo details"),
        (status = 404, description = "Photo not found")
    ),
    security(("token_auth" = [])),
    tag = "Photos"
)]
pub async fn get_photo(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> AppResult<Json<Value>> {
    let photo = find_photo(&state, id).await?;
    Ok(Json(render_photo(&state.db, state.geo.as_ref(), photo).await?))
}

#[utoipa::path(
    put,
    path = "/photos/{id}/",
    params(("id" = i32, Path, description = "Photo ID")),
    request_body = PhotoUpdate,
    responses(
        (status = 200, description = "Photo metadata replaced"),
        (status = 400, description = "Validation error or unknown project"),
        (status = 404, description = "Photo not found")
    ),
    security(("token_auth" = [])),
    tag = "Photos"
)]
pub async fn update_photo(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
    WithRejection(Json(body), _): WithRejection<Json<Value>, AppError>,
) -> AppResult<Json<Value>> {
    let photo = find_photo(&state, id).await?;
    let payload: PhotoUpdate = from_body(body)?;
    payload.validate()?;
    ensure_project_exists(&state.db, payload.project).await?;
    let columns = state.geo.point_columns(PointSlot::PhotoLocation, payload.point())?;

    let mut model = photo.into_active_model();
    payload.apply(&mut model, columns);
    let photo = model.update(&state.db).await?;

    Ok(Json(render_photo(&state.db, state.geo.as_ref(), photo).await?))
}

#[utoipa::path(
    patch,
    path = "/photos/{id}/",
    params(("id" = i32, Path, description = "Photo ID")),
    request_body = PhotoPatch,
    responses(
        (status = 200, description = "Photo metadata updated"),
        (status = 400, description = "Validation error or unknown project"),
        (status = 404, description = "Photo not found")
    ),
    security(("token_auth" = [])),
    tag = "Photos"
)]
pub async fn patch_photo(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
    WithRejection(Json(body), _): WithRejection<Json<Value>, AppError>,
) -> AppResult<Json<Value>> {
    let photo = find_photo(&state, id).await?;
    let payload: PhotoPatch = from_body(body)?;
    payload.validate()?;
    if let Some(project) = payload.project {
        ensure_project_exists(&state.db, project).await?;
    }

    let merged = PointInput::from_columns(&stored_point(&photo)).overlay(payload.point());
    let columns = state.geo.point_columns(PointSlot::PhotoLocation, merged)?;

    let mut model = photo.into_active_model();
    payload.apply(&mut model, columns);
    let photo = model.update(&state.db).await?;

    Ok(Json(render_photo(&state.db, state.geo.as_ref(), photo).await?))
}

#[utoipa::path(
    delete,
    path = "/photos/{id}/",
    params(("id" = i32, Path, description = "Photo ID")),
    responses(
        (status = 204, description = "Photo and its image file deleted"),
        (status = 404, description = "Photo not found")
    ),
    security(("token_auth" = [])),
    tag = "Photos"
)]
pub async fn delete_photo(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> AppResult<StatusCode> {
    let photo = find_photo(&state, id).await?;
    ProjectPhoto::delete_by_id(photo.id).exec(&state.db).await?;
    state.media.delete(&photo.image).await;

    tracing::info!(photo_id = id, user = %actor.username, "photo deleted");
    Ok(StatusCode::NO_CONTENT)
}
