use std::collections::HashMap;

use axum::extract::Multipart;
use sea_orm::{ActiveValue::Set, ConnectionTrait};
use serde::Deserialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::fields::{double_option, require_non_blank, timestamp_json, usernames};
use crate::entities::project_photo;
use crate::error::{AppError, AppResult};
use crate::geo::{GeoStrategy, PointColumns, PointInput, PointPatch, PointSlot};
use crate::services::media::MediaStore;

/// Multipart body of `POST /photos/`.
#[derive(Debug, Default)]
pub struct PhotoUpload {
    pub project: Option<i32>,
    pub title: Option<String>,
    pub description: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location: Option<Value>,
    pub image: Option<Vec<u8>>,
}

/// OpenAPI description of the multipart upload form.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct PhotoUploadForm {
    project: i32,
    title: String,
    description: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    /// GeoJSON Point as text. Spatial mode only.
    location: Option<String>,
    #[schema(value_type = String, format = Binary)]
    image: Vec<u8>,
}

fn parse_number(field: &str, raw: &str) -> AppResult<Option<f64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Some)
        .ok_or_else(|| AppError::Validation(format!("{field}: A valid number is required.")))
}

impl PhotoUpload {
    pub async fn from_multipart(mut multipart: Multipart) -> AppResult<Self> {
        let mut upload = PhotoUpload::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "image" => upload.image = Some(field.bytes().await?.to_vec()),
                "project" => {
                    let raw = field.text().await?;
                    let id = raw.trim().parse::<i32>().map_err(|_| {
                        AppError::Validation(format!(
                            "project: Incorrect type. Expected pk value, received {raw:?}."
                        ))
                    })?;
                    upload.project = Some(id);
                }
                "title" => upload.title = Some(field.text().await?),
                "description" => upload.description = field.text().await?,
                "latitude" => upload.latitude = parse_number("latitude", &field.text().await?)?,
                "longitude" => upload.longitude = parse_number("longitude", &field.text().await?)?,
                "location" => {
                    let raw = field.text().await?;
                    if !raw.trim().is_empty() {
                        let value = serde_json::from_str(&raw).map_err(|e| {
                            AppError::Validation(format!("location: invalid JSON ({e})"))
                        })?;
                        upload.location = Some(value);
                    }
                }
                other => tracing::debug!(field = %other, "ignoring multipart field"),
            }
        }

        Ok(upload)
    }

    /// Checks required fields, returning `(project, title, image)`.
    pub fn required(&mut self) -> AppResult<(i32, String, Vec<u8>)> {
        let project = self
            .project
            .ok_or_else(|| AppError::Validation("project: This field is required.".to_string()))?;
        let title = self
            .title
            .take()
            .ok_or_else(|| AppError::Validation("title: This field is required.".to_string()))?;
        require_non_blank("title", &title, Some(200))?;
        let image = self
            .image
            .take()
            .filter(|bytes| !bytes.is_empty())
            .ok_or_else(|| AppError::Validation("image: No file was submitted.".to_string()))?;
        Ok((project, title, image))
    }

    pub fn point(&self) -> PointInput {
        PointInput {
            latitude: self.latitude,
            longitude: self.longitude,
            geometry: self.location.clone(),
        }
    }
}

/// Body of `PUT /photos/{id}/`. The stored image cannot be replaced.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PhotoUpdate {
    pub project: i32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[schema(value_type = Option<Object>)]
    pub location: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PhotoPatch {
    pub project: Option<i32>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub latitude: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub longitude: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Object>)]
    pub location: Option<Option<Value>>,
}

impl PhotoUpdate {
    pub fn validate(&self) -> AppResult<()> {
        require_non_blank("title", &self.title, Some(200))
    }

    pub fn point(&self) -> PointInput {
        PointInput {
            latitude: self.latitude,
            longitude: self.longitude,
            geometry: self.location.clone(),
        }
    }

    pub fn apply(self, model: &mut project_photo::ActiveModel, columns: PointColumns) {
        model.project_id = Set(self.project);
        model.title = Set(self.title);
        model.description = Set(self.description);
        set_point(model, columns);
    }
}

impl PhotoPatch {
    pub fn validate(&self) -> AppResult<()> {
        match &self.title {
            Some(title) => require_non_blank("title", title, Some(200)),
            None => Ok(()),
        }
    }

    pub fn point(&self) -> PointPatch {
        PointPatch {
            latitude: self.latitude,
            longitude: self.longitude,
            geometry: self.location.clone(),
        }
    }

    pub fn apply(self, model: &mut project_photo::ActiveModel, columns: PointColumns) {
        if let Some(project) = self.project {
            model.project_id = Set(project);
        }
        if let Some(title) = self.title {
            model.title = Set(title);
        }
        if let Some(description) = self.description {
            model.description = Set(description);
        }
        set_point(model, columns);
    }
}

pub fn set_point(model: &mut project_photo::ActiveModel, columns: PointColumns) {
    model.latitude = Set(columns.latitude);
    model.longitude = Set(columns.longitude);
    model.location = Set(columns.geometry);
}

pub fn stored_point(photo: &project_photo::Model) -> PointColumns {
    PointColumns {
        latitude: photo.latitude,
        longitude: photo.longitude,
        geometry: photo.location.clone(),
    }
}

fn photo_json(geo: &dyn GeoStrategy, photo: project_photo::Model, names: &HashMap<i32, String>) -> Value {
    let mut properties = Map::new();
    properties.insert("project".into(), photo.project_id.into());
    properties.insert("title".into(), photo.title.clone().into());
    properties.insert("description".into(), photo.description.clone().into());
    properties.insert("image".into(), MediaStore::url(&photo.image).into());
    properties.insert("taken_at".into(), timestamp_json(photo.taken_at));
    properties.insert("uploaded_by".into(), photo.uploaded_by.into());
    properties.insert(
        "uploaded_by_name".into(),
        names.get(&photo.uploaded_by).cloned().into(),
    );

    geo.render_point(PointSlot::PhotoLocation, photo.id, properties, &stored_point(&photo))
}

pub async fn render_photos<C: ConnectionTrait>(
    db: &C,
    geo: &dyn GeoStrategy,
    photos: Vec<project_photo::Model>,
) -> AppResult<Vec<Value>> {
    let mut uploader_ids: Vec<i32> = photos.iter().map(|p| p.uploaded_by).collect();
    uploader_ids.sort_unstable();
    uploader_ids.dedup();
    let names = usernames(db, &uploader_ids).await?;

    Ok(photos
        .into_iter()
        .map(|photo| photo_json(geo, photo, &names))
        .collect())
}

pub async fn render_photo<C: ConnectionTrait>(
    db: &C,
    geo: &dyn GeoStrategy,
    photo: project_photo::Model,
) -> AppResult<Value> {
    let mut rendered = render_photos(db, geo, vec![photo]).await?;
    Ok(rendered.pop().unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{SimpleGeo, SpatialGeo};
    use serde_json::json;

    fn model() -> project_photo::Model {
        project_photo::Model {
            id: 5,
            project_id: 3,
            title: "Culvert".into(),
            description: "before works".into(),
            image: "project_photos/abc.jpg".into(),
            latitude: Some(51.5),
            longitude: Some(-0.12),
            location: None,
            taken_at: chrono::NaiveDate::from_ymd_opt(2024, 2, 2)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            uploaded_by: 7,
        }
    }

    #[test]
    fn renders_photo_with_media_url() {
        let names = HashMap::from([(7, "carol".to_string())]);
        let value = photo_json(&SimpleGeo, model(), &names);
        assert_eq!(value["image"], "/media/project_photos/abc.jpg");
        assert_eq!(value["uploaded_by_name"], "carol");
        assert_eq!(value["latitude"], 51.5);
    }

    #[test]
    fn spatial_photo_stays_flat() {
        let mut photo = model();
        photo.latitude = None;
        photo.longitude = None;
        photo.location = Some(json!({"type": "Point", "coordinates": [-0.12, 51.5]}));

        let value = photo_json(&SpatialGeo, photo, &HashMap::new());
        assert_eq!(value["id"], 5);
        assert_eq!(value["location"]["type"], "Point");
        assert_eq!(value["uploaded_by_name"], Value::Null);
    }

    #[test]
    fn upload_requires_project_title_and_image() {
        let mut upload = PhotoUpload::default();
        assert!(upload.required().is_err());

        let mut upload = PhotoUpload {
            project: Some(1),
            title: Some("t".into()),
            image: Some(Vec::new()),
            ..Default::default()
        };
        let err = upload.required().unwrap_err();
        assert_eq!(err.to_string(), "image: No file was submitted.");
    }

    #[test]
    fn empty_numbers_mean_absent() {
        assert_eq!(parse_number("latitude", " ").unwrap(), None);
        assert_eq!(parse_number("latitude", "12.5").unwrap(), Some(12.5));
        assert!(parse_number("latitude", "north").is_err());
    }
}
