use sea_orm::ActiveValue::Set;
use serde::Deserialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::fields::{require_non_blank, timestamp_json};
use crate::entities::road_segment::{self, RoadType, SurfaceType};
use crate::error::{AppError, AppResult};
use crate::geo::{GeoStrategy, PathColumns, PathInput};

/// Body of `POST /segments/` and `PUT /segments/{id}/`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SegmentCreate {
    pub project: i32,
    pub name: String,
    pub road_type: RoadType,
    pub surface_type: SurfaceType,
    pub length_km: f64,
    pub width_m: f64,
    pub start_latitude: Option<f64>,
    pub start_longitude: Option<f64>,
    pub end_latitude: Option<f64>,
    pub end_longitude: Option<f64>,
    /// GeoJSON LineString. Spatial mode only.
    #[schema(value_type = Option<Object>)]
    pub centerline: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SegmentPatch {
    pub project: Option<i32>,
    pub name: Option<String>,
    pub road_type: Option<RoadType>,
    pub surface_type: Option<SurfaceType>,
    pub length_km: Option<f64>,
    pub width_m: Option<f64>,
    pub start_latitude: Option<f64>,
    pub start_longitude: Option<f64>,
    pub end_latitude: Option<f64>,
    pub end_longitude: Option<f64>,
    #[schema(value_type = Option<Object>)]
    pub centerline: Option<Value>,
}

fn check_measure(field: &str, value: f64) -> AppResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(AppError::Validation(format!("{field}: A valid number is required.")))
    }
}

impl SegmentCreate {
    pub fn validate(&self) -> AppResult<()> {
        require_non_blank("name", &self.name, Some(200))?;
        check_measure("length_km", self.length_km)?;
        check_measure("width_m", self.width_m)
    }

    pub fn path(&self) -> PathInput {
        PathInput {
            start_latitude: self.start_latitude,
            start_longitude: self.start_longitude,
            end_latitude: self.end_latitude,
            end_longitude: self.end_longitude,
            geometry: self.centerline.clone(),
        }
    }

    pub fn apply(self, model: &mut road_segment::ActiveModel, columns: PathColumns) {
        model.project_id = Set(self.project);
        model.name = Set(self.name);
        model.road_type = Set(self.road_type);
        model.surface_type = Set(self.surface_type);
        model.length_km = Set(self.length_km);
        model.width_m = Set(self.width_m);
        set_path(model, columns);
    }
}

impl SegmentPatch {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(name) = &self.name {
            require_non_blank("name", name, Some(200))?;
        }
        if let Some(length) = self.length_km {
            check_measure("length_km", length)?;
        }
        if let Some(width) = self.width_m {
            check_measure("width_m", width)?;
        }
        Ok(())
    }

    pub fn path(&self) -> PathInput {
        PathInput {
            start_latitude: self.start_latitude,
            start_longitude: self.start_longitude,
            end_latitude: self.end_latitude,
            end_longitude: self.end_longitude,
            geometry: self.centerline.clone(),
        }
    }

    pub fn apply(self, model: &mut road_segment::ActiveModel, columns: PathColumns) {
        if let Some(project) = self.project {
            model.project_id = Set(project);
        }
        if let Some(name) = self.name {
            model.name = Set(name);
        }
        if let Some(road_type) = self.road_type {
            model.road_type = Set(road_type);
        }
        if let Some(surface_type) = self.surface_type {
            model.surface_type = Set(surface_type);
        }
        if let Some(length_km) = self.length_km {
            model.length_km = Set(length_km);
        }
        if let Some(width_m) = self.width_m {
            model.width_m = Set(width_m);
        }
        set_path(model, columns);
    }
}

fn set_path(model: &mut road_segment::ActiveModel, columns: PathColumns) {
    model.start_latitude = Set(columns.start_latitude);
    model.start_longitude = Set(columns.start_longitude);
    model.end_latitude = Set(columns.end_latitude);
    model.end_longitude = Set(columns.end_longitude);
    model.centerline = Set(columns.geometry);
}

pub fn stored_path(segment: &road_segment::Model) -> PathColumns {
    PathColumns {
        start_latitude: segment.start_latitude,
        start_longitude: segment.start_longitude,
        end_latitude: segment.end_latitude,
        end_longitude: segment.end_longitude,
        geometry: segment.centerline.clone(),
    }
}

pub fn render_segment(geo: &dyn GeoStrategy, segment: road_segment::Model) -> Value {
    let mut properties = Map::new();
    properties.insert("project".into(), segment.project_id.into());
    properties.insert("name".into(), segment.name.clone().into());
    properties.insert(
        "road_type".into(),
        serde_json::to_value(segment.road_type).unwrap_or(Value::Null),
    );
    properties.insert(
        "surface_type".into(),
        serde_json::to_value(segment.surface_type).unwrap_or(Value::Null),
    );
    properties.insert("length_km".into(), segment.length_km.into());
    properties.insert("width_m".into(), segment.width_m.into());
    properties.insert("created_at".into(), timestamp_json(segment.created_at));
    properties.insert("updated_at".into(), timestamp_json(segment.updated_at));

    geo.render_path(segment.id, properties, &stored_path(&segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{SimpleGeo, SpatialGeo};
    use serde_json::json;

    fn model() -> road_segment::Model {
        let at = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        road_segment::Model {
            id: 11,
            project_id: 3,
            name: "North approach".into(),
            road_type: RoadType::Arterial,
            surface_type: SurfaceType::Asphalt,
            length_km: 2.5,
            width_m: 7.0,
            start_latitude: Some(1.0),
            start_longitude: Some(2.0),
            end_latitude: Some(3.0),
            end_longitude: Some(4.0),
            centerline: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn renders_flat_segment() {
        let value = render_segment(&SimpleGeo, model());
        assert_eq!(value["id"], 11);
        assert_eq!(value["project"], 3);
        assert_eq!(value["road_type"], "arterial");
        assert_eq!(value["end_longitude"], 4.0);

        let back: SegmentCreate = serde_json::from_value(value).unwrap();
        assert_eq!(back.project, 3);
        assert_eq!(back.surface_type, SurfaceType::Asphalt);
        assert_eq!(back.path().end_latitude, Some(3.0));
    }

    #[test]
    fn renders_centerline_feature() {
        let mut segment = model();
        segment.centerline = Some(json!({"type": "LineString", "coordinates": [[2.0, 1.0], [4.0, 3.0]]}));
        let value = render_segment(&SpatialGeo, segment);
        assert_eq!(value["type"], "Feature");
        assert_eq!(value["geometry"]["type"], "LineString");
        assert_eq!(value["properties"]["road_type"], "arterial");
    }

    #[test]
    fn road_type_is_required() {
        let result = serde_json::from_value::<SegmentCreate>(json!({
            "project": 1,
            "name": "x",
            "surface_type": "gravel",
            "length_km": 1.0,
            "width_m": 1.0,
        }));
        assert!(result.is_err());
    }
}
