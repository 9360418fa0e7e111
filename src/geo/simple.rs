use async_trait::async_trait;
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, DbErr};
use serde_json::{Map, Value};

use super::{
    GeoMode, GeoStrategy, NearbyQuery, PathColumns, PathInput, PointColumns, PointInput, PointSlot,
};
use crate::entities::road_project;
use crate::error::{AppError, AppResult};

/// Flat-earth conversion used by the bounding-box search.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Axis-aligned box around a query point.
///
/// The same degree delta is applied to both axes, so the box is square in
/// degrees: it over-selects near the corners and does not shrink longitude
/// with latitude. Callers depend on this exact radius semantics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn around(lat: f64, lng: f64, radius_km: f64) -> Self {
        let lat_delta = radius_km / KM_PER_DEGREE;
        let lng_delta = radius_km / KM_PER_DEGREE;

        Self {
            min_lat: lat - lat_delta,
            max_lat: lat + lat_delta,
            min_lng: lng - lng_delta,
            max_lng: lng + lng_delta,
        }
    }

    /// Inclusive on every edge, matching SQL `BETWEEN`.
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lng..=self.max_lng).contains(&lng)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleGeo;

#[async_trait]
impl GeoStrategy for SimpleGeo {
    fn mode(&self) -> GeoMode {
        GeoMode::Simple
    }

    async fn prepare(&self, _db: &DatabaseConnection) -> Result<(), DbErr> {
        tracing::info!("simple geo mode: latitude/longitude columns, bounding-box proximity");
        Ok(())
    }

    fn point_columns(&self, _slot: PointSlot, input: PointInput) -> AppResult<PointColumns> {
        Ok(PointColumns {
            latitude: input.latitude,
            longitude: input.longitude,
            geometry: None,
        })
    }

    fn path_columns(&self, input: PathInput) -> AppResult<PathColumns> {
        let missing: Vec<&str> = input
            .scalars()
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            let verb = if missing.len() == 1 { "is" } else { "are" };
            return Err(AppError::Validation(format!(
                "{} {verb} required",
                missing.join(", ")
            )));
        }

        Ok(PathColumns {
            start_latitude: input.start_latitude,
            start_longitude: input.start_longitude,
            end_latitude: input.end_latitude,
            end_longitude: input.end_longitude,
            geometry: None,
        })
    }

    fn nearby_condition(&self, query: &NearbyQuery) -> Condition {
        let bbox = BoundingBox::around(query.lat, query.lng, query.radius_km);

        Condition::all()
            .add(road_project::Column::Latitude.is_not_null())
            .add(road_project::Column::Longitude.is_not_null())
            .add(road_project::Column::Latitude.between(bbox.min_lat, bbox.max_lat))
            .add(road_project::Column::Longitude.between(bbox.min_lng, bbox.max_lng))
    }

    fn render_point(
        &self,
        _slot: PointSlot,
        id: i32,
        mut properties: Map<String, Value>,
        columns: &PointColumns,
    ) -> Value {
        properties.insert("id".into(), id.into());
        properties.insert("latitude".into(), columns.latitude.into());
        properties.insert("longitude".into(), columns.longitude.into());
        Value::Object(properties)
    }

    fn render_path(&self, id: i32, mut properties: Map<String, Value>, columns: &PathColumns) -> Value {
        properties.insert("id".into(), id.into());
        properties.insert("start_latitude".into(), columns.start_latitude.into());
        properties.insert("start_longitude".into(), columns.start_longitude.into());
        properties.insert("end_latitude".into(), columns.end_latitude.into());
        properties.insert("end_longitude".into(), columns.end_longitude.into());
        Value::Object(properties)
    }

    fn render_collection(&self, items: Vec<Value>) -> Value {
        Value::Array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, EntityTrait, QueryFilter, QueryTrait};
    use serde_json::json;

    #[test]
    fn box_uses_fixed_degree_delta_on_both_axes() {
        let bbox = BoundingBox::around(10.0, 20.0, 111.0);
        assert_eq!(bbox.min_lat, 9.0);
        assert_eq!(bbox.max_lat, 11.0);
        assert_eq!(bbox.min_lng, 19.0);
        assert_eq!(bbox.max_lng, 21.0);
    }

    #[test]
    fn box_includes_its_center_for_any_positive_radius() {
        for radius in [0.001, 1.0, 10.0, 500.0] {
            assert!(BoundingBox::around(-33.86, 151.2, radius).contains(-33.86, 151.2));
        }
    }

    #[test]
    fn box_edge_is_inclusive() {
        let radius = 5.0;
        let delta = radius / KM_PER_DEGREE;
        let bbox = BoundingBox::around(0.0, 0.0, radius);

        assert!(bbox.contains(delta, 0.0));
        assert!(bbox.contains(-delta, 0.0));
        assert!(!bbox.contains(delta + 1e-9, 0.0));
    }

    #[test]
    fn box_keeps_corners_and_ignores_latitude_compression() {
        // A corner lies ~1.41 radii away but is still selected.
        let bbox = BoundingBox::around(0.0, 0.0, 111.0);
        assert!(bbox.contains(1.0, 1.0));

        // At 60 degrees north one degree of longitude is ~55 km, yet the
        // box still spans a full degree each way.
        let bbox = BoundingBox::around(60.0, 0.0, 111.0);
        assert!(bbox.contains(60.0, 1.0));
    }

    #[test]
    fn path_requires_all_four_scalars() {
        let err = SimpleGeo
            .path_columns(PathInput {
                start_latitude: Some(1.0),
                start_longitude: Some(2.0),
                end_latitude: Some(3.0),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "end_longitude is required");

        let err = SimpleGeo.path_columns(PathInput::default()).unwrap_err();
        assert!(err.to_string().ends_with("are required"));
    }

    #[test]
    fn ignores_geometry_input() {
        let columns = SimpleGeo
            .point_columns(
                PointSlot::ProjectArea,
                PointInput {
                    latitude: Some(1.5),
                    longitude: None,
                    geometry: Some(json!("not even geojson")),
                },
            )
            .unwrap();
        assert_eq!(columns.latitude, Some(1.5));
        assert_eq!(columns.longitude, None);
        assert_eq!(columns.geometry, None);
    }

    #[test]
    fn renders_flat_fields() {
        let mut properties = Map::new();
        properties.insert("name".into(), json!("Main St"));
        let value = SimpleGeo.render_point(
            PointSlot::ProjectArea,
            7,
            properties,
            &PointColumns {
                latitude: Some(1.0),
                longitude: Some(2.0),
                geometry: None,
            },
        );
        assert_eq!(value["id"], 7);
        assert_eq!(value["name"], "Main St");
        assert_eq!(value["latitude"], 1.0);
        assert_eq!(value["longitude"], 2.0);
        assert!(SimpleGeo.render_collection(vec![value]).is_array());
    }

    #[test]
    fn nearby_condition_filters_on_lat_lng_columns() {
        let query = NearbyQuery { lat: 1.0, lng: 2.0, radius_km: 10.0 };
        let sql = road_project::Entity::find()
            .filter(SimpleGeo.nearby_condition(&query))
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#""latitude" IS NOT NULL"#), "{sql}");
        assert!(sql.contains(r#""longitude" BETWEEN"#), "{sql}");
    }
}
