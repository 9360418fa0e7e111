use async_trait::async_trait;
use geojson::{feature::Id, Feature, Geometry, Value as GeoValue};
use sea_orm::{
    sea_query::Expr, ConnectionTrait, Condition, DatabaseConnection, DbBackend, DbErr,
};
use serde_json::{json, Map, Value};

use super::{
    GeoMode, GeoStrategy, NearbyQuery, PathColumns, PathInput, PointColumns, PointInput, PointSlot,
    PATH_FIELD, SRID_WGS84,
};
use crate::error::{AppError, AppResult};

/// GeoJSON source column and the PostGIS column generated from it.
const GEOMETRY_COLUMNS: [(&str, &str, &str); 3] = [
    ("road_projects", "project_area", "project_area_geom"),
    ("road_segments", "centerline", "centerline_geom"),
    ("project_photos", "location", "location_geom"),
];

const PROJECT_AREA_GEOM: &str = "project_area_geom";

#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialGeo;

impl SpatialGeo {
    fn parse_geometry(field: &str, value: Value) -> AppResult<Geometry> {
        serde_json::from_value::<Geometry>(value)
            .map_err(|e| AppError::Validation(format!("{field}: invalid GeoJSON geometry ({e})")))
    }

    fn point(lat: f64, lng: f64) -> Geometry {
        Geometry::new(GeoValue::Point(vec![lng, lat]))
    }

    fn to_json(geometry: &Geometry) -> AppResult<Value> {
        serde_json::to_value(geometry).map_err(|e| AppError::Internal(e.to_string()))
    }

    /// Stored GeoJSON back into a typed geometry. Rows written by this
    /// strategy always parse; anything else renders as `null`.
    fn stored_geometry(value: &Option<Value>) -> Option<Geometry> {
        let value = value.as_ref()?;
        match serde_json::from_value::<Geometry>(value.clone()) {
            Ok(geometry) => Some(geometry),
            Err(e) => {
                tracing::warn!(error = %e, "stored geometry is not valid GeoJSON");
                None
            }
        }
    }

    fn feature(id: i32, geometry: Option<Geometry>, properties: Map<String, Value>) -> Value {
        let feature = Feature {
            bbox: None,
            geometry,
            id: Some(Id::Number(id.into())),
            properties: Some(properties),
            foreign_members: None,
        };
        serde_json::to_value(feature).unwrap_or(Value::Null)
    }
}

fn check_position(field: &str, position: &[f64]) -> AppResult<()> {
    let [lng, lat, ..] = position else {
        return Err(AppError::Validation(format!(
            "{field}: positions need longitude and latitude"
        )));
    };
    if !(-180.0..=180.0).contains(lng) || !(-90.0..=90.0).contains(lat) {
        return Err(AppError::Validation(format!(
            "{field}: position [{lng}, {lat}] is outside WGS84 bounds"
        )));
    }
    Ok(())
}

fn check_ring(field: &str, ring: &[Vec<f64>]) -> AppResult<()> {
    if ring.len() < 4 || ring.first() != ring.last() {
        return Err(AppError::Validation(format!(
            "{field}: polygon rings must be closed and have at least four positions"
        )));
    }
    ring.iter().try_for_each(|p| check_position(field, p))
}

fn kind(value: &GeoValue) -> &'static str {
    match value {
        GeoValue::Point(_) => "Point",
        GeoValue::MultiPoint(_) => "MultiPoint",
        GeoValue::LineString(_) => "LineString",
        GeoValue::MultiLineString(_) => "MultiLineString",
        GeoValue::Polygon(_) => "Polygon",
        GeoValue::MultiPolygon(_) => "MultiPolygon",
        GeoValue::GeometryCollection(_) => "GeometryCollection",
    }
}

fn check_geometry(field: &str, allowed: &[&str], geometry: &Geometry) -> AppResult<()> {
    let kind = kind(&geometry.value);
    if !allowed.contains(&kind) {
        return Err(AppError::Validation(format!(
            "{field}: expected {}, got {kind}",
            allowed.join(" or ")
        )));
    }

    match &geometry.value {
        GeoValue::Point(position) => check_position(field, position),
        GeoValue::LineString(line) => {
            if line.len() < 2 {
                return Err(AppError::Validation(format!(
                    "{field}: a LineString needs at least two positions"
                )));
            }
            line.iter().try_for_each(|p| check_position(field, p))
        }
        GeoValue::Polygon(rings) => rings.iter().try_for_each(|r| check_ring(field, r)),
        GeoValue::MultiPolygon(polygons) => polygons
            .iter()
            .flatten()
            .try_for_each(|r| check_ring(field, r)),
        _ => Ok(()),
    }
}

fn allowed_kinds(slot: PointSlot) -> &'static [&'static str] {
    match slot {
        PointSlot::ProjectArea => &["Point", "Polygon", "MultiPolygon"],
        PointSlot::PhotoLocation => &["Point"],
    }
}

#[async_trait]
impl GeoStrategy for SpatialGeo {
    fn mode(&self) -> GeoMode {
        GeoMode::Spatial
    }

    async fn prepare(&self, db: &DatabaseConnection) -> Result<(), DbErr> {
        if db.get_database_backend() != DbBackend::Postgres {
            return Err(DbErr::Custom(
                "spatial geo mode requires PostgreSQL with PostGIS".to_string(),
            ));
        }

        db.execute_unprepared("CREATE EXTENSION IF NOT EXISTS postgis").await?;

        for (table, source, generated) in GEOMETRY_COLUMNS {
            db.execute_unprepared(&format!(
                "ALTER TABLE {table} ADD COLUMN IF NOT EXISTS {generated} \
                 geometry(Geometry, {SRID_WGS84}) GENERATED ALWAYS AS \
                 (ST_SetSRID(ST_GeomFromGeoJSON({source}::text), {SRID_WGS84})) STORED"
            ))
            .await?;
            db.execute_unprepared(&format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_{generated} ON {table} USING GIST ({generated})"
            ))
            .await?;
        }

        tracing::info!(srid = SRID_WGS84, "spatial geo mode: PostGIS geometry columns ready");
        Ok(())
    }

    fn point_columns(&self, slot: PointSlot, input: PointInput) -> AppResult<PointColumns> {
        let field = slot.field();

        let geometry = match (input.geometry, input.latitude, input.longitude) {
            (Some(raw), _, _) => {
                let geometry = Self::parse_geometry(field, raw)?;
                check_geometry(field, allowed_kinds(slot), &geometry)?;
                Some(geometry)
            }
            (None, Some(lat), Some(lng)) => {
                let geometry = Self::point(lat, lng);
                check_geometry(field, allowed_kinds(slot), &geometry)?;
                Some(geometry)
            }
            (None, None, None) => None,
            (None, _, _) => {
                return Err(AppError::Validation(
                    "latitude and longitude must be given together".to_string(),
                ))
            }
        };

        Ok(PointColumns {
            latitude: None,
            longitude: None,
            geometry: geometry.as_ref().map(Self::to_json).transpose()?,
        })
    }

    fn path_columns(&self, input: PathInput) -> AppResult<PathColumns> {
        let geometry = match input.geometry {
            Some(raw) => Self::parse_geometry(PATH_FIELD, raw)?,
            None => match (
                input.start_latitude,
                input.start_longitude,
                input.end_latitude,
                input.end_longitude,
            ) {
                (Some(slat), Some(slng), Some(elat), Some(elng)) => {
                    Geometry::new(GeoValue::LineString(vec![vec![slng, slat], vec![elng, elat]]))
                }
                _ => {
                    return Err(AppError::Validation(format!(
                        "{PATH_FIELD} is required (a LineString or start/end coordinates)"
                    )))
                }
            },
        };
        check_geometry(PATH_FIELD, &["LineString"], &geometry)?;

        Ok(PathColumns {
            geometry: Some(Self::to_json(&geometry)?),
            ..Default::default()
        })
    }

    fn nearby_condition(&self, query: &NearbyQuery) -> Condition {
        let radius_m = query.radius_km * 1000.0;

        Condition::all().add(Expr::cust_with_values(
            format!(
                "ST_DWithin({PROJECT_AREA_GEOM}::geography, \
                 ST_SetSRID(ST_MakePoint($1, $2), {SRID_WGS84})::geography, $3)"
            ),
            [query.lng, query.lat, radius_m],
        ))
    }

    fn render_point(
        &self,
        slot: PointSlot,
        id: i32,
        mut properties: Map<String, Value>,
        columns: &PointColumns,
    ) -> Value {
        let geometry = Self::stored_geometry(&columns.geometry);
        match slot {
            PointSlot::ProjectArea => Self::feature(id, geometry, properties),
            PointSlot::PhotoLocation => {
                properties.insert("id".into(), id.into());
                properties.insert(
                    slot.field().into(),
                    geometry
                        .and_then(|g| serde_json::to_value(g).ok())
                        .unwrap_or(Value::Null),
                );
                Value::Object(properties)
            }
        }
    }

    fn render_path(&self, id: i32, properties: Map<String, Value>, columns: &PathColumns) -> Value {
        Self::feature(id, Self::stored_geometry(&columns.geometry), properties)
    }

    fn render_collection(&self, items: Vec<Value>) -> Value {
        json!({
            "type": "FeatureCollection",
            "features": items,
        })
    }

    fn unwrap_feature(&self, body: Value, geo_field: &str) -> Value {
        let Value::Object(mut object) = body else {
            return body;
        };
        if object.get("type").and_then(Value::as_str) != Some("Feature") {
            return Value::Object(object);
        }

        let mut flat = match object.remove("properties") {
            Some(Value::Object(properties)) => properties,
            _ => Map::new(),
        };
        if let Some(geometry) = object.remove("geometry") {
            if !geometry.is_null() {
                flat.insert(geo_field.to_string(), geometry);
            }
        }
        Value::Object(flat)
    }
}
