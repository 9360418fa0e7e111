//! Geo representation strategy.
//!
//! A deployment stores locations in exactly one of two ways:
//!
//! * [`SimpleGeo`]: plain latitude/longitude columns, proximity by bounding box.
//! * [`SpatialGeo`]: GeoJSON geometries (SRID 4326) backed by PostGIS
//!   generated columns, proximity by `ST_DWithin`.
//!
//! The strategy is picked from [`GeoMode`] at startup and shared as
//! `Arc<dyn GeoStrategy>`. Everything outside this module only sees the
//! column carriers ([`PointColumns`], [`PathColumns`]) and the rendered JSON.

pub mod simple;
pub mod spatial;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{Condition, DatabaseConnection, DbErr};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};

pub use simple::{BoundingBox, SimpleGeo};
pub use spatial::SpatialGeo;

/// WGS84 latitude/longitude.
pub const SRID_WGS84: i32 = 4326;

pub const DEFAULT_RADIUS_KM: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoMode {
    Simple,
    Spatial,
}

impl FromStr for GeoMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(GeoMode::Simple),
            "spatial" => Ok(GeoMode::Spatial),
            other => Err(format!("unknown geo mode '{other}'")),
        }
    }
}

impl fmt::Display for GeoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoMode::Simple => f.write_str("simple"),
            GeoMode::Spatial => f.write_str("spatial"),
        }
    }
}

/// Which point-like field is being written or rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointSlot {
    /// `road_projects.project_area`, rendered as a Feature in spatial mode.
    ProjectArea,
    /// `project_photos.location`, rendered as a plain field.
    PhotoLocation,
}

impl PointSlot {
    pub fn field(self) -> &'static str {
        match self {
            PointSlot::ProjectArea => "project_area",
            PointSlot::PhotoLocation => "location",
        }
    }
}

pub const PATH_FIELD: &str = "centerline";

/// Raw point input as received from a client.
///
/// `geometry` stays untyped JSON so the simple strategy can ignore it without
/// rejecting values it never reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointInput {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geometry: Option<Value>,
}

impl PointInput {
    pub fn from_columns(columns: &PointColumns) -> Self {
        Self {
            latitude: columns.latitude,
            longitude: columns.longitude,
            geometry: columns.geometry.clone(),
        }
    }

    /// Applies a partial update on top of `self`.
    ///
    /// Scalars merge field by field and an explicit `null` clears one.
    /// Touching either scalar drops a stored geometry unless the patch brings
    /// its own.
    pub fn overlay(self, patch: PointPatch) -> Self {
        let touches_scalars = patch.latitude.is_some() || patch.longitude.is_some();
        let geometry = match patch.geometry {
            Some(geometry) => geometry,
            None if touches_scalars => None,
            None => self.geometry,
        };

        Self {
            latitude: patch.latitude.unwrap_or(self.latitude),
            longitude: patch.longitude.unwrap_or(self.longitude),
            geometry,
        }
    }
}

/// Point fields of a PATCH body: `None` when absent, `Some(None)` for `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointPatch {
    pub latitude: Option<Option<f64>>,
    pub longitude: Option<Option<f64>>,
    pub geometry: Option<Option<Value>>,
}

/// Raw path input: four scalars and/or a LineString geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathInput {
    pub start_latitude: Option<f64>,
    pub start_longitude: Option<f64>,
    pub end_latitude: Option<f64>,
    pub end_longitude: Option<f64>,
    pub geometry: Option<Value>,
}

impl PathInput {
    pub fn from_columns(columns: &PathColumns) -> Self {
        Self {
            start_latitude: columns.start_latitude,
            start_longitude: columns.start_longitude,
            end_latitude: columns.end_latitude,
            end_longitude: columns.end_longitude,
            geometry: columns.geometry.clone(),
        }
    }

    pub fn overlay(self, patch: PathInput) -> Self {
        let touches_scalars = patch.start_latitude.is_some()
            || patch.start_longitude.is_some()
            || patch.end_latitude.is_some()
            || patch.end_longitude.is_some();
        let geometry = match patch.geometry {
            Some(geometry) => Some(geometry),
            None if touches_scalars => None,
            None => self.geometry,
        };

        Self {
            start_latitude: patch.start_latitude.or(self.start_latitude),
            start_longitude: patch.start_longitude.or(self.start_longitude),
            end_latitude: patch.end_latitude.or(self.end_latitude),
            end_longitude: patch.end_longitude.or(self.end_longitude),
            geometry,
        }
    }

    fn scalars(&self) -> [(&'static str, Option<f64>); 4] {
        [
            ("start_latitude", self.start_latitude),
            ("start_longitude", self.start_longitude),
            ("end_latitude", self.end_latitude),
            ("end_longitude", self.end_longitude),
        ]
    }
}

/// Stored values of a point-like slot. Only one side is populated per mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointColumns {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geometry: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathColumns {
    pub start_latitude: Option<f64>,
    pub start_longitude: Option<f64>,
    pub end_latitude: Option<f64>,
    pub end_longitude: Option<f64>,
    pub geometry: Option<Value>,
}

/// Validated "nearby" request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius_km: f64,
}

impl NearbyQuery {
    /// Parses raw query-string values. Runs before any store access.
    pub fn parse(lat: Option<&str>, lng: Option<&str>, radius: Option<&str>) -> AppResult<Self> {
        fn present(v: Option<&str>) -> Option<&str> {
            v.map(str::trim).filter(|s| !s.is_empty())
        }

        let (Some(lat), Some(lng)) = (present(lat), present(lng)) else {
            return Err(AppError::MissingParameter(
                "lat and lng parameters are required".to_string(),
            ));
        };

        let radius_km = match radius {
            Some(raw) => parse_coordinate(raw)?,
            None => DEFAULT_RADIUS_KM,
        };

        Ok(Self {
            lat: parse_coordinate(lat)?,
            lng: parse_coordinate(lng)?,
            radius_km,
        })
    }
}

fn parse_coordinate(raw: &str) -> AppResult<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AppError::InvalidParameter("Invalid coordinates".to_string()))
}

#[async_trait]
pub trait GeoStrategy: Send + Sync {
    fn mode(&self) -> GeoMode;

    /// Installs whatever the store needs for this mode. Idempotent.
    async fn prepare(&self, db: &DatabaseConnection) -> Result<(), DbErr>;

    fn point_columns(&self, slot: PointSlot, input: PointInput) -> AppResult<PointColumns>;

    fn path_columns(&self, input: PathInput) -> AppResult<PathColumns>;

    /// Filter over `road_projects` selecting rows near the query point.
    fn nearby_condition(&self, query: &NearbyQuery) -> Condition;

    fn render_point(
        &self,
        slot: PointSlot,
        id: i32,
        properties: Map<String, Value>,
        columns: &PointColumns,
    ) -> Value;

    fn render_path(&self, id: i32, properties: Map<String, Value>, columns: &PathColumns) -> Value;

    /// Wraps rendered projects or segments into a list.
    fn render_collection(&self, items: Vec<Value>) -> Value;

    /// Flattens a Feature-shaped request body into plain fields.
    fn unwrap_feature(&self, body: Value, _geo_field: &str) -> Value {
        body
    }
}

pub fn strategy_for(mode: GeoMode) -> Arc<dyn GeoStrategy> {
    match mode {
        GeoMode::Simple => Arc::new(SimpleGeo),
        GeoMode::Spatial => Arc::new(SpatialGeo),
    }
}
