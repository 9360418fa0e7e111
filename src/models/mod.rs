//! Transfer layer: write payloads and JSON rendering for each entity kind.
//!
//! Rendering goes through the active [`GeoStrategy`](crate::geo::GeoStrategy),
//! so the same entity renders as flat fields or as a GeoJSON Feature.

pub mod fields;
pub mod photo;
pub mod project;
pub mod segment;
pub mod update;
