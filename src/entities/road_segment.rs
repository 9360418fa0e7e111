use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "road_segments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub project_id: i32,
    pub name: String,
    pub road_type: RoadType,
    pub surface_type: SurfaceType,
    pub length_km: f64,
    pub width_m: f64,
    pub start_latitude: Option<f64>,
    pub start_longitude: Option<f64>,
    pub end_latitude: Option<f64>,
    pub end_longitude: Option<f64>,
    pub centerline: Option<Json>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(EnumIter, DeriveActiveEnum, Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum RoadType {
    #[sea_orm(string_value = "highway")]
    Highway,
    #[sea_orm(string_value = "arterial")]
    Arterial,
    #[sea_orm(string_value = "collector")]
    Collector,
    #[sea_orm(string_value = "local")]
    Local,
}

#[derive(EnumIter, DeriveActiveEnum, Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum SurfaceType {
    #[sea_orm(string_value = "asphalt")]
    Asphalt,
    #[sea_orm(string_value = "concrete")]
    Concrete,
    #[sea_orm(string_value = "gravel")]
    Gravel,
    #[sea_orm(string_value = "dirt")]
    Dirt,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::road_project::Entity",
        from = "Column::ProjectId",
        to = "super::road_project::Column::Id",
        on_delete = "Cascade"
    )]
    Project,
}

impl Related<super::road_project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
