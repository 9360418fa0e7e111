use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "road_projects")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub status: ProjectStatus,
    pub priority: Priority,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub budget: Option<Decimal>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub project_area: Option<Json>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub created_by: i32,
}

#[derive(EnumIter, DeriveActiveEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    #[sea_orm(string_value = "planned")]
    Planned,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "on_hold")]
    OnHold,
}

#[derive(EnumIter, DeriveActiveEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[sea_orm(string_value = "low")]
    Low,
    #[default]
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "critical")]
    Critical,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Creator,
    #[sea_orm(has_many = "super::road_segment::Entity")]
    RoadSegment,
    #[sea_orm(has_many = "super::project_photo::Entity")]
    ProjectPhoto,
    #[sea_orm(has_many = "super::project_update::Entity")]
    ProjectUpdate,
    #[sea_orm(has_many = "super::project_assignment::Entity")]
    ProjectAssignment,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Creator.def()
    }
}

impl Related<super::road_segment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RoadSegment.def()
    }
}

impl Related<super::project_photo::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProjectPhoto.def()
    }
}

impl Related<super::project_update::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProjectUpdate.def()
    }
}

impl Related<super::project_assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProjectAssignment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
