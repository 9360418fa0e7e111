use std::collections::HashMap;

use chrono::NaiveDate;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::fields::{budget_json, double_option, require_non_blank, timestamp_json, usernames, Budget};
use crate::entities::{
    project_assignment::{self, Entity as ProjectAssignment},
    road_project::{self, Priority, ProjectStatus},
};
use crate::error::AppResult;
use crate::geo::{GeoStrategy, PointColumns, PointInput, PointPatch, PointSlot};

pub const NAME_MAX_LEN: usize = 200;

/// Body of `POST /projects/` and `PUT /projects/{id}/`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProjectCreate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub priority: Priority,
    #[schema(value_type = Option<String>, example = "1500000.00")]
    pub budget: Option<Budget>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// GeoJSON Point, Polygon or MultiPolygon. Spatial mode only.
    #[schema(value_type = Option<Object>)]
    pub project_area: Option<Value>,
    #[serde(default)]
    pub assigned_to: Vec<i32>,
}

/// Body of `PATCH /projects/{id}/`. `null` clears budget, dates and location.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub budget: Option<Option<Budget>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub latitude: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub longitude: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Object>)]
    pub project_area: Option<Option<Value>>,
    pub assigned_to: Option<Vec<i32>>,
}

impl ProjectCreate {
    pub fn validate(&self) -> AppResult<()> {
        require_non_blank("name", &self.name, Some(NAME_MAX_LEN))
    }

    pub fn point(&self) -> PointInput {
        PointInput {
            latitude: self.latitude,
            longitude: self.longitude,
            geometry: self.project_area.clone(),
        }
    }

    /// Overwrites every writable column of `model`.
    pub fn apply(self, model: &mut road_project::ActiveModel, columns: PointColumns) {
        model.name = Set(self.name);
        model.description = Set(self.description);
        model.status = Set(self.status);
        model.priority = Set(self.priority);
        model.budget = Set(self.budget.map(|b| b.0));
        model.start_date = Set(self.start_date);
        model.end_date = Set(self.end_date);
        set_point(model, columns);
    }
}

impl ProjectPatch {
    pub fn validate(&self) -> AppResult<()> {
        match &self.name {
            Some(name) => require_non_blank("name", name, Some(NAME_MAX_LEN)),
            None => Ok(()),
        }
    }

    pub fn point(&self) -> PointPatch {
        PointPatch {
            latitude: self.latitude,
            longitude: self.longitude,
            geometry: self.project_area.clone(),
        }
    }

    pub fn apply(self, model: &mut road_project::ActiveModel, columns: PointColumns) {
        if let Some(name) = self.name {
            model.name = Set(name);
        }
        if let Some(description) = self.description {
            model.description = Set(description);
        }
        if let Some(status) = self.status {
            model.status = Set(status);
        }
        if let Some(priority) = self.priority {
            model.priority = Set(priority);
        }
        if let Some(budget) = self.budget {
            model.budget = Set(budget.map(|b| b.0));
        }
        if let Some(start_date) = self.start_date {
            model.start_date = Set(start_date);
        }
        if let Some(end_date) = self.end_date {
            model.end_date = Set(end_date);
        }
        set_point(model, columns);
    }
}

fn set_point(model: &mut road_project::ActiveModel, columns: PointColumns) {
    model.latitude = Set(columns.latitude);
    model.longitude = Set(columns.longitude);
    model.project_area = Set(columns.geometry);
}

pub fn stored_point(project: &road_project::Model) -> PointColumns {
    PointColumns {
        latitude: project.latitude,
        longitude: project.longitude,
        geometry: project.project_area.clone(),
    }
}

/// Sorted, deduplicated assignee ids.
pub fn normalize_assignees(mut ids: Vec<i32>) -> Vec<i32> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn project_json(
    geo: &dyn GeoStrategy,
    project: road_project::Model,
    assigned_to: Vec<i32>,
    names: &HashMap<i32, String>,
) -> Value {
    let assigned_to_names: Vec<Value> = assigned_to
        .iter()
        .filter_map(|id| names.get(id).cloned().map(Value::String))
        .collect();

    let mut properties = Map::new();
    properties.insert("name".into(), project.name.clone().into());
    properties.insert("description".into(), project.description.clone().into());
    properties.insert("status".into(), serde_json::to_value(project.status).unwrap_or(Value::Null));
    properties.insert("priority".into(), serde_json::to_value(project.priority).unwrap_or(Value::Null));
    properties.insert("budget".into(), budget_json(project.budget));
    properties.insert(
        "start_date".into(),
        project.start_date.map(|d| d.to_string()).into(),
    );
    properties.insert("end_date".into(), project.end_date.map(|d| d.to_string()).into());
    properties.insert("created_at".into(), timestamp_json(project.created_at));
    properties.insert("updated_at".into(), timestamp_json(project.updated_at));
    properties.insert("created_by".into(), project.created_by.into());
    properties.insert(
        "created_by_name".into(),
        names.get(&project.created_by).cloned().into(),
    );
    properties.insert("assigned_to".into(), assigned_to.into());
    properties.insert("assigned_to_names".into(), Value::Array(assigned_to_names));

    geo.render_point(PointSlot::ProjectArea, project.id, properties, &stored_point(&project))
}

/// Renders projects with their creators and assignees resolved, keeping order.
pub async fn render_projects<C: ConnectionTrait>(
    db: &C,
    geo: &dyn GeoStrategy,
    projects: Vec<road_project::Model>,
) -> AppResult<Vec<Value>> {
    if projects.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i32> = projects.iter().map(|p| p.id).collect();
    let rows = ProjectAssignment::find()
        .filter(project_assignment::Column::ProjectId.is_in(ids))
        .order_by_asc(project_assignment::Column::UserId)
        .all(db)
        .await?;

    let mut assigned: HashMap<i32, Vec<i32>> = HashMap::new();
    for row in rows {
        assigned.entry(row.project_id).or_default().push(row.user_id);
    }

    let mut user_ids: Vec<i32> = projects.iter().map(|p| p.created_by).collect();
    user_ids.extend(assigned.values().flatten().copied());
    let names = usernames(db, &normalize_assignees(user_ids)).await?;

    Ok(projects
        .into_iter()
        .map(|project| {
            let assignees = assigned.remove(&project.id).unwrap_or_default();
            project_json(geo, project, assignees, &names)
        })
        .collect())
}

pub async fn render_project<C: ConnectionTrait>(
    db: &C,
    geo: &dyn GeoStrategy,
    project: road_project::Model,
) -> AppResult<Value> {
    let mut rendered = render_projects(db, geo, vec![project]).await?;
    Ok(rendered.pop().unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{SimpleGeo, SpatialGeo};
    use serde_json::json;

    fn model() -> road_project::Model {
        let at = chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        road_project::Model {
            id: 3,
            name: "Route 9 resurfacing".into(),
            description: String::new(),
            status: ProjectStatus::InProgress,
            priority: Priority::High,
            budget: Some(sea_orm::prelude::Decimal::new(250000000, 2)),
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            end_date: None,
            latitude: Some(40.7),
            longitude: Some(-74.0),
            project_area: None,
            created_at: at,
            updated_at: at,
            created_by: 1,
        }
    }

    #[test]
    fn read_only_fields_are_ignored_on_input() {
        let body: ProjectCreate = serde_json::from_value(json!({
            "id": 99,
            "name": "New bridge",
            "created_by": 42,
            "created_at": "2000-01-01T00:00:00Z",
            "created_by_name": "mallory",
        }))
        .unwrap();

        assert_eq!(body.name, "New bridge");
        assert_eq!(body.status, ProjectStatus::Planned);
        assert_eq!(body.priority, Priority::Medium);
        assert!(body.assigned_to.is_empty());
    }

    #[test]
    fn rejects_unknown_enum_values() {
        let result = serde_json::from_value::<ProjectCreate>(json!({
            "name": "x",
            "status": "abandoned",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn renders_flat_project_and_reads_it_back() {
        let names = HashMap::from([(1, "alice".to_string()), (2, "bob".to_string())]);
        let value = project_json(&SimpleGeo, model(), vec![2], &names);

        assert_eq!(value["id"], 3);
        assert_eq!(value["status"], "in_progress");
        assert_eq!(value["budget"], "2500000.00");
        assert_eq!(value["start_date"], "2024-06-01");
        assert_eq!(value["end_date"], Value::Null);
        assert_eq!(value["created_by_name"], "alice");
        assert_eq!(value["assigned_to_names"], json!(["bob"]));
        assert_eq!(value["latitude"], 40.7);

        // The rendered project is a valid write body for the same project.
        let back: ProjectCreate = serde_json::from_value(value).unwrap();
        assert_eq!(back.name, "Route 9 resurfacing");
        assert_eq!(back.status, ProjectStatus::InProgress);
        assert_eq!(back.priority, Priority::High);
        assert_eq!(back.budget.map(|b| b.0), model().budget);
        assert_eq!(back.start_date, model().start_date);
        assert_eq!(back.latitude, Some(40.7));
        assert_eq!(back.longitude, Some(-74.0));
        assert_eq!(back.assigned_to, vec![2]);
    }

    #[test]
    fn renders_feature_in_spatial_mode() {
        let mut project = model();
        project.latitude = None;
        project.longitude = None;
        project.project_area = Some(json!({"type": "Point", "coordinates": [-74.0, 40.7]}));

        let value = project_json(&SpatialGeo, project, vec![], &HashMap::new());
        assert_eq!(value["type"], "Feature");
        assert_eq!(value["id"], 3);
        assert_eq!(value["geometry"]["type"], "Point");
        assert_eq!(value["properties"]["name"], "Route 9 resurfacing");
        assert!(value["properties"].get("latitude").is_none());
    }

    #[test]
    fn patch_distinguishes_cleared_budget() {
        let patch: ProjectPatch = serde_json::from_value(json!({"budget": null})).unwrap();
        assert_eq!(patch.budget, Some(None));
        assert_eq!(patch.start_date, None);
    }

    #[test]
    fn patch_distinguishes_cleared_location() {
        let patch: ProjectPatch =
            serde_json::from_value(json!({"latitude": null, "longitude": 4.5})).unwrap();
        assert_eq!(patch.latitude, Some(None));
        assert_eq!(patch.longitude, Some(Some(4.5)));
        assert_eq!(patch.project_area, None);
    }

    #[test]
    fn normalizes_assignees() {
        assert_eq!(normalize_assignees(vec![3, 1, 3, 2]), vec![1, 2, 3]);
    }
}
