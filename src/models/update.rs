use std::collections::HashMap;

use sea_orm::{ActiveValue::Set, ConnectionTrait};
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

use super::fields::{require_non_blank, timestamp_json, usernames};
use crate::entities::project_update;
use crate::error::AppResult;

/// Body of `POST /updates/` and `PUT /updates/{id}/`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateCreate {
    pub project: i32,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdatePatch {
    pub project: Option<i32>,
    pub title: Option<String>,
    pub content: Option<String>,
}

impl UpdateCreate {
    pub fn validate(&self) -> AppResult<()> {
        require_non_blank("title", &self.title, Some(200))?;
        require_non_blank("content", &self.content, None)
    }

    pub fn apply(self, model: &mut project_update::ActiveModel) {
        model.project_id = Set(self.project);
        model.title = Set(self.title);
        model.content = Set(self.content);
    }
}

impl UpdatePatch {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(title) = &self.title {
            require_non_blank("title", title, Some(200))?;
        }
        if let Some(content) = &self.content {
            require_non_blank("content", content, None)?;
        }
        Ok(())
    }

    pub fn apply(self, model: &mut project_update::ActiveModel) {
        if let Some(project) = self.project {
            model.project_id = Set(project);
        }
        if let Some(title) = self.title {
            model.title = Set(title);
        }
        if let Some(content) = self.content {
            model.content = Set(content);
        }
    }
}

fn update_json(update: project_update::Model, names: &HashMap<i32, String>) -> Value {
    json!({
        "id": update.id,
        "project": update.project_id,
        "title": update.title,
        "content": update.content,
        "created_at": timestamp_json(update.created_at),
        "created_by": update.created_by,
        "created_by_name": names.get(&update.created_by),
    })
}

pub async fn render_updates<C: ConnectionTrait>(
    db: &C,
    updates: Vec<project_update::Model>,
) -> AppResult<Vec<Value>> {
    let mut author_ids: Vec<i32> = updates.iter().map(|u| u.created_by).collect();
    author_ids.sort_unstable();
    author_ids.dedup();
    let names = usernames(db, &author_ids).await?;

    Ok(updates.into_iter().map(|u| update_json(u, &names)).collect())
}

pub async fn render_update<C: ConnectionTrait>(db: &C, update: project_update::Model) -> AppResult<Value> {
    let mut rendered = render_updates(db, vec![update]).await?;
    Ok(rendered.pop().unwrap_or(Value::Null))
}
