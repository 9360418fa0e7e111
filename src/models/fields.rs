//! Field-level helpers shared by the write payloads.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use sea_orm::{prelude::Decimal, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::entities::{
    road_project::Entity as RoadProject,
    user::{self, Entity as User},
};
use crate::error::{AppError, AppResult};

const BUDGET_MAX_DIGITS: usize = 12;
const BUDGET_DECIMAL_PLACES: u32 = 2;

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`). Use with `#[serde(default, deserialize_with = ...)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Project budget: at most 12 digits, 2 of them after the point.
/// Accepts a JSON number or a numeric string; serializes as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget(pub Decimal);

impl Budget {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let value = Decimal::from_str(raw.trim()).map_err(|_| "A valid number is required.".to_string())?;

        if value.scale() > BUDGET_DECIMAL_PLACES {
            return Err(format!(
                "Ensure that there are no more than {BUDGET_DECIMAL_PLACES} decimal places."
            ));
        }

        let whole_digits = value.abs().trunc().to_string().len();
        let max_whole = BUDGET_MAX_DIGITS - BUDGET_DECIMAL_PLACES as usize;
        if whole_digits > max_whole {
            return Err(format!(
                "Ensure that there are no more than {max_whole} digits before the decimal point."
            ));
        }

        Ok(Budget(value))
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<'de> Deserialize<'de> for Budget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        let raw = match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text,
            Raw::Number(number) => number.to_string(),
        };
        Budget::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Budget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format_args!("{:.2}", self.0))
    }
}

/// Renders a stored budget with two decimal places.
pub fn budget_json(budget: Option<Decimal>) -> Value {
    match budget {
        Some(value) => Value::String(format!("{value:.2}")),
        None => Value::Null,
    }
}

/// Timestamps render as RFC 3339 in UTC with microseconds.
pub fn timestamp_json(value: chrono::NaiveDateTime) -> Value {
    Value::String(
        value
            .and_utc()
            .to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
    )
}

/// Deserializes a write payload, mapping serde errors to a validation error.
pub fn from_body<T: DeserializeOwned>(body: Value) -> AppResult<T> {
    serde_json::from_value(body).map_err(|e| AppError::Validation(e.to_string()))
}

pub fn require_non_blank(field: &str, value: &str, max_len: Option<usize>) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field}: This field may not be blank.")));
    }
    if let Some(max) = max_len {
        if value.chars().count() > max {
            return Err(AppError::Validation(format!(
                "{field}: Ensure this field has no more than {max} characters."
            )));
        }
    }
    Ok(())
}

pub fn invalid_pk(id: i32) -> AppError {
    AppError::Validation(format!("Invalid pk \"{id}\" - object does not exist."))
}

/// Checks a write body's `project` reference.
pub async fn ensure_project_exists<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<()> {
    match RoadProject::find_by_id(id).one(db).await? {
        Some(_) => Ok(()),
        None => Err(invalid_pk(id)),
    }
}

/// Resolves user ids to usernames in one query.
pub async fn usernames<C: ConnectionTrait>(db: &C, ids: &[i32]) -> AppResult<HashMap<i32, String>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users = User::find()
        .filter(user::Column::Id.is_in(ids.iter().copied()))
        .all(db)
        .await?;

    Ok(users.into_iter().map(|u| (u.id, u.username)).collect())
}

/// Checks every id names an existing user.
pub async fn ensure_users_exist<C: ConnectionTrait>(db: &C, ids: &[i32]) -> AppResult<()> {
    let known = usernames(db, ids).await?;
    match ids.iter().find(|id| !known.contains_key(id)) {
        Some(missing) => Err(invalid_pk(*missing)),
        None => Ok(()),
    }
}
