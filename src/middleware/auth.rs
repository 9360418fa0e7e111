use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde::Serialize;

use crate::entities::user;
use crate::error::AppError;
use crate::services::accounts;
use crate::state::AppState;

/// The acting user, inserted into request extensions by the middleware below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
}

impl From<&user::Model> for AuthUser {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

const SCHEMES: [&str; 2] = ["Token ", "Bearer "];

/// Extracts the raw token from `Authorization: Token <key>` or `Bearer <key>`.
pub fn presented_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    SCHEMES
        .iter()
        .find_map(|scheme| value.strip_prefix(scheme))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn authenticate_request(state: &AppState, headers: &HeaderMap) -> Result<Option<AuthUser>, AppError> {
    let Some(token) = presented_token(headers) else {
        return Ok(None);
    };

    match accounts::user_for_token(&state.db, token).await? {
        Some(user) => Ok(Some(AuthUser::from(&user))),
        None => {
            tracing::debug!("rejected unknown or inactive token");
            Err(AppError::Unauthorized("Invalid token.".to_string()))
        }
    }
}

/// Requires a valid token.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_user = authenticate_request(&state, req.headers())
        .await?
        .ok_or_else(|| {
            AppError::Unauthorized("Authentication credentials were not provided.".to_string())
        })?;

    req.extensions_mut().insert(auth_user);
    Ok(next.run(req).await)
}

/// Like [`require_auth`], but falls back to the anonymous actor when no token
/// is presented and anonymous writes are enabled. A bad token is still 401.
pub async fn resolve_actor(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_user = match authenticate_request(&state, req.headers()).await? {
        Some(user) => user,
        None => state.anonymous_actor.clone().ok_or_else(|| {
            AppError::Unauthorized("Authentication credentials were not provided.".to_string())
        })?,
    };

    req.extensions_mut().insert(auth_user);
    Ok(next.run(req).await)
}
