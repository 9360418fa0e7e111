use axum::{
    extract::State,
    http::HeaderMap,
    response::Json,
    Extension,
};
use axum_extra::extract::WithRejection;
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};

use crate::entities::user::Entity as User;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{presented_token, AuthUser};
use crate::services::accounts;
use crate::state::AppState;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    token: String,
    user_id: i32,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct LogoutResponse {
    message: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    error: String,
    code: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserProfile {
    user_id: i32,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    is_staff: bool,
    is_superuser: bool,
    date_joined: chrono::DateTime<chrono::Utc>,
}

#[utoipa::path(
    post,
    path = "/auth/login/",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Username or password missing", body = ErrorResponse),
        (status = 401, description = "Invalid credentials or disabled account", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<LoginRequest>, AppError>,
) -> AppResult<Json<LoginResponse>> {
    let present = |v: Option<String>| v.filter(|s| !s.is_empty());
    let (Some(username), Some(password)) = (present(payload.username), present(payload.password)) else {
        return Err(AppError::MissingParameter(
            "Username and password are required".to_string(),
        ));
    };

    let user = match accounts::authenticate(&state.db, &username, &password).await {
        Ok(user) => user,
        Err(e) => {
            tracing::info!(username = %username, reason = %e, "login rejected");
            return Err(e);
        }
    };
    let token = accounts::issue_token(&state.db, user.id).await?;

    tracing::info!(user_id = user.id, username = %user.username, "login");
    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        username: user.username,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
    }))
}

#[utoipa::path(
    post,
    path = "/auth/logout/",
    responses(
        (status = 200, description = "Token deleted, or there was nothing to delete", body = LogoutResponse)
    ),
    security((), ("token_auth" = [])),
    tag = "Authentication"
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<LogoutResponse>> {
    let revoked = match presented_token(&headers) {
        Some(token) => accounts::revoke_token(&state.db, token).await?,
        None => false,
    };

    let message = if revoked {
        tracing::info!("token revoked");
        "Successfully logged out"
    } else {
        "Already logged out"
    };
    Ok(Json(LogoutResponse {
        message: message.to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/auth/user/",
    responses(
        (status = 200, description = "Profile of the token owner", body = UserProfile),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("token_auth" = [])),
    tag = "Authentication"
)]
pub async fn user_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<UserProfile>> {
    let user = User::find_by_id(auth_user.id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    Ok(Json(UserProfile {
        user_id: user.id,
        username: user.username,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        is_staff: user.is_staff,
        is_superuser: user.is_superuser,
        date_joined: user.date_joined.and_utc(),
    }))
}
