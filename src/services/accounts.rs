//! Users, password hashes and opaque API tokens.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose, Engine as _};
use rand::RngCore;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use sha2::{Digest, Sha256};

use crate::entities::{
    auth_token::{self, Entity as AuthToken},
    user::{self, Entity as User},
};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hash error: {e}")))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is unreadable");
            false
        }
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub async fn create_user<C: ConnectionTrait>(db: &C, new_user: NewUser) -> AppResult<user::Model> {
    if new_user.username.trim().is_empty() {
        return Err(AppError::Validation("username is required".to_string()));
    }

    let existing = User::find()
        .filter(user::Column::Username.eq(&new_user.username))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Validation(format!(
            "user '{}' already exists",
            new_user.username
        )));
    }

    let user = user::ActiveModel {
        username: Set(new_user.username),
        password: Set(hash_password(&new_user.password)?),
        email: Set(new_user.email),
        first_name: Set(new_user.first_name),
        last_name: Set(new_user.last_name),
        is_active: Set(true),
        is_staff: Set(new_user.is_staff),
        is_superuser: Set(new_user.is_superuser),
        date_joined: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    };

    Ok(user.insert(db).await?)
}

/// Checks credentials. A correct password on an inactive account is reported
/// as [`AppError::DisabledAccount`].
pub async fn authenticate<C: ConnectionTrait>(
    db: &C,
    username: &str,
    password: &str,
) -> AppResult<user::Model> {
    let user = User::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(password, &user.password) {
        return Err(AppError::InvalidCredentials);
    }
    if !user.is_active {
        return Err(AppError::DisabledAccount);
    }
    Ok(user)
}

/// Issues a fresh token, replacing any the user already holds. Only its hash
/// is stored.
pub async fn issue_token<C>(db: &C, user_id: i32) -> AppResult<String>
where
    C: ConnectionTrait + TransactionTrait,
{
    let token = generate_token();

    let txn = db.begin().await?;
    let replaced = AuthToken::delete_many()
        .filter(auth_token::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?
        .rows_affected;
    auth_token::ActiveModel {
        user_id: Set(user_id),
        token_hash: Set(hash_token(&token)),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    if replaced > 0 {
        tracing::debug!(user_id, replaced, "previous token rotated out");
    }
    Ok(token)
}

/// Resolves a presented token to its active owner.
pub async fn user_for_token<C: ConnectionTrait>(db: &C, token: &str) -> AppResult<Option<user::Model>> {
    let found = AuthToken::find()
        .filter(auth_token::Column::TokenHash.eq(hash_token(token)))
        .find_also_related(User)
        .one(db)
        .await?;

    Ok(found
        .and_then(|(_, user)| user)
        .filter(|user| user.is_active))
}

/// Returns whether a token row was removed.
pub async fn revoke_token<C: ConnectionTrait>(db: &C, token: &str) -> AppResult<bool> {
    let result = AuthToken::delete_many()
        .filter(auth_token::Column::TokenHash.eq(hash_token(token)))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Looks up the configured anonymous actor, creating it on first start.
pub async fn ensure_user<C: ConnectionTrait>(db: &C, username: &str) -> AppResult<user::Model> {
    let existing = User::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?;
    if let Some(user) = existing {
        return Ok(user);
    }

    // Unusable password: the anonymous actor never logs in.
    create_user(
        db,
        NewUser {
            username: username.to_string(),
            password: generate_token(),
            email: format!("{username}@example.com"),
            first_name: "POC".to_string(),
            last_name: "User".to_string(),
            ..Default::default()
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("s3cret!").unwrap();
        assert!(verify_password("s3cret!", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("s3cret!", "not-a-phc-string"));
    }

    #[test]
    fn tokens_are_random_and_hashed() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert_eq!(hash_token(&a), hash_token(&a));
        assert_eq!(hash_token(&a).len(), 64);
    }
}
