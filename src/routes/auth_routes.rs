use axum::{
    Form, Json, Router,
    extract::State,
    routing::{get, post},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{generate_access_token, hash_access_token, hash_password, verify_password},
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AdminUserRow, AppState, LoginForm, OkResponse, SessionTokenRow, TokenResponse},
};

const MIN_PASSWORD_LEN: usize = 8;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/logout", post(logout))
        .route("/update-password", post(update_password))
}

fn validate_new_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/* ============================================================
   POST /api/auth/login  (form-encoded, OAuth2 password style)
   ============================================================ */

pub async fn login(
    State(state): State<AppState>,
    Form(req): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(ApiError::validation("username and password are required"));
    }

    let admin: AdminUserRow = sqlx::query_as::<_, AdminUserRow>(
        r#"
        SELECT admin_user_id, email, password_hash
        FROM admin_user
        WHERE email = $1
        "#,
    )
    .bind(username)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(ApiError::invalid_credentials)?;

    if !verify_password(&req.password, &admin.password_hash) {
        return Err(ApiError::invalid_credentials());
    }

    let access_token = generate_access_token();
    let token_hash = hash_access_token(&access_token);
    let expires_at = Utc::now() + Duration::hours(state.session_ttl_hours);

    let session: SessionTokenRow = sqlx::query_as::<_, SessionTokenRow>(
        r#"
        INSERT INTO session_token (admin_user_id, session_token_hash, expires_at)
        VALUES ($1, $2, $3)
        RETURNING session_token_id, expires_at
        "#,
    )
    .bind(admin.admin_user_id)
    .bind(&token_hash)
    .bind(expires_at)
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        expires_at: session.expires_at,
    }))
}

/* ============================================================
   GET /api/auth/me
   ============================================================ */

#[derive(Debug, Serialize)]
pub struct AdminOut {
    pub id: Uuid,
    pub email: String,
    pub session_expires_at: DateTime<Utc>,
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<AdminOut>, ApiError> {
    let admin: AdminUserRow = sqlx::query_as::<_, AdminUserRow>(
        r#"
        SELECT admin_user_id, email, password_hash
        FROM admin_user
        WHERE admin_user_id = $1
        "#,
    )
    .bind(auth.admin_user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(ApiError::session_expired)?;

    let session: SessionTokenRow = sqlx::query_as::<_, SessionTokenRow>(
        r#"
        SELECT session_token_id, expires_at
        FROM session_token
        WHERE session_token_id = $1
          AND revoked_at IS NULL
          AND expires_at > now()
        "#,
    )
    .bind(auth.session_token_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(ApiError::session_expired)?;

    Ok(Json(AdminOut {
        id: admin.admin_user_id,
        email: admin.email,
        session_expires_at: session.expires_at,
    }))
}

/* ============================================================
   POST /api/auth/logout
   ============================================================ */

pub async fn logout(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<OkResponse>, ApiError> {
    let rows = sqlx::query(
        r#"
        UPDATE session_token
        SET revoked_at = now()
        WHERE session_token_id = $1
          AND revoked_at IS NULL
        "#,
    )
    .bind(auth.session_token_id)
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    if rows.rows_affected() == 0 {
        return Err(ApiError::session_expired());
    }

    Ok(Json(OkResponse::new()))
}

/* ============================================================
   POST /api/auth/update-password
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

pub async fn update_password(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<UpdatePasswordRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    validate_new_password(&req.new_password)?;

    let admin: AdminUserRow = sqlx::query_as::<_, AdminUserRow>(
        r#"
        SELECT admin_user_id, email, password_hash
        FROM admin_user
        WHERE admin_user_id = $1
        "#,
    )
    .bind(auth.admin_user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(ApiError::session_expired)?;

    if !verify_password(&req.current_password, &admin.password_hash) {
        return Err(ApiError::invalid_credentials());
    }

    let new_hash = hash_password(&req.new_password).map_err(ApiError::Internal)?;

    sqlx::query(
        r#"
        UPDATE admin_user
        SET password_hash = $2
        WHERE admin_user_id = $1
        "#,
    )
    .bind(admin.admin_user_id)
    .bind(&new_hash)
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    // Changing the password invalidates every other session.
    sqlx::query(
        r#"
        UPDATE session_token
        SET revoked_at = now()
        WHERE admin_user_id = $1
          AND session_token_id <> $2
          AND revoked_at IS NULL
        "#,
    )
    .bind(admin.admin_user_id)
    .bind(auth.session_token_id)
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(OkResponse::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_new_password() {
        assert!(validate_new_password("longenough1").is_ok());
        assert!(validate_new_password("short").is_err());
        assert!(validate_new_password("").is_err());
    }
}
