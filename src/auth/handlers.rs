use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::middleware::AuthUser;
use super::types::*;
use crate::db::{AccessToken, AccessTokenRepo, DbError, User, UserRepo};
use crate::error::ApiError;
use crate::server::AppState;

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid credentials".to_string())
}

fn parse_credentials(
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Credentials, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    Ok(req)
}

fn check_credentials(req: &Credentials) -> Result<&str, ApiError> {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "Username and password are required".to_string(),
        ));
    }
    Ok(username)
}

async fn issue_token(state: &AppState, user: &User) -> Result<AuthResponse, ApiError> {
    let token = AccessToken::new(&user.id);
    state.db.upsert_token(&token).await?;

    Ok(AuthResponse {
        token: token.token,
        user_id: user.id.clone(),
        username: user.username.clone(),
    })
}

pub async fn signup(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    if !state.config.auth.allow_signup {
        return Err(ApiError::Forbidden("Signup is disabled".to_string()));
    }
    let req = parse_credentials(body)?;
    let username = check_credentials(&req)?.to_string();

    let cost = state.config.auth.bcrypt_cost;
    let password = req.password;
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::Storage(Box::new(e)))?
        .map_err(DbError::from)?;

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        username,
        password: hash,
        created: Some(chrono::Utc::now()),
        lastlogin: Some(chrono::Utc::now()),
    };

    match state.db.create_user(&user).await {
        Ok(()) => {}
        Err(DbError::AlreadyExists(_)) => {
            return Err(ApiError::Conflict("Username already exists".to_string()))
        }
        Err(e) => return Err(e.into()),
    }

    info!(user_id = %user.id, username = %user.username, "User registered");

    let response = issue_token(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let req = parse_credentials(body)?;
    let username = check_credentials(&req)?;

    let user = match state.db.get_user(username).await {
        Ok(user) => user,
        Err(DbError::NotFound(_)) => {
            warn!(username, "Login for unknown user");
            return Err(invalid_credentials());
        }
        Err(e) => return Err(e.into()),
    };

    let password = req.password.clone();
    let hash = user.password.clone();
    let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| ApiError::Storage(Box::new(e)))?
        .map_err(DbError::from)?;

    if !valid {
        warn!(username, "Login with wrong password");
        return Err(invalid_credentials());
    }

    state.db.update_last_login(&user.id).await?;
    info!(user_id = %user.id, "User logged in");

    Ok(Json(issue_token(&state, &user).await?))
}

pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    state.db.delete_token(&auth.token).await?;
    info!(user_id = %auth.user_id, "User logged out");
    Ok(Json(json!({ "message": "Logged out" })))
}
