//! Registration, login, and bearer-token authentication.
//!
//! Passwords are hashed with bcrypt. Logging in mints a random
//! 32-character hex token held in the in-memory session map; protected
//! endpoints validate `Authorization: Bearer <token>` against it.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

/// Username of the authenticated caller, inserted by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

#[derive(Debug, Deserialize)]
pub struct CredentialsBody {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub username: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
}

/// Generate a random 32-character hex token.
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    hex::encode(bytes)
}

/// POST /register - create a new user account.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<CredentialsBody>,
) -> Result<Json<RegisterResponse>, ApiError> {
    if body.username.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }

    let hash = bcrypt::hash(&body.password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))?;

    // A duplicate username surfaces as 409.
    state.users.create(&body.username, &hash)?;

    info!(username = %body.username, "User registered");
    Ok(Json(RegisterResponse {
        username: body.username,
        message: "User registered successfully".to_string(),
    }))
}

/// POST /login - verify credentials and mint a session token.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<CredentialsBody>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .users
        .find(&body.username)?
        .ok_or_else(|| ApiError::NotFound(format!("User '{}' not found", body.username)))?;

    let valid = bcrypt::verify(&body.password, &user.password_hash)
        .map_err(|e| ApiError::Internal(format!("Password verification failed: {}", e)))?;
    if !valid {
        return Err(ApiError::Unauthorized("Invalid password".to_string()));
    }

    let token = generate_token();
    state.insert_session(token.clone(), user.username.clone());

    info!(username = %user.username, "User logged in");
    Ok(Json(LoginResponse {
        token,
        username: user.username,
    }))
}

/// Middleware that validates bearer-token authentication.
///
/// Resolves the token to a username and makes it available to handlers
/// as an [`AuthUser`] extension. Returns 401 if missing or invalid.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let auth_header = req.headers().get("authorization");

    let Some(value) = auth_header else {
        return unauthorized("Missing Authorization header");
    };

    let value_str = match value.to_str() {
        Ok(s) => s,
        Err(_) => return unauthorized("Invalid Authorization header encoding"),
    };

    let Some(token) = value_str.strip_prefix("Bearer ") else {
        return unauthorized("Invalid bearer token");
    };

    match state.session_user(token) {
        Some(username) => {
            req.extensions_mut().insert(AuthUser(username));
            next.run(req).await
        }
        None => unauthorized("Invalid bearer token"),
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "unauthorized",
            "message": message
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_format() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_token_unique() {
        assert_ne!(generate_token(), generate_token());
    }
}
