//! `/auth` endpoints.
//!
//! ```text
//! register / login ──► access token in body, refresh token in cookie
//!                      refresh token also stored on the user row
//!
//! refresh ──► cookie token valid? ──► equals stored? ──► rotate, new pair
//!                     │                     │
//!                     └── 401 ◄─────────────┘  (replayed or revoked)
//!
//! logout / change-password ──► stored token cleared
//! ```

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post, put};
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use farmgate_core::validation::validate_password;
use farmgate_core::User;
use farmgate_db::NewUser;

use crate::auth::password::{spawn_hash, spawn_verify};
use crate::auth::{
    clear_refresh_cookie, read_refresh_cookie, refresh_cookie, set_cookie_header, CurrentUser,
    TokenPair,
};
use crate::error::{ApiError, ApiJson, ApiResponse, FieldError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me).put(update_me))
        .route("/auth/change-password", put(change_password))
}

// =============================================================================
// Request / Response Bodies
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Body returned by register, login and refresh. The refresh token only
/// travels in the cookie.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user: User,
    pub access_token: String,
    pub expires_in: i64,
}

type SessionResponse = Result<(HeaderMap, ApiResponse<AuthSession>), ApiError>;

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid email or password".to_string())
}

/// Issues a pair, stores the refresh token and builds the cookie header.
async fn start_session(state: &AppState, user: &User) -> Result<(HeaderMap, TokenPair), ApiError> {
    let pair = state.jwt.issue_pair(user)?;
    state
        .db
        .users()
        .set_refresh_token(&user.id, Some(&pair.refresh_token))
        .await?;

    let cookie = refresh_cookie(
        &pair.refresh_token,
        state.jwt.refresh_lifetime_secs(),
        state.config.cookie_secure,
    );
    Ok((set_cookie_header(&cookie), pair))
}

fn session(user: User, pair: TokenPair) -> AuthSession {
    AuthSession {
        user,
        access_token: pair.access_token,
        expires_in: pair.expires_in,
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> SessionResponse {
    validate_password(&body.password)?;
    let password_hash = spawn_hash(body.password).await?;

    let user = state
        .db
        .users()
        .create(NewUser {
            email: body.email,
            name: body.name,
            phone: body.phone,
            password_hash,
        })
        .await?;

    let (headers, pair) = start_session(&state, &user).await?;
    Ok((
        headers,
        ApiResponse::created("Registration successful", session(user, pair)),
    ))
}

async fn login(State(state): State<AppState>, ApiJson(body): ApiJson<LoginRequest>) -> SessionResponse {
    let users = state.db.users();

    let credentials = users.find_credentials(&body.email).await?;
    let stored = credentials.as_ref().map(|c| c.password_hash.clone());
    let verified = spawn_verify(body.password, stored).await?;

    let credentials = match credentials {
        Some(credentials) if verified => credentials,
        Some(credentials) => {
            warn!(user_id = %credentials.user.id, "Login with wrong password");
            return Err(invalid_credentials());
        }
        None => {
            warn!(email = %body.email, "Login for unknown email");
            return Err(invalid_credentials());
        }
    };

    users.touch_last_login(&credentials.user.id).await?;
    let (headers, pair) = start_session(&state, &credentials.user).await?;

    info!(user_id = %credentials.user.id, "User logged in");
    Ok((headers, ApiResponse::ok("Login successful", session(credentials.user, pair))))
}

async fn refresh(State(state): State<AppState>, request_headers: HeaderMap) -> SessionResponse {
    let presented = read_refresh_cookie(&request_headers)
        .ok_or_else(|| ApiError::Unauthorized("Refresh token missing".to_string()))?;
    let claims = state.jwt.validate_refresh_token(&presented)?;

    let users = state.db.users();
    let user = users
        .get_by_id(&claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid token".to_string()))?;

    // Fresh claims so a reviewed classification shows up in the new token.
    let pair = state.jwt.issue_pair(&user)?;
    if !users
        .rotate_refresh_token(&user.id, &presented, &pair.refresh_token)
        .await?
    {
        warn!(user_id = %user.id, "Refresh token does not match the stored session");
        return Err(ApiError::Unauthorized("Refresh token revoked".to_string()));
    }

    let cookie = refresh_cookie(
        &pair.refresh_token,
        state.jwt.refresh_lifetime_secs(),
        state.config.cookie_secure,
    );
    Ok((
        set_cookie_header(&cookie),
        ApiResponse::ok("Token refreshed", session(user, pair)),
    ))
}

async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<(HeaderMap, ApiResponse<()>), ApiError> {
    state.db.users().set_refresh_token(&user.id, None).await?;
    info!(user_id = %user.id, "User logged out");

    let cookie = clear_refresh_cookie(state.config.cookie_secure);
    Ok((set_cookie_header(&cookie), ApiResponse::message("Logged out")))
}

async fn me(State(state): State<AppState>, user: CurrentUser) -> Result<ApiResponse<User>, ApiError> {
    let profile = state
        .db
        .users()
        .get_by_id(&user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    Ok(ApiResponse::ok("Profile retrieved", profile))
}

async fn update_me(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<UpdateProfileRequest>,
) -> Result<ApiResponse<User>, ApiError> {
    let profile = state
        .db
        .users()
        .update_profile(&user.id, &body.name, body.phone.as_deref())
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    Ok(ApiResponse::ok("Profile updated", profile))
}

async fn change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> Result<(HeaderMap, ApiResponse<()>), ApiError> {
    let users = state.db.users();
    let stored = users
        .password_hash(&user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    if !spawn_verify(body.current_password, Some(stored)).await? {
        return Err(ApiError::Validation(vec![FieldError {
            field: "currentPassword".to_string(),
            message: "Current password is incorrect".to_string(),
        }]));
    }
    validate_password(&body.new_password)?;

    let hash = spawn_hash(body.new_password).await?;
    users.update_password(&user.id, &hash).await?;
    info!(user_id = %user.id, "Password changed, sessions revoked");

    let cookie = clear_refresh_cookie(state.config.cookie_secure);
    Ok((
        set_cookie_header(&cookie),
        ApiResponse::message("Password changed, please log in again"),
    ))
}
