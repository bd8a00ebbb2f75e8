//! Request authentication.
//!
//! ```text
//! Authorization: Bearer <access token>
//!        │
//!        ▼
//! CurrentUser extractor ──► JwtManager::validate_access_token ──► CurrentUser
//!        │                                                             │
//!        └── already in extensions (set by require_admin)? reuse ◄─────┘
//!
//! /admin/* ──► require_admin middleware ──► role admin | super_admin, else 403
//! ```

use axum::extract::{FromRequestParts, Request, State};
use axum::http::{header, request::Parts};
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use super::jwt::{extract_bearer_token, Claims};
use crate::error::ApiError;
use crate::state::AppState;
use farmgate_core::{Actor, BuyerClassification, Role};

/// The authenticated caller, taken from a verified access token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    pub role: Role,
    /// Classification at token issue time; stale after a review.
    pub classification: BuyerClassification,
}

impl CurrentUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.id.clone(), self.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        CurrentUser {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
            classification: claims.user_type,
        }
    }
}

fn authenticate(parts: &Parts, state: &AppState) -> Result<CurrentUser, ApiError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(value) => extract_bearer_token(value)
            .ok_or_else(|| ApiError::Unauthorized("Invalid authorization header".to_string()))?,
        None => return Err(ApiError::Unauthorized("Authentication required".to_string())),
    };

    match state.jwt.validate_access_token(token) {
        Ok(claims) => Ok(CurrentUser::from(claims)),
        Err(e) => {
            warn!(uri = %parts.uri, error = %e, "Rejected access token");
            Err(e)
        }
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let user = authenticate(parts, state)?;
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

/// A caller with the admin or super_admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            warn!(user_id = %user.id, uri = %parts.uri, "Admin route refused");
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }
        Ok(AdminUser(user))
    }
}

/// Middleware for the `/admin` router: authenticates and requires an admin
/// role before any handler runs.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = req.into_parts();
    let AdminUser(user) = AdminUser::from_request_parts(&mut parts, &state).await?;

    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
