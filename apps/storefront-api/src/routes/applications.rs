//! Wholesale and distributor applications.
//!
//! ```text
//! POST /applications/wholesale     ──► pending, buyer → wholesale_pending
//! POST /applications/distributor   ──► pending, buyer → distributor_pending
//!
//! POST /admin/applications/{id}/approve ──► approved, buyer verified
//! POST /admin/applications/{id}/reject  ──► rejected, buyer back to retail
//!        second review of the same application ──► 409
//! ```

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use farmgate_core::workflow::{
    DistributorSubmission, ReviewDecision, ReviewRequest, Submission, WholesaleSubmission,
};
use farmgate_core::{Application, ApplicationKind, ApplicationStatus};

use crate::auth::{AdminUser, CurrentUser};
use crate::error::{ApiError, ApiJson, ApiResponse, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/applications/wholesale", post(submit_wholesale))
        .route("/applications/distributor", post(submit_distributor))
        .route("/applications/mine", get(my_applications))
}

/// Mounted under `/admin`.
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/applications", get(list_applications))
        .route("/applications/{id}/approve", post(approve))
        .route("/applications/{id}/reject", post(reject))
}

#[derive(Debug, Deserialize)]
pub struct ApplicationFilter {
    pub kind: Option<ApplicationKind>,
    pub status: Option<ApplicationStatus>,
}

async fn submit(state: &AppState, user: &CurrentUser, submission: Submission) -> ApiResult<Application> {
    let application = state.db.applications().submit(&user.id, &submission).await?;
    Ok(ApiResponse::created(
        format!("{} application submitted", capitalize(application.kind().as_str())),
        application,
    ))
}

async fn submit_wholesale(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<WholesaleSubmission>,
) -> ApiResult<Application> {
    submit(&state, &user, Submission::Wholesale(body)).await
}

async fn submit_distributor(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<DistributorSubmission>,
) -> ApiResult<Application> {
    submit(&state, &user, Submission::Distributor(body)).await
}

async fn my_applications(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Vec<Application>> {
    let applications = state.db.applications().list_for_applicant(&user.id).await?;
    Ok(ApiResponse::ok("Applications retrieved", applications))
}

async fn list_applications(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(filter): Query<ApplicationFilter>,
) -> ApiResult<Vec<Application>> {
    let repo = state.db.applications();
    let applications = repo.list(filter.kind, filter.status).await?;
    let pending = repo.pending_count().await?;
    Ok(ApiResponse::ok(
        format!("{} applications, {pending} awaiting review", applications.len()),
        applications,
    ))
}

/// Review bodies are optional; an empty body means no notes.
fn review_request(body: &Bytes) -> Result<ReviewRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ReviewRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid review body: {e}")))
}

async fn approve(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Application> {
    let ReviewRequest { notes, .. } = review_request(&body)?;
    let application = state
        .db
        .applications()
        .review(&id, &admin.actor(), ReviewDecision::Approve { notes })
        .await?;
    Ok(ApiResponse::ok("Application approved", application))
}

async fn reject(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Application> {
    let ReviewRequest { notes, reason } = review_request(&body)?;
    let application = state
        .db
        .applications()
        .review(&id, &admin.actor(), ReviewDecision::Reject { reason, notes })
        .await?;
    Ok(ApiResponse::ok("Application rejected", application))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
