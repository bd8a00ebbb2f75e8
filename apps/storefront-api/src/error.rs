//! API errors and the response envelope.
//!
//! Every response, success or failure, has the same shape:
//!
//! ```text
//! { "success": bool, "message": "...", "data": {...}?, "errors": [...]? }
//! ```
//!
//! ## Status Mapping
//! ```text
//! ValidationError / EmptyCart / CartTooLarge     → 400
//! bad or missing token                           → 401
//! Forbidden                                      → 403
//! *NotFound                                      → 404
//! InsufficientStock (itemised in errors)         → 409
//! AlreadyReviewed / IneligibleApplicant /
//!   InvalidTransition / UniqueViolation          → 409
//! anything else                                  → 500 (details logged only)
//! ```

use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::error;

use farmgate_core::{CoreError, StockShortage, ValidationError};
use farmgate_db::DbError;

/// One entry of the envelope's `errors` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl From<&ValidationError> for FieldError {
    fn from(err: &ValidationError) -> Self {
        FieldError {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<&StockShortage> for FieldError {
    fn from(s: &StockShortage) -> Self {
        FieldError {
            field: format!("items.{}", s.product_id),
            message: format!(
                "{}: only {} available, {} requested",
                s.name, s.available, s.requested
            ),
        }
    }
}

#[derive(Debug, Serialize)]
struct Envelope<T: Serialize> {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
}

/// A successful response.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    status: StatusCode,
    message: String,
    data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            status: StatusCode::OK,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            status: StatusCode::CREATED,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Success with no `data`.
    pub fn message(message: impl Into<String>) -> Self {
        ApiResponse {
            status: StatusCode::OK,
            message: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Envelope {
            success: true,
            message: self.message,
            data: self.data,
            errors: None,
        };
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Insufficient stock")]
    InsufficientStock(Vec<StockShortage>),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::InsufficientStock(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ApiError::NotFound(format!("{} not found", what.into()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (message, errors) = match self {
            ApiError::Validation(errors) => ("Validation failed".to_string(), Some(errors)),
            ApiError::InsufficientStock(shortages) => (
                "Some items in your cart are no longer available in the requested quantity"
                    .to_string(),
                Some(shortages.iter().map(FieldError::from).collect()),
            ),
            ApiError::Internal(detail) => {
                error!(detail = %detail, "Internal server error");
                ("Internal server error".to_string(), None)
            }
            other => (other.to_string(), None),
        };

        let body: Envelope<()> = Envelope {
            success: false,
            message,
            data: None,
            errors,
        };
        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(vec![FieldError::from(&err)])
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => v.into(),
            CoreError::InsufficientStock { shortages } => ApiError::InsufficientStock(shortages),
            CoreError::EmptyCart | CoreError::CartTooLarge { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            CoreError::ProductNotFound(_)
            | CoreError::ApplicationNotFound(_)
            | CoreError::OrderNotFound(_)
            | CoreError::UserNotFound(_) => ApiError::NotFound(err.to_string()),
            CoreError::AlreadyReviewed { .. }
            | CoreError::IneligibleApplicant { .. }
            | CoreError::InvalidTransition { .. } => ApiError::Conflict(err.to_string()),
            CoreError::Forbidden { .. } => ApiError::Forbidden(err.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Core(core) => core.into(),
            DbError::NotFound { entity, id } => ApiError::NotFound(format!("{entity} not found: {id}")),
            DbError::UniqueViolation { field, .. } => {
                ApiError::Conflict(format!("{field} is already registered"))
            }
            DbError::ForeignKeyViolation { message } | DbError::CheckViolation { message } => {
                ApiError::Conflict(message)
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

// =============================================================================
// JSON Body Extractor
// =============================================================================

/// `Json<T>` whose rejection is rendered in the envelope as a 400.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}
