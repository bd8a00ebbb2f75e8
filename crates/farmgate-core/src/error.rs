//! # Error Types
//!
//! Domain-specific error types for farmgate-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  farmgate-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Field-level input failures                     │
//! │                                                                         │
//! │  farmgate-db errors (separate crate)                                   │
//! │  └── DbError          - Database failures, carries CoreError from txs  │
//! │                                                                         │
//! │  storefront-api errors (in app)                                        │
//! │  └── ApiError         - HTTP status + response envelope                │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::{ApplicationStatus, OrderStatus, StockShortage};

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    /// One or more cart lines cannot be filled.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout [(rice, 3), (yam, 10)]
    ///      │
    ///      ▼
    /// stock: rice=2, yam=40
    ///      │
    ///      ▼
    /// InsufficientStock { shortages: [rice: available 2, requested 3] }
    ///      │
    ///      ▼
    /// Client shows the itemized list, cart untouched
    /// ```
    #[error("Insufficient stock: {}", describe_shortages(.shortages))]
    InsufficientStock { shortages: Vec<StockShortage> },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    #[error("Application not found: {0}")]
    ApplicationNotFound(String),

    /// Review attempted on an application that is no longer pending.
    #[error("Application {application_id} has already been {}", .status.as_str())]
    AlreadyReviewed {
        application_id: String,
        status: ApplicationStatus,
    },

    /// Applicant's classification or open applications block a new submission.
    #[error("Cannot submit application: {reason}")]
    IneligibleApplicant { reason: String },

    #[error("Not permitted to {action}")]
    Forbidden { action: String },

    #[error("Order cannot move from {} to {}", .from.as_str(), .to.as_str())]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

fn describe_shortages(shortages: &[StockShortage]) -> String {
    shortages
        .iter()
        .map(|s| {
            format!(
                "{} (available {}, requested {})",
                s.name, s.available, s.requested
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., an email that is already registered).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    /// Name of the offending field, used for the `errors` list in responses.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. }
            | ValidationError::Duplicate { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_lists_every_line() {
        let err = CoreError::InsufficientStock {
            shortages: vec![
                StockShortage {
                    product_id: 1,
                    name: "Ofada Rice".to_string(),
                    available: 2,
                    requested: 3,
                },
                StockShortage {
                    product_id: 4,
                    name: "Yam Tubers".to_string(),
                    available: 0,
                    requested: 1,
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock: Ofada Rice (available 2, requested 3); \
             Yam Tubers (available 0, requested 1)"
        );
    }

    #[test]
    fn test_already_reviewed_message() {
        let err = CoreError::AlreadyReviewed {
            application_id: "app-1".to_string(),
            status: ApplicationStatus::Approved,
        };
        assert_eq!(err.to_string(), "Application app-1 has already been approved");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "businessName".to_string(),
        };
        assert_eq!(err.to_string(), "businessName is required");
        assert_eq!(err.field(), "businessName");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
