//! # Application Workflow
//!
//! Rules for wholesale and distributor applications. The database layer
//! persists what these functions decide; nothing here touches storage.
//!
//! ## State Machine
//! ```text
//!                       submit
//!   retail ─────────────────────────────► *_pending
//!                                            │
//!                         ┌──────────────────┴──────────────────┐
//!                  approve│ (admin)                       reject│ (admin)
//!                         ▼                                     ▼
//!   wholesale_verified / distributor_verified                 retail
//!   application: approved (terminal)             application: rejected (terminal)
//! ```
//!
//! Any review of a terminal application fails with
//! [`CoreError::AlreadyReviewed`] and changes nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::tiering::distributor_tier;
use crate::types::{
    Actor, Application, ApplicationDetails, ApplicationKind, ApplicationStatus,
    BuyerClassification, DistributorProfile, User,
};
use crate::validation::{validate_bounded, validate_phone};

// =============================================================================
// Submission
// =============================================================================

/// Wholesale application form.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct WholesaleSubmission {
    pub business_name: String,
    pub business_address: String,
    pub business_phone: Option<String>,
    pub business_type: Option<String>,
    pub registration_number: Option<String>,
}

/// Distributor application form.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DistributorSubmission {
    pub business_name: String,
    pub business_address: String,
    pub business_phone: Option<String>,
    pub coverage_area: String,
    pub years_in_business: i64,
    pub expected_monthly_volume: String,
}

const MAX_YEARS_IN_BUSINESS: i64 = 200;

#[derive(Debug, Clone)]
pub enum Submission {
    Wholesale(WholesaleSubmission),
    Distributor(DistributorSubmission),
}

impl Submission {
    pub fn kind(&self) -> ApplicationKind {
        match self {
            Submission::Wholesale(_) => ApplicationKind::Wholesale,
            Submission::Distributor(_) => ApplicationKind::Distributor,
        }
    }
}

/// Classification an applicant holds while their application is pending.
pub fn pending_classification(kind: ApplicationKind) -> BuyerClassification {
    match kind {
        ApplicationKind::Wholesale => BuyerClassification::WholesalePending,
        ApplicationKind::Distributor => BuyerClassification::DistributorPending,
    }
}

/// Checks the applicant may open a new application.
///
/// Only retail buyers without an open application can apply.
pub fn ensure_can_submit(applicant: &User, has_pending_application: bool) -> CoreResult<()> {
    if has_pending_application || applicant.classification.is_pending() {
        return Err(CoreError::IneligibleApplicant {
            reason: "an application is already pending review".to_string(),
        });
    }
    if applicant.classification != BuyerClassification::Retail {
        return Err(CoreError::IneligibleApplicant {
            reason: format!(
                "account is already classified as {}",
                applicant.classification.as_str()
            ),
        });
    }
    Ok(())
}

fn optional_field(field: &str, value: &Option<String>, max: usize) -> CoreResult<Option<String>> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => Ok(Some(validate_bounded(field, v, max)?)),
    }
}

/// Validates a submission and builds the pending [`Application`] record.
///
/// For distributors the tier is derived from the coverage text here, so it
/// is fixed at submission time.
pub fn prepare_application(
    id: String,
    applicant: &User,
    submission: &Submission,
    now: DateTime<Utc>,
) -> CoreResult<Application> {
    let (business_name, business_address, business_phone) = match submission {
        Submission::Wholesale(s) => (&s.business_name, &s.business_address, &s.business_phone),
        Submission::Distributor(s) => (&s.business_name, &s.business_address, &s.business_phone),
    };

    let business_name = validate_bounded("businessName", business_name, 200)?;
    let business_address = validate_bounded("businessAddress", business_address, 500)?;
    let business_phone = match business_phone.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(phone) => Some(validate_phone(phone)?),
    };

    let details = match submission {
        Submission::Wholesale(s) => ApplicationDetails::Wholesale {
            business_type: optional_field("businessType", &s.business_type, 100)?,
            registration_number: optional_field(
                "registrationNumber",
                &s.registration_number,
                50,
            )?,
        },
        Submission::Distributor(s) => {
            let coverage_area = validate_bounded("coverageArea", &s.coverage_area, 500)?;
            if !(0..=MAX_YEARS_IN_BUSINESS).contains(&s.years_in_business) {
                return Err(ValidationError::OutOfRange {
                    field: "yearsInBusiness".to_string(),
                    min: 0,
                    max: MAX_YEARS_IN_BUSINESS,
                }
                .into());
            }
            let expected_monthly_volume =
                validate_bounded("expectedMonthlyVolume", &s.expected_monthly_volume, 100)?;
            let tier = distributor_tier(&coverage_area);

            ApplicationDetails::Distributor {
                coverage_area,
                years_in_business: s.years_in_business,
                expected_monthly_volume,
                tier,
            }
        }
    };

    Ok(Application {
        id,
        applicant_id: applicant.id.clone(),
        applicant_name: applicant.name.clone(),
        applicant_email: applicant.email.clone(),
        business_name,
        business_address,
        business_phone,
        details,
        status: ApplicationStatus::Pending,
        submitted_at: now,
        reviewed_at: None,
        reviewed_by: None,
        review_notes: None,
        rejection_reason: None,
    })
}

// =============================================================================
// Review
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve { notes: Option<String> },
    Reject {
        reason: Option<String>,
        notes: Option<String>,
    },
}

/// Everything a review changes, for the database layer to persist in one
/// transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub status: ApplicationStatus,
    pub classification: BuyerClassification,
    /// Profile to store on the user; `None` clears it.
    pub distributor: Option<DistributorProfile>,
    pub reviewed_by: String,
    pub reviewed_at: DateTime<Utc>,
    pub review_notes: Option<String>,
    pub rejection_reason: Option<String>,
}

/// Only admins and super admins review applications.
pub fn ensure_can_review(reviewer: &Actor) -> CoreResult<()> {
    if reviewer.is_admin() {
        Ok(())
    } else {
        Err(CoreError::Forbidden {
            action: "review applications".to_string(),
        })
    }
}

/// Decides the outcome of reviewing `application`.
///
/// Fails without side effects when the reviewer is not an admin or the
/// application is no longer pending.
pub fn review(
    application: &Application,
    reviewer: &Actor,
    decision: ReviewDecision,
    now: DateTime<Utc>,
) -> CoreResult<ReviewOutcome> {
    ensure_can_review(reviewer)?;

    if application.status.is_terminal() {
        return Err(CoreError::AlreadyReviewed {
            application_id: application.id.clone(),
            status: application.status,
        });
    }

    let outcome = match decision {
        ReviewDecision::Approve { notes } => {
            let (classification, distributor) = match &application.details {
                ApplicationDetails::Wholesale { .. } => {
                    (BuyerClassification::WholesaleVerified, None)
                }
                ApplicationDetails::Distributor {
                    coverage_area,
                    years_in_business,
                    expected_monthly_volume,
                    tier,
                } => (
                    BuyerClassification::DistributorVerified,
                    Some(DistributorProfile {
                        business_name: application.business_name.clone(),
                        business_address: application.business_address.clone(),
                        coverage_area: coverage_area.clone(),
                        years_in_business: *years_in_business,
                        expected_monthly_volume: expected_monthly_volume.clone(),
                        tier: *tier,
                    }),
                ),
            };

            ReviewOutcome {
                status: ApplicationStatus::Approved,
                classification,
                distributor,
                reviewed_by: reviewer.id.clone(),
                reviewed_at: now,
                review_notes: notes,
                rejection_reason: None,
            }
        }
        ReviewDecision::Reject { reason, notes } => ReviewOutcome {
            status: ApplicationStatus::Rejected,
            classification: BuyerClassification::Retail,
            distributor: None,
            reviewed_by: reviewer.id.clone(),
            reviewed_at: now,
            review_notes: notes,
            rejection_reason: reason,
        },
    };

    Ok(outcome)
}

impl ReviewOutcome {
    /// Applies the outcome to an in-memory application record.
    pub fn apply_to(&self, application: &mut Application) {
        application.status = self.status;
        application.reviewed_at = Some(self.reviewed_at);
        application.reviewed_by = Some(self.reviewed_by.clone());
        application.review_notes = self.review_notes.clone();
        application.rejection_reason = self.rejection_reason.clone();
    }
}

/// Review request body shared by approve and reject.
#[derive(Debug, Clone, Default, Deserialize, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub notes: Option<String>,
    pub reason: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DistributorTier, Role};

    fn retail_user() -> User {
        let now = Utc::now();
        User {
            id: "user-1".to_string(),
            email: "ada@farmgate.ng".to_string(),
            name: "Ada Obi".to_string(),
            phone: None,
            role: Role::User,
            classification: BuyerClassification::Retail,
            distributor: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn admin() -> Actor {
        Actor::new("admin-1", Role::Admin)
    }

    fn wholesale() -> Submission {
        Submission::Wholesale(WholesaleSubmission {
            business_name: " Obi Grains Ltd ".to_string(),
            business_address: "12 Market Road, Ibadan".to_string(),
            business_phone: Some("+234 803 555 0101".to_string()),
            business_type: Some("Retail shop".to_string()),
            registration_number: Some("".to_string()),
        })
    }

    fn distributor(coverage: &str) -> Submission {
        Submission::Distributor(DistributorSubmission {
            business_name: "Obi Logistics".to_string(),
            business_address: "4 Depot Street, Abeokuta".to_string(),
            business_phone: None,
            coverage_area: coverage.to_string(),
            years_in_business: 6,
            expected_monthly_volume: "500 bags".to_string(),
        })
    }

    fn pending(submission: &Submission) -> Application {
        prepare_application("app-1".to_string(), &retail_user(), submission, Utc::now()).unwrap()
    }

    #[test]
    fn test_prepare_wholesale_trims_and_drops_blank_optionals() {
        let app = pending(&wholesale());
        assert_eq!(app.business_name, "Obi Grains Ltd");
        assert_eq!(app.status, ApplicationStatus::Pending);
        assert_eq!(app.kind(), ApplicationKind::Wholesale);
        match app.details {
            ApplicationDetails::Wholesale {
                business_type,
                registration_number,
            } => {
                assert_eq!(business_type.as_deref(), Some("Retail shop"));
                assert_eq!(registration_number, None);
            }
            other => panic!("unexpected details {other:?}"),
        }
    }

    #[test]
    fn test_prepare_distributor_derives_tier() {
        let app = pending(&distributor("Lagos, Ogun, Oyo"));
        match app.details {
            ApplicationDetails::Distributor { tier, .. } => {
                assert_eq!(tier, DistributorTier::Tier2)
            }
            other => panic!("unexpected details {other:?}"),
        }
    }

    #[test]
    fn test_prepare_rejects_missing_fields() {
        let mut sub = match wholesale() {
            Submission::Wholesale(s) => s,
            _ => unreachable!(),
        };
        sub.business_address = "   ".to_string();
        let err = prepare_application(
            "app-2".to_string(),
            &retail_user(),
            &Submission::Wholesale(sub),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Required { ref field }) if field == "businessAddress"
        ));
    }

    #[test]
    fn test_prepare_bounds_years_in_business() {
        let with_years = |years: i64| {
            let mut sub = match distributor("Kano") {
                Submission::Distributor(s) => s,
                _ => unreachable!(),
            };
            sub.years_in_business = years;
            prepare_application(
                "app-3".to_string(),
                &retail_user(),
                &Submission::Distributor(sub),
                Utc::now(),
            )
        };

        assert!(with_years(0).is_ok());
        assert!(with_years(MAX_YEARS_IN_BUSINESS).is_ok());
        for years in [-1, MAX_YEARS_IN_BUSINESS + 1, i64::MAX] {
            assert!(matches!(
                with_years(years),
                Err(CoreError::Validation(ValidationError::OutOfRange { min: 0, max: MAX_YEARS_IN_BUSINESS, .. }))
            ));
        }
    }

    #[test]
    fn test_only_retail_without_pending_may_submit() {
        let mut user = retail_user();
        assert!(ensure_can_submit(&user, false).is_ok());
        assert!(matches!(
            ensure_can_submit(&user, true),
            Err(CoreError::IneligibleApplicant { .. })
        ));

        user.classification = BuyerClassification::WholesaleVerified;
        assert!(ensure_can_submit(&user, false).is_err());

        user.classification = BuyerClassification::DistributorPending;
        assert!(ensure_can_submit(&user, false).is_err());
    }

    #[test]
    fn test_approve_wholesale() {
        let app = pending(&wholesale());
        let outcome = review(
            &app,
            &admin(),
            ReviewDecision::Approve {
                notes: Some("docs verified".to_string()),
            },
            Utc::now(),
        )
        .unwrap();

        assert_eq!(outcome.status, ApplicationStatus::Approved);
        assert_eq!(outcome.classification, BuyerClassification::WholesaleVerified);
        assert_eq!(outcome.distributor, None);
        assert_eq!(outcome.reviewed_by, "admin-1");
    }

    #[test]
    fn test_approve_distributor_copies_profile() {
        let app = pending(&distributor("Nationwide"));
        let outcome = review(
            &app,
            &admin(),
            ReviewDecision::Approve { notes: None },
            Utc::now(),
        )
        .unwrap();

        assert_eq!(outcome.classification, BuyerClassification::DistributorVerified);
        let profile = outcome.distributor.unwrap();
        assert_eq!(profile.business_name, "Obi Logistics");
        assert_eq!(profile.tier, DistributorTier::Tier3);
        assert_eq!(profile.years_in_business, 6);
    }

    #[test]
    fn test_reject_resets_to_retail() {
        let app = pending(&distributor("Kano"));
        let outcome = review(
            &app,
            &admin(),
            ReviewDecision::Reject {
                reason: Some("incomplete documents".to_string()),
                notes: None,
            },
            Utc::now(),
        )
        .unwrap();

        assert_eq!(outcome.status, ApplicationStatus::Rejected);
        assert_eq!(outcome.classification, BuyerClassification::Retail);
        assert_eq!(outcome.distributor, None);
        assert_eq!(outcome.rejection_reason.as_deref(), Some("incomplete documents"));
    }

    #[test]
    fn test_second_review_fails() {
        let mut app = pending(&wholesale());
        let first = review(
            &app,
            &admin(),
            ReviewDecision::Approve { notes: None },
            Utc::now(),
        )
        .unwrap();
        first.apply_to(&mut app);
        assert_eq!(app.status, ApplicationStatus::Approved);

        let second = review(
            &app,
            &admin(),
            ReviewDecision::Approve { notes: None },
            Utc::now(),
        );
        assert!(matches!(
            second,
            Err(CoreError::AlreadyReviewed {
                status: ApplicationStatus::Approved,
                ..
            })
        ));
    }

    #[test]
    fn test_non_admin_cannot_review() {
        let app = pending(&wholesale());
        let user = Actor::new("user-2", Role::User);
        let result = review(&app, &user, ReviewDecision::Approve { notes: None }, Utc::now());
        assert!(matches!(result, Err(CoreError::Forbidden { .. })));
    }
}
