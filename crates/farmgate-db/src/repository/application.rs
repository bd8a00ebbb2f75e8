//! # Application Repository
//!
//! Persists the wholesale/distributor workflow decided in
//! [`farmgate_core::workflow`].
//!
//! ## Review Settlement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  read application ──► workflow::review()  (admin? still pending?)      │
//! │                              │                                          │
//! │                              ▼                                          │
//! │  BEGIN                                                                  │
//! │    UPDATE applications ... WHERE id = ? AND status = 'pending'         │
//! │        0 rows ──► someone else reviewed first ──► AlreadyReviewed      │
//! │    UPDATE users SET classification, distributor_profile                │
//! │  COMMIT ──► notify applicant                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The partial unique index `idx_applications_one_pending` keeps each
//! applicant to a single open application even under concurrent submits.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{info, warn};
use uuid::Uuid;

use super::notification::NotificationRepository;
use super::user::UserRepository;
use crate::error::{DbError, DbResult};
use farmgate_core::workflow::{
    ensure_can_submit, pending_classification, prepare_application, review, ReviewDecision,
    Submission,
};
use farmgate_core::{
    Actor, Application, ApplicationDetails, ApplicationKind, ApplicationStatus, CoreError,
    Notification, NotificationLevel,
};

const APPLICATION_COLUMNS: &str = "id, kind, applicant_id, applicant_name, applicant_email, \
     business_name, business_address, business_phone, details, status, submitted_at, \
     reviewed_at, reviewed_by, review_notes, rejection_reason";

#[derive(Debug, Clone, sqlx::FromRow)]
struct ApplicationRecord {
    id: String,
    kind: ApplicationKind,
    applicant_id: String,
    applicant_name: String,
    applicant_email: String,
    business_name: String,
    business_address: String,
    business_phone: Option<String>,
    details: String,
    status: ApplicationStatus,
    submitted_at: DateTime<Utc>,
    reviewed_at: Option<DateTime<Utc>>,
    reviewed_by: Option<String>,
    review_notes: Option<String>,
    rejection_reason: Option<String>,
}

impl TryFrom<ApplicationRecord> for Application {
    type Error = DbError;

    fn try_from(r: ApplicationRecord) -> Result<Self, Self::Error> {
        let details: ApplicationDetails = serde_json::from_str(&r.details)?;
        if details.kind() != r.kind {
            return Err(DbError::Serialization(format!(
                "application {} stored as {} with {} details",
                r.id,
                r.kind.as_str(),
                details.kind().as_str()
            )));
        }
        Ok(Application {
            id: r.id,
            applicant_id: r.applicant_id,
            applicant_name: r.applicant_name,
            applicant_email: r.applicant_email,
            business_name: r.business_name,
            business_address: r.business_address,
            business_phone: r.business_phone,
            details,
            status: r.status,
            submitted_at: r.submitted_at,
            reviewed_at: r.reviewed_at,
            reviewed_by: r.reviewed_by,
            review_notes: r.review_notes,
            rejection_reason: r.rejection_reason,
        })
    }
}

fn ineligible(reason: &str) -> DbError {
    CoreError::IneligibleApplicant {
        reason: reason.to_string(),
    }
    .into()
}

#[derive(Debug, Clone)]
pub struct ApplicationRepository {
    pool: SqlitePool,
}

impl ApplicationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ApplicationRepository { pool }
    }

    fn notifications(&self) -> NotificationRepository {
        NotificationRepository::new(self.pool.clone())
    }

    /// Opens an application and moves the applicant to the matching
    /// pending classification.
    ///
    /// ## Returns
    /// * `Err(Core(UserNotFound))` - unknown applicant
    /// * `Err(Core(IneligibleApplicant))` - not retail, or already pending
    /// * `Err(Core(Validation))` - bad form fields
    pub async fn submit(&self, applicant_id: &str, submission: &Submission) -> DbResult<Application> {
        let applicant = UserRepository::new(self.pool.clone())
            .get_by_id(applicant_id)
            .await?
            .ok_or_else(|| CoreError::UserNotFound(applicant_id.to_string()))?;

        let pending: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM applications WHERE applicant_id = ?1 AND status = 'pending'",
        )
        .bind(applicant_id)
        .fetch_one(&self.pool)
        .await?;

        ensure_can_submit(&applicant, pending > 0)?;
        let application =
            prepare_application(Uuid::new_v4().to_string(), &applicant, submission, Utc::now())?;
        let details = serde_json::to_string(&application.details)?;

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(&format!(
            "INSERT INTO applications ({APPLICATION_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, NULL, NULL, NULL, NULL)"
        ))
        .bind(&application.id)
        .bind(application.kind())
        .bind(&application.applicant_id)
        .bind(&application.applicant_name)
        .bind(&application.applicant_email)
        .bind(&application.business_name)
        .bind(&application.business_address)
        .bind(&application.business_phone)
        .bind(&details)
        .bind(application.status)
        .bind(application.submitted_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            let err = DbError::from(e);
            return Err(if err.is_unique_violation_on("applications.applicant_id") {
                ineligible("an application is already pending review")
            } else {
                err
            });
        }

        let moved = sqlx::query(
            r#"
            UPDATE users SET classification = ?2, updated_at = ?3
            WHERE id = ?1 AND classification = 'retail'
            "#,
        )
        .bind(applicant_id)
        .bind(pending_classification(application.kind()))
        .bind(application.submitted_at)
        .execute(&mut *tx)
        .await?;

        if moved.rows_affected() == 0 {
            return Err(ineligible("account is no longer retail"));
        }

        tx.commit().await?;

        info!(
            application_id = %application.id,
            applicant_id = %applicant_id,
            kind = application.kind().as_str(),
            "Application submitted"
        );
        self.notifications()
            .publish(&Notification::new(
                NotificationLevel::Info,
                "New application",
                format!(
                    "{} applied for {} status ({})",
                    application.applicant_name,
                    application.kind().as_str(),
                    application.business_name
                ),
            ))
            .await;

        Ok(application)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Application>> {
        let record: Option<ApplicationRecord> = sqlx::query_as(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        record.map(Application::try_from).transpose()
    }

    /// Applications, newest first, optionally filtered by kind and status.
    pub async fn list(
        &self,
        kind: Option<ApplicationKind>,
        status: Option<ApplicationStatus>,
    ) -> DbResult<Vec<Application>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE 1 = 1"
        ));
        if let Some(kind) = kind {
            builder.push(" AND kind = ").push_bind(kind);
        }
        if let Some(status) = status {
            builder.push(" AND status = ").push_bind(status);
        }
        builder.push(" ORDER BY submitted_at DESC, rowid DESC");

        let records: Vec<ApplicationRecord> = builder.build_query_as().fetch_all(&self.pool).await?;
        records.into_iter().map(Application::try_from).collect()
    }

    /// One applicant's history, newest first.
    pub async fn list_for_applicant(&self, applicant_id: &str) -> DbResult<Vec<Application>> {
        let records: Vec<ApplicationRecord> = sqlx::query_as(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE applicant_id = ?1 \
             ORDER BY submitted_at DESC, rowid DESC"
        ))
        .bind(applicant_id)
        .fetch_all(&self.pool)
        .await?;

        records.into_iter().map(Application::try_from).collect()
    }

    /// Approves or rejects a pending application.
    ///
    /// The application update and the applicant's classification change
    /// commit together. A second review of the same application fails with
    /// `AlreadyReviewed` and changes nothing.
    pub async fn review(
        &self,
        id: &str,
        reviewer: &Actor,
        decision: ReviewDecision,
    ) -> DbResult<Application> {
        let mut application = self
            .get(id)
            .await?
            .ok_or_else(|| CoreError::ApplicationNotFound(id.to_string()))?;

        let outcome = review(&application, reviewer, decision, Utc::now())?;
        let profile = outcome
            .distributor
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE applications
            SET status = ?2, reviewed_at = ?3, reviewed_by = ?4,
                review_notes = ?5, rejection_reason = ?6
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(outcome.status)
        .bind(outcome.reviewed_at)
        .bind(&outcome.reviewed_by)
        .bind(&outcome.review_notes)
        .bind(&outcome.rejection_reason)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            drop(tx);
            let status = self
                .get(id)
                .await?
                .map(|a| a.status)
                .unwrap_or(ApplicationStatus::Pending);
            warn!(application_id = %id, status = status.as_str(), "Concurrent review lost");
            return Err(CoreError::AlreadyReviewed {
                application_id: id.to_string(),
                status,
            }
            .into());
        }

        sqlx::query(
            r#"
            UPDATE users SET classification = ?2, distributor_profile = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(&application.applicant_id)
        .bind(outcome.classification)
        .bind(&profile)
        .bind(outcome.reviewed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        outcome.apply_to(&mut application);

        info!(
            application_id = %id,
            reviewer = %reviewer.id,
            status = application.status.as_str(),
            classification = outcome.classification.as_str(),
            "Application reviewed"
        );

        let notification = match application.status {
            ApplicationStatus::Approved => Notification::new(
                NotificationLevel::Success,
                "Application approved",
                format!(
                    "Your {} application for {} was approved",
                    application.kind().as_str(),
                    application.business_name
                ),
            ),
            _ => Notification::new(
                NotificationLevel::Warning,
                "Application rejected",
                match &application.rejection_reason {
                    Some(reason) => format!(
                        "Your {} application was rejected: {reason}",
                        application.kind().as_str()
                    ),
                    None => format!("Your {} application was rejected", application.kind().as_str()),
                },
            ),
        };
        self.notifications()
            .publish(&notification.for_user(application.applicant_id.as_str()))
            .await;

        Ok(application)
    }

    /// Count of applications awaiting review.
    pub async fn pending_count(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM applications WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::user::NewUser;
    use crate::{Database, DbConfig};
    use farmgate_core::workflow::{DistributorSubmission, WholesaleSubmission};
    use farmgate_core::{BuyerClassification, DistributorTier, Role, User};

    async fn setup() -> (Database, User, Actor) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db
            .users()
            .create(NewUser {
                email: "chidi@agromart.ng".to_string(),
                name: "Chidi Eze".to_string(),
                phone: None,
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        (db, user, Actor::new("admin-1", Role::Admin))
    }

    fn wholesale() -> Submission {
        Submission::Wholesale(WholesaleSubmission {
            business_name: "Agromart Ltd".to_string(),
            business_address: "12 Marina, Lagos".to_string(),
            business_phone: Some("08035550101".to_string()),
            business_type: Some("retail chain".to_string()),
            registration_number: Some("RC123456".to_string()),
        })
    }

    fn distributor() -> Submission {
        Submission::Distributor(DistributorSubmission {
            business_name: "Eze Logistics".to_string(),
            business_address: "4 Aba Road, Port Harcourt".to_string(),
            business_phone: None,
            coverage_area: "Lagos, Ogun, Oyo".to_string(),
            years_in_business: 6,
            expected_monthly_volume: "2000 bags".to_string(),
        })
    }

    async fn classification(db: &Database, id: &str) -> BuyerClassification {
        db.users().get_by_id(id).await.unwrap().unwrap().classification
    }

    #[tokio::test]
    async fn test_submit_moves_to_pending() {
        let (db, user, _) = setup().await;
        let app = db.applications().submit(&user.id, &wholesale()).await.unwrap();

        assert_eq!(app.status, ApplicationStatus::Pending);
        assert_eq!(app.applicant_email, "chidi@agromart.ng");
        assert_eq!(classification(&db, &user.id).await, BuyerClassification::WholesalePending);

        let stored = db.applications().get(&app.id).await.unwrap().unwrap();
        assert_eq!(stored.details, app.details);
        assert_eq!(db.applications().pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_second_submission_while_pending_fails() {
        let (db, user, _) = setup().await;
        db.applications().submit(&user.id, &wholesale()).await.unwrap();

        let err = db.applications().submit(&user.id, &distributor()).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::IneligibleApplicant { .. })));
        assert_eq!(db.applications().list_for_applicant(&user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_applicant() {
        let (db, _, _) = setup().await;
        let err = db.applications().submit("ghost", &wholesale()).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_double_approve_is_rejected() {
        let (db, user, admin) = setup().await;
        let app = db.applications().submit(&user.id, &wholesale()).await.unwrap();

        let approved = db
            .applications()
            .review(&app.id, &admin, ReviewDecision::Approve { notes: Some("docs ok".to_string()) })
            .await
            .unwrap();
        assert_eq!(approved.status, ApplicationStatus::Approved);
        assert_eq!(approved.reviewed_by.as_deref(), Some("admin-1"));
        assert_eq!(classification(&db, &user.id).await, BuyerClassification::WholesaleVerified);

        let other_admin = Actor::new("admin-2", Role::SuperAdmin);
        let err = db
            .applications()
            .review(&app.id, &other_admin, ReviewDecision::Approve { notes: None })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::AlreadyReviewed { status: ApplicationStatus::Approved, .. })
        ));

        // first review stands
        let stored = db.applications().get(&app.id).await.unwrap().unwrap();
        assert_eq!(stored.reviewed_by.as_deref(), Some("admin-1"));
        assert_eq!(stored.review_notes.as_deref(), Some("docs ok"));
    }

    #[tokio::test]
    async fn test_reject_returns_to_retail_and_allows_reapply() {
        let (db, user, admin) = setup().await;
        let app = db.applications().submit(&user.id, &wholesale()).await.unwrap();

        let rejected = db
            .applications()
            .review(
                &app.id,
                &admin,
                ReviewDecision::Reject {
                    reason: Some("registration number not found".to_string()),
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(rejected.status, ApplicationStatus::Rejected);
        assert_eq!(classification(&db, &user.id).await, BuyerClassification::Retail);

        db.applications().submit(&user.id, &wholesale()).await.unwrap();
        assert_eq!(db.applications().list_for_applicant(&user.id).await.unwrap().len(), 2);

        let mine = db.notifications().list_for_user(&user.id).await.unwrap();
        assert_eq!(mine[0].level, NotificationLevel::Warning);
    }

    #[tokio::test]
    async fn test_distributor_approval_copies_profile() {
        let (db, user, admin) = setup().await;
        let app = db.applications().submit(&user.id, &distributor()).await.unwrap();
        assert_eq!(classification(&db, &user.id).await, BuyerClassification::DistributorPending);

        db.applications()
            .review(&app.id, &admin, ReviewDecision::Approve { notes: None })
            .await
            .unwrap();

        let stored = db.users().get_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.classification, BuyerClassification::DistributorVerified);
        let profile = stored.distributor.unwrap();
        assert_eq!(profile.business_name, "Eze Logistics");
        assert_eq!(profile.tier, DistributorTier::Tier2);
        assert_eq!(profile.years_in_business, 6);
    }

    #[tokio::test]
    async fn test_non_admin_cannot_review() {
        let (db, user, _) = setup().await;
        let app = db.applications().submit(&user.id, &wholesale()).await.unwrap();

        let err = db
            .applications()
            .review(&app.id, &Actor::new(user.id.clone(), Role::User), ReviewDecision::Approve { notes: None })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Forbidden { .. })));
        assert_eq!(classification(&db, &user.id).await, BuyerClassification::WholesalePending);
    }

    #[tokio::test]
    async fn test_review_unknown_application() {
        let (db, _, admin) = setup().await;
        let err = db
            .applications()
            .review("missing", &admin, ReviewDecision::Approve { notes: None })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::ApplicationNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let (db, user, admin) = setup().await;
        let app = db.applications().submit(&user.id, &wholesale()).await.unwrap();
        db.applications()
            .review(&app.id, &admin, ReviewDecision::Approve { notes: None })
            .await
            .unwrap();

        let apps = db.applications();
        assert_eq!(apps.list(None, None).await.unwrap().len(), 1);
        assert_eq!(apps.list(Some(ApplicationKind::Wholesale), None).await.unwrap().len(), 1);
        assert!(apps.list(Some(ApplicationKind::Distributor), None).await.unwrap().is_empty());
        assert!(apps.list(None, Some(ApplicationStatus::Pending)).await.unwrap().is_empty());
        assert_eq!(
            apps.list(Some(ApplicationKind::Wholesale), Some(ApplicationStatus::Approved))
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
