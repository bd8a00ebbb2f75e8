//! # User Repository
//!
//! Accounts, credentials and refresh tokens. Password hashes are produced
//! by the API layer; this repository only stores and returns them.
//!
//! Classification is changed here only by the application workflow (see
//! [`ApplicationRepository`](super::application::ApplicationRepository)),
//! never by profile updates.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use farmgate_core::validation::{validate_bounded, validate_email, validate_phone};
use farmgate_core::{BuyerClassification, DistributorProfile, Role, User};

const USER_COLUMNS: &str = "id, email, name, phone, role, classification, distributor_profile, \
     last_login, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRecord {
    id: String,
    email: String,
    name: String,
    phone: Option<String>,
    role: Role,
    classification: BuyerClassification,
    distributor_profile: Option<String>,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRecord> for User {
    type Error = DbError;

    fn try_from(r: UserRecord) -> Result<Self, Self::Error> {
        let distributor = r
            .distributor_profile
            .as_deref()
            .map(serde_json::from_str::<DistributorProfile>)
            .transpose()?;

        Ok(User {
            id: r.id,
            email: r.email,
            name: r.name,
            phone: r.phone,
            role: r.role,
            classification: r.classification,
            distributor,
            last_login: r.last_login,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Input for registering an account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    /// Already-hashed password (PHC string).
    pub password_hash: String,
}

/// A user together with their stored password hash, for login only.
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Registers a retail account with the `user` role.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - email already registered
    /// * `Err(DbError::Core(Validation))` - bad email, name or phone
    pub async fn create(&self, new_user: NewUser) -> DbResult<User> {
        let email = validate_email(&new_user.email)?;
        let name = validate_bounded("name", &new_user.name, 100)?;
        let phone = match new_user.phone.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(phone) => Some(validate_phone(phone)?),
        };

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email,
            name,
            phone,
            role: Role::User,
            classification: BuyerClassification::Retail,
            distributor: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        };

        let result = sqlx::query(
            r#"
            INSERT INTO users (
                id, email, password_hash, name, phone, role, classification,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&new_user.password_hash)
        .bind(&user.name)
        .bind(&user.phone)
        .bind(user.role)
        .bind(user.classification)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                info!(user_id = %user.id, email = %user.email, "User registered");
                Ok(user)
            }
            Err(e) => {
                let err = DbError::from(e);
                if err.is_unique_violation_on("users.email") {
                    Err(DbError::duplicate("email", user.email))
                } else {
                    Err(err)
                }
            }
        }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let record: Option<UserRecord> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        record.map(User::try_from).transpose()
    }

    /// Looks a user up by email, case-insensitively.
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let record: Option<UserRecord> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"))
                .bind(email.trim().to_lowercase())
                .fetch_optional(&self.pool)
                .await?;

        record.map(User::try_from).transpose()
    }

    /// User plus password hash, for verifying a login.
    pub async fn find_credentials(&self, email: &str) -> DbResult<Option<StoredCredentials>> {
        let email = email.trim().to_lowercase();
        let hash: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE email = ?1")
                .bind(&email)
                .fetch_optional(&self.pool)
                .await?;

        let Some(password_hash) = hash else {
            return Ok(None);
        };
        let Some(user) = self.get_by_email(&email).await? else {
            return Ok(None);
        };

        Ok(Some(StoredCredentials {
            user,
            password_hash,
        }))
    }

    /// Stored password hash for a user id (password change).
    pub async fn password_hash(&self, id: &str) -> DbResult<Option<String>> {
        let hash: Option<String> = sqlx::query_scalar("SELECT password_hash FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(hash)
    }

    /// Updates display name and phone. Returns the updated user, or `None`
    /// if the id is unknown.
    pub async fn update_profile(
        &self,
        id: &str,
        name: &str,
        phone: Option<&str>,
    ) -> DbResult<Option<User>> {
        let name = validate_bounded("name", name, 100)?;
        let phone = match phone.map(str::trim) {
            None | Some("") => None,
            Some(phone) => Some(validate_phone(phone)?),
        };

        let result = sqlx::query("UPDATE users SET name = ?2, phone = ?3, updated_at = ?4 WHERE id = ?1")
            .bind(id)
            .bind(&name)
            .bind(&phone)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        debug!(user_id = %id, "Profile updated");
        self.get_by_id(id).await
    }

    /// Replaces the password hash and revokes the refresh token.
    pub async fn update_password(&self, id: &str, password_hash: &str) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?2, refresh_token = NULL, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(password_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stores (or clears, with `None`) the single live refresh token.
    pub async fn set_refresh_token(&self, id: &str, token: Option<&str>) -> DbResult<bool> {
        let result = sqlx::query("UPDATE users SET refresh_token = ?2 WHERE id = ?1")
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn refresh_token(&self, id: &str) -> DbResult<Option<String>> {
        let token: Option<Option<String>> =
            sqlx::query_scalar("SELECT refresh_token FROM users WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(token.flatten())
    }

    /// Replaces `current` with `next` only if `current` is still the live
    /// token. Returns false when the token was already rotated or revoked.
    pub async fn rotate_refresh_token(&self, id: &str, current: &str, next: &str) -> DbResult<bool> {
        let result =
            sqlx::query("UPDATE users SET refresh_token = ?3 WHERE id = ?1 AND refresh_token = ?2")
                .bind(id)
                .bind(current)
                .bind(next)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn touch_last_login(&self, id: &str) -> DbResult<()> {
        sqlx::query("UPDATE users SET last_login = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_role(&self, id: &str, role: Role) -> DbResult<bool> {
        let result = sqlx::query("UPDATE users SET role = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(role)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            info!(user_id = %id, role = role.as_str(), "Role changed");
        }
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn ada() -> NewUser {
        NewUser {
            email: "  Ada@Farmgate.NG ".to_string(),
            name: "Ada Obi".to_string(),
            phone: Some("+234 803 555 0101".to_string()),
            password_hash: "$argon2id$stub".to_string(),
        }
    }

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_defaults_to_retail_user() {
        let db = db().await;
        let user = db.users().create(ada()).await.unwrap();

        assert_eq!(user.email, "ada@farmgate.ng");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.classification, BuyerClassification::Retail);

        let loaded = db.users().get_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(loaded.email, user.email);
        assert!(loaded.distributor.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = db().await;
        db.users().create(ada()).await.unwrap();

        let mut again = ada();
        again.email = "ada@farmgate.ng".to_string();
        let err = db.users().create(again).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "email"));
        assert_eq!(db.users().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_credentials_lookup_is_case_insensitive() {
        let db = db().await;
        db.users().create(ada()).await.unwrap();

        let creds = db.users().find_credentials("ADA@farmgate.ng").await.unwrap().unwrap();
        assert_eq!(creds.password_hash, "$argon2id$stub");
        assert!(db.users().find_credentials("nobody@farmgate.ng").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_token_rotation() {
        let db = db().await;
        let user = db.users().create(ada()).await.unwrap();
        let users = db.users();

        assert!(users.set_refresh_token(&user.id, Some("t1")).await.unwrap());
        assert!(users.rotate_refresh_token(&user.id, "t1", "t2").await.unwrap());
        // replaying the old token fails
        assert!(!users.rotate_refresh_token(&user.id, "t1", "t3").await.unwrap());
        assert_eq!(users.refresh_token(&user.id).await.unwrap().as_deref(), Some("t2"));

        users.update_password(&user.id, "$argon2id$new").await.unwrap();
        assert!(users.refresh_token(&user.id).await.unwrap().is_none());
        assert_eq!(
            users.password_hash(&user.id).await.unwrap().as_deref(),
            Some("$argon2id$new")
        );
    }

    #[tokio::test]
    async fn test_update_profile_and_role() {
        let db = db().await;
        let user = db.users().create(ada()).await.unwrap();

        let updated = db
            .users()
            .update_profile(&user.id, "Ada Okafor", None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Ada Okafor");
        assert!(updated.phone.is_none());
        assert_eq!(updated.classification, BuyerClassification::Retail);

        assert!(db.users().set_role(&user.id, Role::Admin).await.unwrap());
        assert_eq!(db.users().get_by_id(&user.id).await.unwrap().unwrap().role, Role::Admin);
        assert!(db.users().update_profile("missing", "X", None).await.unwrap().is_none());
    }
}
