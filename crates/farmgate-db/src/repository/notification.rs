//! # Notification Repository
//!
//! Publish-only alert feed. Every notification is written to the
//! `notifications` table and emitted as a `tracing` event at a matching
//! level. Publishing never fails the operation that triggered it.

use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::error::DbResult;
use farmgate_core::{Notification, NotificationLevel};

#[derive(Debug, Clone, sqlx::FromRow)]
struct NotificationRecord {
    id: String,
    level: NotificationLevel,
    title: String,
    message: String,
    product_id: Option<i64>,
    user_id: Option<String>,
    read: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<NotificationRecord> for Notification {
    fn from(r: NotificationRecord) -> Self {
        Notification {
            id: r.id,
            level: r.level,
            title: r.title,
            message: r.message,
            product_id: r.product_id,
            user_id: r.user_id,
            read: r.read,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        NotificationRepository { pool }
    }

    /// Records and logs a notification. Storage failures are logged and
    /// swallowed.
    pub async fn publish(&self, notification: &Notification) {
        emit(notification);

        let result = sqlx::query(
            r#"
            INSERT INTO notifications (id, level, title, message, product_id, user_id, read, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)
            "#,
        )
        .bind(&notification.id)
        .bind(notification.level)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.product_id)
        .bind(&notification.user_id)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            warn!(error = %e, id = %notification.id, "Failed to store notification");
        }
    }

    pub async fn publish_all(&self, notifications: &[Notification]) {
        for notification in notifications {
            self.publish(notification).await;
        }
    }

    /// Most recent notifications first.
    pub async fn list(&self, unread_only: bool, limit: i64) -> DbResult<Vec<Notification>> {
        let records: Vec<NotificationRecord> = sqlx::query_as(
            r#"
            SELECT id, level, title, message, product_id, user_id, read, created_at
            FROM notifications
            WHERE (?1 = 0 OR read = 0)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(unread_only)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Notification::from).collect())
    }

    /// Notifications addressed to one user.
    pub async fn list_for_user(&self, user_id: &str) -> DbResult<Vec<Notification>> {
        let records: Vec<NotificationRecord> = sqlx::query_as(
            r#"
            SELECT id, level, title, message, product_id, user_id, read, created_at
            FROM notifications
            WHERE user_id = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Notification::from).collect())
    }

    /// Marks one notification read. Returns false if it does not exist.
    pub async fn mark_read(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("UPDATE notifications SET read = 1 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn emit(n: &Notification) {
    match n.level {
        NotificationLevel::Info | NotificationLevel::Success => info!(
            title = %n.title,
            product_id = ?n.product_id,
            user_id = ?n.user_id,
            "{}",
            n.message
        ),
        NotificationLevel::Warning => warn!(
            title = %n.title,
            product_id = ?n.product_id,
            user_id = ?n.user_id,
            "{}",
            n.message
        ),
        NotificationLevel::Error => error!(
            title = %n.title,
            product_id = ?n.product_id,
            user_id = ?n.user_id,
            "{}",
            n.message
        ),
    }
}
