//! Notifications repository

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::notification::{NewNotification, Notification, NotificationRow},
};

const NOTIFICATION_COLUMNS: &str = "id, recipient_id, title, message, kind, is_read, link, created_at";

#[derive(Clone)]
pub struct NotificationsRepository {
    pool: Pool<Postgres>,
}

impl NotificationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn create(&self, recipient_id: Uuid, notification: &NewNotification) -> AppResult<Notification> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            INSERT INTO notifications (id, recipient_id, title, message, kind, link)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(recipient_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.kind.as_str())
        .bind(&notification.link)
        .fetch_one(&self.pool)
        .await?;

        Ok(Notification::try_from(row)?)
    }

    /// Newest first, with total and unread counts
    pub async fn list(
        &self,
        recipient_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> AppResult<(Vec<Notification>, i64, i64)> {
        let (total, unread): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COUNT(*) FILTER (WHERE NOT is_read)
            FROM notifications WHERE recipient_id = $1
            "#,
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS} FROM notifications
            WHERE recipient_id = $1
            ORDER BY created_at DESC
            OFFSET $2 LIMIT $3
            "#
        ))
        .bind(recipient_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let notifications = rows
            .into_iter()
            .map(Notification::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((notifications, total, unread))
    }

    /// Mark one of the recipient's notifications as read
    pub async fn mark_read(&self, id: Uuid, recipient_id: Uuid) -> AppResult<Notification> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            UPDATE notifications SET is_read = TRUE
            WHERE id = $1 AND recipient_id = $2
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(recipient_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Notification with id {} not found", id)))?;

        Ok(Notification::try_from(row)?)
    }
}
