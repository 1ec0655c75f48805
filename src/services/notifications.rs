//! Notification delivery: persist, then nudge open connections

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        notification::{NewNotification, Notification},
        NotificationsPage, PushEvent,
    },
    repository::Repository,
};

use super::push::PushHub;

#[derive(Clone)]
pub struct NotificationsService {
    repository: Repository,
    hub: Arc<PushHub>,
}

impl NotificationsService {
    pub fn new(repository: Repository, hub: Arc<PushHub>) -> Self {
        Self { repository, hub }
    }

    pub fn hub(&self) -> &Arc<PushHub> {
        &self.hub
    }

    /// Store one notification per recipient and push a `new_notification` frame to each.
    ///
    /// Failures are logged and skipped so one bad recipient does not starve the others.
    pub async fn notify(&self, recipients: &[Uuid], notification: NewNotification) {
        let event = PushEvent::new_notification();

        for &recipient in recipients {
            match self.repository.notifications.create(recipient, &notification).await {
                Ok(stored) => {
                    let reached = self.hub.send_to_user(recipient, &event).await;
                    tracing::debug!(
                        notification_id = %stored.id,
                        recipient = %recipient,
                        connections = reached,
                        "Notification delivered"
                    );
                }
                Err(e) => {
                    tracing::warn!(recipient = %recipient, "Failed to store notification: {}", e);
                }
            }
        }
    }

    pub async fn list(&self, recipient_id: Uuid, skip: i64, limit: i64) -> AppResult<NotificationsPage> {
        let (data, count, unread_count) = self
            .repository
            .notifications
            .list(recipient_id, skip, limit)
            .await?;

        Ok(NotificationsPage {
            data,
            count,
            unread_count,
        })
    }

    pub async fn mark_read(&self, id: Uuid, recipient_id: Uuid) -> AppResult<Notification> {
        self.repository.notifications.mark_read(id, recipient_id).await
    }
}
