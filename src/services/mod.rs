//! Business logic services

pub mod items;
pub mod loans;
pub mod notifications;
pub mod push;

use std::sync::Arc;

use crate::{error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub items: items::ItemsService,
    pub loans: loans::LoansService,
    pub notifications: notifications::NotificationsService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, hub: Arc<push::PushHub>) -> Self {
        let notifications = notifications::NotificationsService::new(repository.clone(), hub);
        Self {
            items: items::ItemsService::new(repository.clone()),
            loans: loans::LoansService::new(repository.clone(), notifications.clone()),
            notifications,
            repository,
        }
    }

    /// Database reachability, for readiness probes
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}
