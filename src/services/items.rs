//! Items and their availability

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    lending::{project, AvailabilityView},
    models::{CopyHolder, CreateItem, Item},
    repository::Repository,
};

#[derive(Clone)]
pub struct ItemsService {
    repository: Repository,
}

impl ItemsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Item> {
        self.repository.items.get_by_id(id).await
    }

    /// Create an item on the caller's shelf, or in a community pool they administer
    pub async fn create(&self, user_id: Uuid, item: CreateItem) -> AppResult<Item> {
        let holder = match item.community_id {
            Some(community_id) => {
                let administered = self.repository.communities.administered_by(user_id).await?;
                if !administered.contains(&community_id) {
                    return Err(AppError::Authorization(
                        "Only community admins can add items to the community".to_string(),
                    ));
                }
                CopyHolder::Community(community_id)
            }
            None => CopyHolder::User(user_id),
        };

        let created = self.repository.items.create(holder, &item).await?;
        tracing::info!(item_id = %created.id, "Item created");
        Ok(created)
    }

    /// Availability of an item as seen by `viewer`
    pub async fn availability(
        &self,
        id: Uuid,
        viewer: Uuid,
        display_owner: Option<Uuid>,
    ) -> AppResult<AvailabilityView> {
        let item = self.repository.items.get_by_id(id).await?;
        Ok(project(&item, viewer, display_owner))
    }
}
