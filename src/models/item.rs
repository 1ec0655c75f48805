//! Item model and related types.
//!
//! An item is held either by one or more people, each with their own copy, or by
//! exactly one community pool. Both shapes are stored as a vector of [`ItemCopy`]
//! so a single owner or a community is just a vector of length one.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::RecordError;

/// Kind of item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    #[default]
    General,
    Book,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::General => "general",
            ItemType::Book => "book",
        }
    }
}

impl FromStr for ItemType {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(ItemType::General),
            "book" => Ok(ItemType::Book),
            other => Err(RecordError::UnknownValue {
                field: "item type",
                value: other.to_string(),
            }),
        }
    }
}

/// Who holds a copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum CopyHolder {
    User(Uuid),
    Community(Uuid),
}

impl CopyHolder {
    pub fn id(&self) -> Uuid {
        match *self {
            CopyHolder::User(id) | CopyHolder::Community(id) => id,
        }
    }
}

/// One holder's instance of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemCopy {
    pub holder: CopyHolder,
    /// Free to lend
    pub is_available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub item_type: ItemType,
    /// Book metadata (author, isbn, category, genre)
    pub extra_data: BTreeMap<String, String>,
    pub copies: Vec<ItemCopy>,
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Item held personally by the given `(user, is_available)` pairs
    pub fn personal(
        id: Uuid,
        title: impl Into<String>,
        owners: impl IntoIterator<Item = (Uuid, bool)>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            item_type: ItemType::General,
            extra_data: BTreeMap::new(),
            copies: owners
                .into_iter()
                .map(|(user_id, is_available)| ItemCopy {
                    holder: CopyHolder::User(user_id),
                    is_available,
                })
                .collect(),
            created_at: Utc::now(),
        }
    }

    /// Item in a community pool
    pub fn community(id: Uuid, title: impl Into<String>, community_id: Uuid, is_available: bool) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            item_type: ItemType::General,
            extra_data: BTreeMap::new(),
            copies: vec![ItemCopy {
                holder: CopyHolder::Community(community_id),
                is_available,
            }],
            created_at: Utc::now(),
        }
    }

    pub fn community_owner(&self) -> Option<Uuid> {
        self.copies.iter().find_map(|copy| match copy.holder {
            CopyHolder::Community(id) => Some(id),
            CopyHolder::User(_) => None,
        })
    }

    pub fn is_community_owned(&self) -> bool {
        self.community_owner().is_some()
    }

    /// Personal owners, in copy order
    pub fn owner_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.copies.iter().filter_map(|copy| match copy.holder {
            CopyHolder::User(id) => Some(id),
            CopyHolder::Community(_) => None,
        })
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_ids().any(|id| id == user_id)
    }

    pub fn copy_of(&self, holder: CopyHolder) -> Option<&ItemCopy> {
        self.copies.iter().find(|copy| copy.holder == holder)
    }

    pub fn copy_of_mut(&mut self, holder: CopyHolder) -> Option<&mut ItemCopy> {
        self.copies.iter_mut().find(|copy| copy.holder == holder)
    }

    fn extra(&self, key: &str) -> Option<&str> {
        self.extra_data.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn author(&self) -> Option<&str> {
        self.extra("author")
    }

    pub fn isbn(&self) -> Option<&str> {
        self.extra("isbn")
    }

    pub fn category(&self) -> Option<&str> {
        self.extra("category")
    }

    pub fn genre(&self) -> Option<&str> {
        self.extra("genre")
    }
}

/// Filter for a collection view; empty fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ItemFilter {
    pub category: Option<String>,
    pub genre: Option<String>,
}

impl ItemFilter {
    pub fn matches(&self, item: &Item) -> bool {
        fn field_matches(wanted: &Option<String>, actual: Option<&str>) -> bool {
            match wanted.as_deref().map(str::trim).filter(|w| !w.is_empty()) {
                None => true,
                Some(wanted) => actual.is_some_and(|a| a.trim().eq_ignore_ascii_case(wanted)),
            }
        }

        field_matches(&self.category, item.category()) && field_matches(&self.genre, item.genre())
    }

    pub fn apply<'a>(&self, items: &'a [Item]) -> Vec<&'a Item> {
        items.iter().filter(|item| self.matches(item)).collect()
    }
}

/// Personal copy as exchanged over the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OwnerCopyRecord {
    pub user_id: Uuid,
    pub is_available: bool,
}

/// Item as exchanged over the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ItemRecord {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub item_type: ItemType,
    #[serde(default)]
    pub extra_data: BTreeMap<String, String>,
    #[serde(default)]
    pub owners: Vec<OwnerCopyRecord>,
    pub community_owner_id: Option<Uuid>,
    /// Availability of the community copy, absent for personal items
    pub community_available: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl From<Item> for ItemRecord {
    fn from(item: Item) -> Self {
        let mut owners = Vec::new();
        let mut community_owner_id = None;
        let mut community_available = None;

        for copy in &item.copies {
            match copy.holder {
                CopyHolder::User(user_id) => owners.push(OwnerCopyRecord {
                    user_id,
                    is_available: copy.is_available,
                }),
                CopyHolder::Community(id) => {
                    community_owner_id = Some(id);
                    community_available = Some(copy.is_available);
                }
            }
        }

        Self {
            id: item.id,
            title: item.title,
            description: item.description,
            item_type: item.item_type,
            extra_data: item.extra_data,
            owners,
            community_owner_id,
            community_available,
            created_at: item.created_at,
        }
    }
}

impl TryFrom<ItemRecord> for Item {
    type Error = RecordError;

    fn try_from(record: ItemRecord) -> Result<Self, Self::Error> {
        let copies = match record.community_owner_id {
            Some(_) if !record.owners.is_empty() => {
                return Err(RecordError::MixedOwnership(record.id))
            }
            Some(community_id) => vec![ItemCopy {
                holder: CopyHolder::Community(community_id),
                is_available: record.community_available.unwrap_or(true),
            }],
            None => record
                .owners
                .iter()
                .map(|owner| ItemCopy {
                    holder: CopyHolder::User(owner.user_id),
                    is_available: owner.is_available,
                })
                .collect(),
        };

        Ok(Item {
            id: record.id,
            title: record.title,
            description: record.description,
            item_type: record.item_type,
            extra_data: record.extra_data,
            copies,
            created_at: record.created_at,
        })
    }
}

/// Create item request
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateItem {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[serde(default)]
    pub item_type: ItemType,
    #[serde(default)]
    pub extra_data: BTreeMap<String, String>,
    /// Place the item in this community's pool instead of the caller's shelf
    pub community_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(category: &str, genre: &str) -> Item {
        let mut item = Item::personal(Uuid::new_v4(), "Dune", [(Uuid::new_v4(), true)]);
        item.item_type = ItemType::Book;
        item.extra_data.insert("category".into(), category.into());
        item.extra_data.insert("genre".into(), genre.into());
        item
    }

    #[test]
    fn test_mixed_ownership_is_rejected() {
        let record = ItemRecord {
            id: Uuid::new_v4(),
            title: "Drill".into(),
            description: None,
            item_type: ItemType::General,
            extra_data: BTreeMap::new(),
            owners: vec![OwnerCopyRecord {
                user_id: Uuid::new_v4(),
                is_available: true,
            }],
            community_owner_id: Some(Uuid::new_v4()),
            community_available: Some(true),
            created_at: Utc::now(),
        };
        assert!(matches!(Item::try_from(record), Err(RecordError::MixedOwnership(_))));
    }

    #[test]
    fn test_community_item_record() {
        let community = Uuid::new_v4();
        let item = Item::community(Uuid::new_v4(), "Tent", community, false);
        let record = ItemRecord::from(item.clone());
        assert!(record.owners.is_empty());
        assert_eq!(record.community_owner_id, Some(community));
        assert_eq!(record.community_available, Some(false));
        assert_eq!(Item::try_from(record).unwrap(), item);
    }

    #[test]
    fn test_filter_by_category_and_genre() {
        let items = vec![book("Fiction", "Sci-Fi"), book("fiction", "Fantasy"), book("History", "")];

        let filter = ItemFilter {
            category: Some("FICTION".into()),
            genre: None,
        };
        assert_eq!(filter.apply(&items).len(), 2);

        let filter = ItemFilter {
            category: Some("fiction".into()),
            genre: Some("sci-fi".into()),
        };
        assert_eq!(filter.apply(&items).len(), 1);

        let filter = ItemFilter {
            category: None,
            genre: Some("Fantasy ".into()),
        };
        assert_eq!(filter.apply(&items)[0].genre(), Some("Fantasy"));

        assert_eq!(ItemFilter::default().apply(&items).len(), 3);
    }

    #[test]
    fn test_empty_extra_values_are_absent() {
        let item = book("History", "");
        assert_eq!(item.category(), Some("History"));
        assert_eq!(item.genre(), None);
        assert_eq!(item.isbn(), None);
    }
}
