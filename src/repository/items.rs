//! Items repository for database operations.
//!
//! Personal copies live in `item_owners`, one row per owner. A community item has
//! no owner rows; its single copy is available unless a loan currently holds it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        item::{CreateItem, ItemRecord, OwnerCopyRecord},
        CopyHolder, Item,
    },
};

/// Item row from database
#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    item_type: String,
    extra_data: Json<BTreeMap<String, String>>,
    community_owner_id: Option<Uuid>,
    community_available: Option<bool>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct OwnerRow {
    user_id: Uuid,
    is_available: bool,
}

#[derive(Clone)]
pub struct ItemsRepository {
    pool: Pool<Postgres>,
}

impl ItemsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // =========================================================================
    // READ
    // =========================================================================

    /// Get item by ID with its copies
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Item> {
        let row = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT i.id, i.title, i.description, i.item_type, i.extra_data,
                   i.community_owner_id,
                   CASE WHEN i.community_owner_id IS NULL THEN NULL
                        ELSE NOT EXISTS(
                            SELECT 1 FROM loans l
                            WHERE l.item_id = i.id AND l.community_id = i.community_owner_id
                              AND l.status IN ('active', 'return_pending'))
                   END AS community_available,
                   i.created_at
            FROM items i
            WHERE i.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))?;

        let owners = sqlx::query_as::<_, OwnerRow>(
            "SELECT user_id, is_available FROM item_owners WHERE item_id = $1 ORDER BY added_at, user_id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let record = ItemRecord {
            id: row.id,
            title: row.title,
            description: row.description,
            item_type: row.item_type.parse()?,
            extra_data: row.extra_data.0,
            owners: owners
                .into_iter()
                .map(|o| OwnerCopyRecord {
                    user_id: o.user_id,
                    is_available: o.is_available,
                })
                .collect(),
            community_owner_id: row.community_owner_id,
            community_available: row.community_available,
            created_at: row.created_at,
        };

        Ok(Item::try_from(record)?)
    }

    // =========================================================================
    // WRITE
    // =========================================================================

    /// Create an item with a single available copy held by `holder`
    pub async fn create(&self, holder: CopyHolder, item: &CreateItem) -> AppResult<Item> {
        let id = Uuid::new_v4();
        let community_owner_id = match holder {
            CopyHolder::Community(community_id) => Some(community_id),
            CopyHolder::User(_) => None,
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO items (id, title, description, item_type, extra_data, community_owner_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(item.title.trim())
        .bind(&item.description)
        .bind(item.item_type.as_str())
        .bind(Json(&item.extra_data))
        .bind(community_owner_id)
        .execute(&mut *tx)
        .await?;

        if let CopyHolder::User(user_id) = holder {
            sqlx::query("INSERT INTO item_owners (item_id, user_id, is_available) VALUES ($1, $2, TRUE)")
                .bind(id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.get_by_id(id).await
    }
}
