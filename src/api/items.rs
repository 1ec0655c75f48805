//! Item endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    lending::{AvailabilityView, CopyStatus, OwnerContext},
    models::{CopyHolder, CreateItem, ItemRecord},
    AppState,
};

use super::AuthenticatedUser;

/// Availability query parameters
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailabilityQuery {
    /// Owner whose collection is being browsed
    pub display_owner_id: Option<Uuid>,
}

/// One copy's status
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CopyAvailability {
    /// `user` or `community`
    pub holder_kind: String,
    pub holder_id: Uuid,
    pub status: CopyStatus,
    /// Suffix shown next to the holder's name
    pub label: String,
}

/// Item availability as seen by the caller
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityResponse {
    pub item_id: Uuid,
    pub status: CopyStatus,
    /// `community`, `viewer`, `display_owner` or `any_owner`
    pub decided_by: String,
    /// Holder whose copy decided the status, if a single one did
    pub decided_by_id: Option<Uuid>,
    pub copies: Vec<CopyAvailability>,
}

impl AvailabilityResponse {
    fn new(item_id: Uuid, view: AvailabilityView) -> Self {
        let (decided_by, decided_by_id) = match view.context {
            OwnerContext::Community(id) => ("community", Some(id)),
            OwnerContext::Viewer(id) => ("viewer", Some(id)),
            OwnerContext::DisplayOwner(id) => ("display_owner", Some(id)),
            OwnerContext::AnyOwner => ("any_owner", None),
        };

        Self {
            item_id,
            status: view.status,
            decided_by: decided_by.to_string(),
            decided_by_id,
            copies: view
                .copies
                .into_iter()
                .map(|copy| CopyAvailability {
                    holder_kind: match copy.holder {
                        CopyHolder::User(_) => "user".to_string(),
                        CopyHolder::Community(_) => "community".to_string(),
                    },
                    holder_id: copy.holder.id(),
                    status: copy.status,
                    label: copy.status.label().to_string(),
                })
                .collect(),
        }
    }
}

/// Get item details with its copies
#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item details", body = ItemRecord),
        (status = 404, description = "Item not found")
    )
)]
pub async fn get_item(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ItemRecord>> {
    let item = state.services.items.get(id).await?;
    Ok(Json(item.into()))
}

/// Create an item on the caller's shelf or in a community they administer
#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    security(("bearer_auth" = [])),
    request_body = CreateItem,
    responses(
        (status = 201, description = "Item created", body = ItemRecord),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Not an admin of the community")
    )
)]
pub async fn create_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(item): Json<CreateItem>,
) -> AppResult<(StatusCode, Json<ItemRecord>)> {
    item.validate()?;

    let created = state.services.items.create(claims.user_id(), item).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Availability of an item for the caller
#[utoipa::path(
    get,
    path = "/items/{id}/availability",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Item ID"),
        AvailabilityQuery
    ),
    responses(
        (status = 200, description = "Projected availability", body = AvailabilityResponse),
        (status = 404, description = "Item not found")
    )
)]
pub async fn get_availability(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<AvailabilityResponse>> {
    let view = state
        .services
        .items
        .availability(id, claims.user_id(), query.display_owner_id)
        .await?;

    Ok(Json(AvailabilityResponse::new(id, view)))
}
