//! Availability projection: what an item's status looks like to a given viewer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{CopyHolder, Item, Loan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CopyStatus {
    Available,
    OnLoan,
}

impl CopyStatus {
    fn from_flag(is_available: bool) -> Self {
        if is_available {
            CopyStatus::Available
        } else {
            CopyStatus::OnLoan
        }
    }

    /// Suffix shown next to an owner's name
    pub fn label(&self) -> &'static str {
        match self {
            CopyStatus::Available => "(Available)",
            CopyStatus::OnLoan => "(On Loan)",
        }
    }
}

/// Which copy decided the overall status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum OwnerContext {
    Community(Uuid),
    Viewer(Uuid),
    DisplayOwner(Uuid),
    AnyOwner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyView {
    pub holder: CopyHolder,
    pub status: CopyStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityView {
    pub status: CopyStatus,
    pub context: OwnerContext,
    /// Every copy of the item, in copy order
    pub copies: Vec<CopyView>,
}

impl AvailabilityView {
    pub fn is_available(&self) -> bool {
        self.status == CopyStatus::Available
    }

    pub fn status_of(&self, holder: CopyHolder) -> Option<CopyStatus> {
        self.copies.iter().find(|c| c.holder == holder).map(|c| c.status)
    }
}

/// Project `item` for `viewer`, optionally inside `display_owner`'s collection.
///
/// Precedence: community copy, then the viewer's own copy, then the displayed
/// owner's copy, then "any copy free".
pub fn project(item: &Item, viewer: Uuid, display_owner: Option<Uuid>) -> AvailabilityView {
    let copies: Vec<CopyView> = item
        .copies
        .iter()
        .map(|copy| CopyView {
            holder: copy.holder,
            status: CopyStatus::from_flag(copy.is_available),
        })
        .collect();

    let status_of = |holder: CopyHolder| {
        copies
            .iter()
            .find(|c| c.holder == holder)
            .map(|c| c.status)
    };

    let (status, context) = if let Some(community) = item.community_owner() {
        (
            status_of(CopyHolder::Community(community)).unwrap_or(CopyStatus::OnLoan),
            OwnerContext::Community(community),
        )
    } else if let Some(own) = status_of(CopyHolder::User(viewer)) {
        (own, OwnerContext::Viewer(viewer))
    } else if let Some((owner, shown)) =
        display_owner.and_then(|owner| status_of(CopyHolder::User(owner)).map(|s| (owner, s)))
    {
        (shown, OwnerContext::DisplayOwner(owner))
    } else {
        let any_free = copies.iter().any(|c| c.status == CopyStatus::Available);
        (CopyStatus::from_flag(any_free), OwnerContext::AnyOwner)
    };

    AvailabilityView {
        status,
        context,
        copies,
    }
}

/// A community copy is free unless one of its loans has been handed over.
pub fn community_copy_available<'a>(
    item_id: Uuid,
    community_id: Uuid,
    loans: impl IntoIterator<Item = &'a Loan>,
) -> bool {
    !loans.into_iter().any(|loan| {
        loan.item_id == item_id
            && loan.lender.community_id() == Some(community_id)
            && loan.status.holds_copy()
    })
}
