//! Data models for Lendshelf

pub mod item;
pub mod loan;
pub mod notification;
pub mod user;

// Re-export commonly used types
pub use item::{CopyHolder, CreateItem, Item, ItemCopy, ItemFilter, ItemRecord, ItemType};
pub use loan::{CreateLoan, Lender, Loan, LoanDirection, LoanRecord, LoanStatus, LoansPage};
pub use notification::{Notification, NotificationKind, NotificationsPage, PushEvent};
pub use user::UserClaims;

use uuid::Uuid;

/// A wire or database record that cannot be turned into a domain value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("item {0} has both personal owners and a community owner")]
    MixedOwnership(Uuid),

    #[error("loan {0} must name exactly one of owner_id or community_id")]
    AmbiguousLender(Uuid),

    #[error("unknown {field} value '{value}'")]
    UnknownValue { field: &'static str, value: String },
}
