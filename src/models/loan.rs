//! Loan model and related types

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::{item::CopyHolder, RecordError};

/// Lifecycle status of a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Pending,
    Accepted,
    Rejected,
    Active,
    ReturnPending,
    Returned,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Accepted => "accepted",
            LoanStatus::Rejected => "rejected",
            LoanStatus::Active => "active",
            LoanStatus::ReturnPending => "return_pending",
            LoanStatus::Returned => "returned",
        }
    }

    /// `rejected` and `returned` accept no further actions
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::Rejected | LoanStatus::Returned)
    }

    /// The borrower physically holds the copy
    pub fn holds_copy(&self) -> bool {
        matches!(self, LoanStatus::Active | LoanStatus::ReturnPending)
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanStatus {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(LoanStatus::Pending),
            "accepted" => Ok(LoanStatus::Accepted),
            "rejected" => Ok(LoanStatus::Rejected),
            "active" => Ok(LoanStatus::Active),
            "return_pending" => Ok(LoanStatus::ReturnPending),
            "returned" => Ok(LoanStatus::Returned),
            other => Err(RecordError::UnknownValue {
                field: "loan status",
                value: other.to_string(),
            }),
        }
    }
}

/// Counterparty lending the copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lender {
    Owner(Uuid),
    Community(Uuid),
}

impl Lender {
    /// The copy this lender lends out
    pub fn holder(&self) -> CopyHolder {
        match *self {
            Lender::Owner(id) => CopyHolder::User(id),
            Lender::Community(id) => CopyHolder::Community(id),
        }
    }

    pub fn owner_id(&self) -> Option<Uuid> {
        match *self {
            Lender::Owner(id) => Some(id),
            Lender::Community(_) => None,
        }
    }

    pub fn community_id(&self) -> Option<Uuid> {
        match *self {
            Lender::Community(id) => Some(id),
            Lender::Owner(_) => None,
        }
    }
}

/// A borrow request and its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loan {
    pub id: Uuid,
    pub item_id: Uuid,
    pub requester_id: Uuid,
    pub lender: Lender,
    /// First day of the loan (inclusive)
    pub start_date: NaiveDate,
    /// Last day of the loan (inclusive)
    pub end_date: NaiveDate,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
}

/// Loan as exchanged over the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LoanRecord {
    pub id: Uuid,
    pub item_id: Uuid,
    pub requester_id: Uuid,
    /// Set when a person lends their own copy
    pub owner_id: Option<Uuid>,
    /// Set when a community lends its pooled copy
    pub community_id: Option<Uuid>,
    pub status: LoanStatus,
    #[schema(value_type = String, format = Date)]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = Date)]
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl From<Loan> for LoanRecord {
    fn from(loan: Loan) -> Self {
        Self {
            id: loan.id,
            item_id: loan.item_id,
            requester_id: loan.requester_id,
            owner_id: loan.lender.owner_id(),
            community_id: loan.lender.community_id(),
            status: loan.status,
            start_date: loan.start_date,
            end_date: loan.end_date,
            created_at: loan.created_at,
        }
    }
}

impl TryFrom<LoanRecord> for Loan {
    type Error = RecordError;

    fn try_from(record: LoanRecord) -> Result<Self, Self::Error> {
        let lender = match (record.owner_id, record.community_id) {
            (Some(owner), None) => Lender::Owner(owner),
            (None, Some(community)) => Lender::Community(community),
            _ => return Err(RecordError::AmbiguousLender(record.id)),
        };

        Ok(Loan {
            id: record.id,
            item_id: record.item_id,
            requester_id: record.requester_id,
            lender,
            start_date: record.start_date,
            end_date: record.end_date,
            status: record.status,
            created_at: record.created_at,
        })
    }
}

/// Create loan request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreateLoan {
    pub item_id: Uuid,
    #[schema(value_type = String, format = Date)]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = Date)]
    pub end_date: NaiveDate,
    /// Co-owner whose copy is requested; the first free copy when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Uuid>,
}

/// Answer to a pending request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct RespondLoan {
    pub accept: bool,
}

/// Which side of a loan the caller is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanDirection {
    /// Caller is the lender (owner or community admin)
    Incoming,
    /// Caller is the borrower
    Outgoing,
}

impl LoanDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanDirection::Incoming => "incoming",
            LoanDirection::Outgoing => "outgoing",
        }
    }
}

/// Loan list query parameters
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoanQuery {
    pub direction: LoanDirection,
    #[validate(range(min = 0))]
    pub skip: Option<i64>,
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<i64>,
}

/// Paginated loans
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoansPage {
    pub data: Vec<LoanRecord>,
    pub count: i64,
}
