//! Loan lifecycle core.
//!
//! Pure functions only: the transition table for loans ([`machine`]) and the
//! availability projection for items ([`availability`]). The server applies their
//! results inside a database transaction; the client facade uses them to reject
//! doomed commands before a round trip.

pub mod availability;
pub mod machine;

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::LoanStatus;

pub use availability::{
    community_copy_available, project, AvailabilityView, CopyStatus, CopyView, OwnerContext,
};
pub use machine::{
    next_status, validate_dates, validate_request, Actor, CopyEffect, LoanAction, Role, Transition,
};

/// Why a loan command was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoanError {
    #[error("Cannot {action} a loan that is {status}")]
    InvalidState {
        status: LoanStatus,
        action: &'static str,
    },

    #[error("Only the {role} can {action} this loan")]
    NotAuthorized { role: Role, action: &'static str },

    #[error("This item is not available for loan right now")]
    NotAvailable,

    #[error("The loan cannot end ({end}) before it starts ({start})")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("You cannot borrow your own item")]
    SelfLoan,

    #[error("This copy has already been handed to another borrower")]
    CopyNoLongerAvailable,
}

/// Wire name of a [`LoanError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum LoanErrorKind {
    InvalidState,
    NotAuthorized,
    NotAvailable,
    InvalidDateRange,
    SelfLoan,
    CopyNoLongerAvailable,
}

impl LoanError {
    pub fn kind(&self) -> LoanErrorKind {
        match self {
            LoanError::InvalidState { .. } => LoanErrorKind::InvalidState,
            LoanError::NotAuthorized { .. } => LoanErrorKind::NotAuthorized,
            LoanError::NotAvailable => LoanErrorKind::NotAvailable,
            LoanError::InvalidDateRange { .. } => LoanErrorKind::InvalidDateRange,
            LoanError::SelfLoan => LoanErrorKind::SelfLoan,
            LoanError::CopyNoLongerAvailable => LoanErrorKind::CopyNoLongerAvailable,
        }
    }
}

impl LoanErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanErrorKind::InvalidState => "InvalidState",
            LoanErrorKind::NotAuthorized => "NotAuthorized",
            LoanErrorKind::NotAvailable => "NotAvailable",
            LoanErrorKind::InvalidDateRange => "InvalidDateRange",
            LoanErrorKind::SelfLoan => "SelfLoan",
            LoanErrorKind::CopyNoLongerAvailable => "CopyNoLongerAvailable",
        }
    }
}

impl fmt::Display for LoanErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanErrorKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "InvalidState" => Ok(LoanErrorKind::InvalidState),
            "NotAuthorized" => Ok(LoanErrorKind::NotAuthorized),
            "NotAvailable" => Ok(LoanErrorKind::NotAvailable),
            "InvalidDateRange" => Ok(LoanErrorKind::InvalidDateRange),
            "SelfLoan" => Ok(LoanErrorKind::SelfLoan),
            "CopyNoLongerAvailable" => Ok(LoanErrorKind::CopyNoLongerAvailable),
            _ => Err(()),
        }
    }
}
