//! Loan state machine.
//!
//! ```text
//! pending --respond(accept)--> accepted --ratify--> active --signal return--> return_pending
//!    |                                                 |                            |
//!    +--respond(reject)--> rejected                    +------confirm return-------+--> returned
//! ```
//!
//! Acceptance is only a promise: the copy stays available until the borrower
//! ratifies physical receipt, and only the lender's confirmation frees it again.

use std::{collections::HashSet, fmt};

use chrono::NaiveDate;
use uuid::Uuid;

use super::LoanError;
use crate::models::{CopyHolder, CreateLoan, Item, ItemCopy, Lender, Loan, LoanStatus};

/// Side of a loan an action belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Lender,
    Borrower,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Lender => f.write_str("lender"),
            Role::Borrower => f.write_str("borrower"),
        }
    }
}

/// The user performing an action, with the communities they can lend for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub administered_communities: HashSet<Uuid>,
}

impl Actor {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            administered_communities: HashSet::new(),
        }
    }

    pub fn administering(mut self, communities: impl IntoIterator<Item = Uuid>) -> Self {
        self.administered_communities.extend(communities);
        self
    }

    /// Owner-lender in person, or an admin of the lending community
    pub fn acts_for(&self, lender: &Lender) -> bool {
        match *lender {
            Lender::Owner(owner) => owner == self.user_id,
            Lender::Community(community) => self.administered_communities.contains(&community),
        }
    }

    pub fn role_in(&self, loan: &Loan, role: Role) -> bool {
        match role {
            Role::Lender => self.acts_for(&loan.lender),
            Role::Borrower => loan.requester_id == self.user_id,
        }
    }

    /// Party to the loan on either side
    pub fn is_party_to(&self, loan: &Loan) -> bool {
        self.role_in(loan, Role::Borrower) || self.role_in(loan, Role::Lender)
    }
}

/// An action on an existing loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoanAction {
    Respond { accept: bool },
    Ratify,
    SignalReturn,
    ConfirmReturn,
}

impl LoanAction {
    /// Verb phrase used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            LoanAction::Respond { .. } => "respond to",
            LoanAction::Ratify => "ratify",
            LoanAction::SignalReturn => "signal the return of",
            LoanAction::ConfirmReturn => "confirm the return of",
        }
    }

    pub fn role(&self) -> Role {
        match self {
            LoanAction::Respond { .. } | LoanAction::ConfirmReturn => Role::Lender,
            LoanAction::Ratify | LoanAction::SignalReturn => Role::Borrower,
        }
    }
}

/// What a transition does to the lent copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyEffect {
    Unchanged,
    MarkOnLoan,
    MarkAvailable,
}

impl CopyEffect {
    /// Apply to an in-memory copy. Claiming a copy that is already out fails.
    pub fn apply_to(self, copy: &mut ItemCopy) -> Result<(), LoanError> {
        match self {
            CopyEffect::Unchanged => Ok(()),
            CopyEffect::MarkOnLoan if !copy.is_available => Err(LoanError::CopyNoLongerAvailable),
            CopyEffect::MarkOnLoan => {
                copy.is_available = false;
                Ok(())
            }
            CopyEffect::MarkAvailable => {
                copy.is_available = true;
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: LoanStatus,
    pub to: LoanStatus,
    pub effect: CopyEffect,
}

/// The transition table. Anything not listed is `InvalidState`.
pub fn next_status(from: LoanStatus, action: LoanAction) -> Result<Transition, LoanError> {
    use CopyEffect::*;
    use LoanStatus::*;

    let (to, effect) = match (from, action) {
        (Pending, LoanAction::Respond { accept: true }) => (Accepted, Unchanged),
        (Pending, LoanAction::Respond { accept: false }) => (Rejected, Unchanged),
        (Accepted, LoanAction::Ratify) => (Active, MarkOnLoan),
        (Active, LoanAction::SignalReturn) => (ReturnPending, Unchanged),
        (Active | ReturnPending, LoanAction::ConfirmReturn) => (Returned, MarkAvailable),
        _ => {
            return Err(LoanError::InvalidState {
                status: from,
                action: action.name(),
            })
        }
    };

    Ok(Transition { from, to, effect })
}

impl Loan {
    /// Check `actor` may perform `action`, then look the transition up
    pub fn plan(&self, actor: &Actor, action: LoanAction) -> Result<Transition, LoanError> {
        let role = action.role();
        if !actor.role_in(self, role) {
            return Err(LoanError::NotAuthorized {
                role,
                action: action.name(),
            });
        }
        next_status(self.status, action)
    }

    /// Plan and move to the new status. The copy effect is left to the caller.
    pub fn apply(&mut self, actor: &Actor, action: LoanAction) -> Result<Transition, LoanError> {
        let transition = self.plan(actor, action)?;
        self.status = transition.to;
        Ok(transition)
    }
}

/// A loan may start and end on the same day, never end before it starts
pub fn validate_dates(start: NaiveDate, end: NaiveDate) -> Result<(), LoanError> {
    if start > end {
        return Err(LoanError::InvalidDateRange { start, end });
    }
    Ok(())
}

/// Decide which copy a new request targets.
///
/// Dates and self-lending are checked before availability so those errors do not
/// depend on the state of the copy.
pub fn validate_request(item: &Item, requester: Uuid, request: &CreateLoan) -> Result<Lender, LoanError> {
    validate_dates(request.start_date, request.end_date)?;

    if let Some(community_id) = item.community_owner() {
        return match item.copy_of(CopyHolder::Community(community_id)) {
            Some(copy) if copy.is_available => Ok(Lender::Community(community_id)),
            _ => Err(LoanError::NotAvailable),
        };
    }

    match request.owner_id {
        Some(owner) => {
            if owner == requester {
                return Err(LoanError::SelfLoan);
            }
            match item.copy_of(CopyHolder::User(owner)) {
                Some(copy) if copy.is_available => Ok(Lender::Owner(owner)),
                _ => Err(LoanError::NotAvailable),
            }
        }
        None => {
            if item.is_owned_by(requester) && item.owner_ids().all(|id| id == requester) {
                return Err(LoanError::SelfLoan);
            }
            item.copies
                .iter()
                .find(|copy| copy.is_available && copy.holder != CopyHolder::User(requester))
                .and_then(|copy| match copy.holder {
                    CopyHolder::User(owner) => Some(Lender::Owner(owner)),
                    CopyHolder::Community(_) => None,
                })
                .ok_or(LoanError::NotAvailable)
        }
    }
}
