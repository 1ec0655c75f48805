//! Client core: the command/query facade a UI drives, and the backends it talks to.
//!
//! The facade never mutates state optimistically. Every command is one round trip
//! to the authoritative backend; local checks only reject commands the server
//! would refuse anyway.

pub mod facade;
pub mod push;
pub mod rest;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    lending::{LoanError, LoanErrorKind},
    models::{CreateLoan, Item, Loan, LoanDirection, Notification, NotificationsPage},
};

pub use facade::LoanFacade;
pub use push::PushListener;
pub use rest::RestBackend;

/// Client error types
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Refused locally, before any request was sent
    #[error(transparent)]
    Loan(#[from] LoanError),

    /// Refused by the server with a loan error
    #[error("{message}")]
    Rejected { kind: LoanErrorKind, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Push channel error: {0}")]
    Push(String),
}

impl ClientError {
    /// Loan error kind, whether predicted locally or returned by the server
    pub fn loan_kind(&self) -> Option<LoanErrorKind> {
        match self {
            ClientError::Loan(e) => Some(e.kind()),
            ClientError::Rejected { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// The authoritative side of the loan lifecycle, as seen by one signed-in user
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoanBackend: Send + Sync {
    async fn create_loan(&self, request: &CreateLoan) -> ClientResult<Loan>;

    async fn respond(&self, loan_id: Uuid, accept: bool) -> ClientResult<Loan>;

    async fn ratify(&self, loan_id: Uuid) -> ClientResult<Loan>;

    async fn signal_return(&self, loan_id: Uuid) -> ClientResult<Loan>;

    async fn confirm_return(&self, loan_id: Uuid) -> ClientResult<Loan>;

    async fn get_loan(&self, loan_id: Uuid) -> ClientResult<Loan>;

    /// All loans on one side, newest first
    async fn list_loans(&self, direction: LoanDirection) -> ClientResult<Vec<Loan>>;

    async fn get_item(&self, item_id: Uuid) -> ClientResult<Item>;

    async fn list_notifications(&self) -> ClientResult<NotificationsPage>;

    async fn mark_notification_read(&self, notification_id: Uuid) -> ClientResult<Notification>;
}
