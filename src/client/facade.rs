//! Command and query facade over a [`LoanBackend`]

use std::collections::HashMap;

use chrono::NaiveDate;
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

use crate::{
    lending::{project, validate_dates, validate_request, Actor, AvailabilityView, LoanAction},
    models::{CreateLoan, Item, Loan, LoanDirection, Notification, NotificationsPage},
};

use super::{ClientResult, LoanBackend};

/// Last known server views. Dropped wholesale on push events.
#[derive(Default)]
struct ViewCache {
    loans: RwLock<HashMap<Uuid, Loan>>,
    lists: RwLock<HashMap<LoanDirection, Vec<Uuid>>>,
    items: RwLock<HashMap<Uuid, Item>>,
}

/// What a UI calls to drive loans for one signed-in user.
///
/// Commands are checked locally where the outcome is already known, then sent to
/// the backend; the loan it returns replaces the cached one. Subscribers to
/// [`LoanFacade::changes`] are told to re-read after every command or push event.
pub struct LoanFacade<B> {
    backend: B,
    actor: Actor,
    cache: ViewCache,
    generation: watch::Sender<u64>,
}

impl<B: LoanBackend> LoanFacade<B> {
    pub fn new(backend: B, actor: Actor) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            backend,
            actor,
            cache: ViewCache::default(),
            generation,
        }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Receiver bumped whenever cached views may be stale
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    /// Ask to borrow the first free copy of an item
    pub async fn request_loan(
        &self,
        item_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> ClientResult<Loan> {
        self.submit_request(CreateLoan {
            item_id,
            start_date,
            end_date,
            owner_id: None,
        })
        .await
    }

    /// Ask to borrow one co-owner's copy
    pub async fn request_loan_from(
        &self,
        item_id: Uuid,
        owner_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> ClientResult<Loan> {
        self.submit_request(CreateLoan {
            item_id,
            start_date,
            end_date,
            owner_id: Some(owner_id),
        })
        .await
    }

    async fn submit_request(&self, request: CreateLoan) -> ClientResult<Loan> {
        validate_dates(request.start_date, request.end_date)?;

        // Availability must be current, so the item is always re-read.
        let item = self.backend.get_item(request.item_id).await?;
        let checked = validate_request(&item, self.actor.user_id, &request);
        self.cache.items.write().await.insert(item.id, item);
        checked?;

        let loan = self.backend.create_loan(&request).await?;
        tracing::debug!(loan_id = %loan.id, "Loan requested");
        self.store(loan.clone()).await;
        Ok(loan)
    }

    /// Accept or reject a pending request (lender)
    pub async fn respond_to_request(&self, loan_id: Uuid, accept: bool) -> ClientResult<Loan> {
        self.predict(loan_id, LoanAction::Respond { accept }).await?;
        let loan = self.backend.respond(loan_id, accept).await?;
        self.store(loan.clone()).await;
        Ok(loan)
    }

    /// Confirm receipt of the item (borrower)
    pub async fn ratify(&self, loan_id: Uuid) -> ClientResult<Loan> {
        self.predict(loan_id, LoanAction::Ratify).await?;
        let loan = self.backend.ratify(loan_id).await?;
        self.store(loan.clone()).await;
        Ok(loan)
    }

    /// Say the item has been handed back (borrower)
    pub async fn signal_return(&self, loan_id: Uuid) -> ClientResult<Loan> {
        self.predict(loan_id, LoanAction::SignalReturn).await?;
        let loan = self.backend.signal_return(loan_id).await?;
        self.store(loan.clone()).await;
        Ok(loan)
    }

    /// Confirm the item is back (lender)
    pub async fn confirm_return(&self, loan_id: Uuid) -> ClientResult<Loan> {
        self.predict(loan_id, LoanAction::ConfirmReturn).await?;
        let loan = self.backend.confirm_return(loan_id).await?;
        self.store(loan.clone()).await;
        Ok(loan)
    }

    pub async fn mark_notification_read(&self, notification_id: Uuid) -> ClientResult<Notification> {
        self.backend.mark_notification_read(notification_id).await
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Loans on one side, newest first
    pub async fn loans(&self, direction: LoanDirection) -> ClientResult<Vec<Loan>> {
        if let Some(ids) = self.cache.lists.read().await.get(&direction) {
            let loans = self.cache.loans.read().await;
            if let Some(cached) = ids.iter().map(|id| loans.get(id).cloned()).collect::<Option<Vec<_>>>() {
                return Ok(cached);
            }
        }

        let fetched = self.backend.list_loans(direction).await?;
        {
            let mut loans = self.cache.loans.write().await;
            for loan in &fetched {
                loans.insert(loan.id, loan.clone());
            }
        }
        self.cache
            .lists
            .write()
            .await
            .insert(direction, fetched.iter().map(|loan| loan.id).collect());

        Ok(fetched)
    }

    pub async fn loan(&self, loan_id: Uuid) -> ClientResult<Loan> {
        if let Some(loan) = self.cache.loans.read().await.get(&loan_id) {
            return Ok(loan.clone());
        }
        let loan = self.backend.get_loan(loan_id).await?;
        self.cache.loans.write().await.insert(loan.id, loan.clone());
        Ok(loan)
    }

    pub async fn item(&self, item_id: Uuid) -> ClientResult<Item> {
        if let Some(item) = self.cache.items.read().await.get(&item_id) {
            return Ok(item.clone());
        }
        let item = self.backend.get_item(item_id).await?;
        self.cache.items.write().await.insert(item.id, item.clone());
        Ok(item)
    }

    /// Project an item's availability for `viewer_id`, optionally within `display_owner_id`'s collection
    pub fn project_availability(
        &self,
        item: &Item,
        viewer_id: Uuid,
        display_owner_id: Option<Uuid>,
    ) -> AvailabilityView {
        project(item, viewer_id, display_owner_id)
    }

    /// Fetch an item and project it for the signed-in user.
    ///
    /// Copy flags change on other users' commands, so the item is always re-read.
    pub async fn availability(&self, item_id: Uuid, display_owner_id: Option<Uuid>) -> ClientResult<AvailabilityView> {
        let item = self.backend.get_item(item_id).await?;
        self.cache.items.write().await.insert(item.id, item.clone());
        Ok(self.project_availability(&item, self.actor.user_id, display_owner_id))
    }

    pub async fn notifications(&self) -> ClientResult<NotificationsPage> {
        self.backend.list_notifications().await
    }

    // =========================================================================
    // CACHE
    // =========================================================================

    /// Forget every cached view and tell subscribers to re-read
    pub async fn invalidate(&self) {
        self.cache.loans.write().await.clear();
        self.cache.lists.write().await.clear();
        self.cache.items.write().await.clear();
        self.bump();
    }

    /// Refuse locally only when the server's current loan rules the action out.
    ///
    /// A cached loan that forbids the action may be behind the server, so it is
    /// re-read before refusing. No cached loan means the server decides.
    async fn predict(&self, loan_id: Uuid, action: LoanAction) -> ClientResult<()> {
        let cached = self.cache.loans.read().await.get(&loan_id).cloned();
        let Some(cached) = cached else {
            return Ok(());
        };
        if cached.plan(&self.actor, action).is_ok() {
            return Ok(());
        }

        let current = self.backend.get_loan(loan_id).await?;
        let verdict = current.plan(&self.actor, action);
        if current.status != cached.status {
            tracing::debug!(%loan_id, from = ?cached.status, to = ?current.status, "Cached loan was stale");
            self.store(current).await;
        }
        verdict?;
        Ok(())
    }

    /// Record the server's loan and drop the views it may have changed
    async fn store(&self, loan: Loan) {
        self.cache.lists.write().await.clear();
        // The copy flag may have flipped.
        self.cache.items.write().await.remove(&loan.item_id);
        self.cache.loans.write().await.insert(loan.id, loan);
        self.bump();
    }

    fn bump(&self) {
        self.generation.send_modify(|generation| *generation += 1);
    }
}
