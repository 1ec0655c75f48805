//! Loan lifecycle scenarios driven through the facade against an in-memory server

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use lendshelf::{
    client::{ClientError, ClientResult, LoanBackend, LoanFacade},
    lending::{
        community_copy_available, validate_request, Actor, CopyEffect, CopyStatus, LoanAction,
        LoanError, LoanErrorKind, OwnerContext,
    },
    models::{
        CopyHolder, CreateLoan, Item, Lender, Loan, LoanDirection, LoanStatus, Notification,
        NotificationKind, NotificationsPage,
    },
};

/// Authoritative state shared by every session
#[derive(Default)]
struct World {
    items: HashMap<Uuid, Item>,
    /// In creation order
    loans: Vec<Loan>,
    notifications: Vec<Notification>,
}

impl World {
    fn loan_mut(&mut self, id: Uuid) -> ClientResult<&mut Loan> {
        self.loans
            .iter_mut()
            .find(|loan| loan.id == id)
            .ok_or_else(|| ClientError::NotFound(format!("Loan with id {} not found", id)))
    }

    fn notify(&mut self, recipient_id: Uuid, title: &str) {
        self.notifications.push(Notification {
            id: Uuid::new_v4(),
            recipient_id,
            title: title.to_string(),
            message: String::new(),
            kind: NotificationKind::Info,
            is_read: false,
            link: Some("/loans".to_string()),
            created_at: Utc::now(),
        });
    }

    /// Copy side effect, with the same guards the database applies
    fn apply_effect(&mut self, loan: &Loan, effect: CopyEffect) -> Result<(), LoanError> {
        match loan.lender {
            Lender::Owner(owner) => {
                let copy = self
                    .items
                    .get_mut(&loan.item_id)
                    .and_then(|item| item.copy_of_mut(CopyHolder::User(owner)))
                    .ok_or(LoanError::NotAvailable)?;
                effect.apply_to(copy)
            }
            Lender::Community(community) => {
                let free = community_copy_available(loan.item_id, community, self.loans.iter());
                if effect == CopyEffect::MarkOnLoan && !free {
                    return Err(LoanError::CopyNoLongerAvailable);
                }
                Ok(())
            }
        }
    }
}

#[derive(Default)]
struct Server {
    world: Mutex<World>,
}

impl Server {
    fn add_item(&self, item: Item) -> Uuid {
        let id = item.id;
        self.world.lock().unwrap().items.insert(id, item);
        id
    }
}

/// What the server sends back for a refused loan command
fn rejected(e: LoanError) -> ClientError {
    ClientError::Rejected {
        kind: e.kind(),
        message: e.to_string(),
    }
}

/// One signed-in user's view of the server
struct Session {
    server: Arc<Server>,
    actor: Actor,
}

impl Session {
    fn transition(&self, loan_id: Uuid, action: LoanAction) -> ClientResult<Loan> {
        let mut world = self.server.world.lock().unwrap();
        let mut loan = world.loan_mut(loan_id)?.clone();

        let transition = loan.apply(&self.actor, action).map_err(rejected)?;
        world.apply_effect(&loan, transition.effect).map_err(rejected)?;
        *world.loan_mut(loan_id)? = loan.clone();

        Ok(loan)
    }
}

#[async_trait]
impl LoanBackend for Session {
    async fn create_loan(&self, request: &CreateLoan) -> ClientResult<Loan> {
        let mut world = self.server.world.lock().unwrap();
        let item = world
            .items
            .get(&request.item_id)
            .ok_or_else(|| ClientError::NotFound("Item not found".into()))?;
        let lender = validate_request(item, self.actor.user_id, request).map_err(rejected)?;

        let loan = Loan {
            id: Uuid::new_v4(),
            item_id: request.item_id,
            requester_id: self.actor.user_id,
            lender,
            start_date: request.start_date,
            end_date: request.end_date,
            status: LoanStatus::Pending,
            created_at: Utc::now(),
        };
        world.loans.push(loan.clone());
        if let Lender::Owner(owner) = lender {
            world.notify(owner, "New Loan Request");
        }
        Ok(loan)
    }

    async fn respond(&self, loan_id: Uuid, accept: bool) -> ClientResult<Loan> {
        self.transition(loan_id, LoanAction::Respond { accept })
    }

    async fn ratify(&self, loan_id: Uuid) -> ClientResult<Loan> {
        self.transition(loan_id, LoanAction::Ratify)
    }

    async fn signal_return(&self, loan_id: Uuid) -> ClientResult<Loan> {
        self.transition(loan_id, LoanAction::SignalReturn)
    }

    async fn confirm_return(&self, loan_id: Uuid) -> ClientResult<Loan> {
        self.transition(loan_id, LoanAction::ConfirmReturn)
    }

    async fn get_loan(&self, loan_id: Uuid) -> ClientResult<Loan> {
        let mut world = self.server.world.lock().unwrap();
        Ok(world.loan_mut(loan_id)?.clone())
    }

    async fn list_loans(&self, direction: LoanDirection) -> ClientResult<Vec<Loan>> {
        let world = self.server.world.lock().unwrap();
        Ok(world
            .loans
            .iter()
            .rev()
            .filter(|loan| match direction {
                LoanDirection::Incoming => self.actor.acts_for(&loan.lender),
                LoanDirection::Outgoing => loan.requester_id == self.actor.user_id,
            })
            .cloned()
            .collect())
    }

    async fn get_item(&self, item_id: Uuid) -> ClientResult<Item> {
        let world = self.server.world.lock().unwrap();
        let mut item = world
            .items
            .get(&item_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound("Item not found".into()))?;

        if let Some(community) = item.community_owner() {
            let free = community_copy_available(item_id, community, world.loans.iter());
            if let Some(copy) = item.copy_of_mut(CopyHolder::Community(community)) {
                copy.is_available = free;
            }
        }
        Ok(item)
    }

    async fn list_notifications(&self) -> ClientResult<NotificationsPage> {
        let world = self.server.world.lock().unwrap();
        let data: Vec<Notification> = world
            .notifications
            .iter()
            .rev()
            .filter(|n| n.recipient_id == self.actor.user_id)
            .cloned()
            .collect();
        let unread_count = data.iter().filter(|n| !n.is_read).count() as i64;

        Ok(NotificationsPage {
            count: data.len() as i64,
            unread_count,
            data,
        })
    }

    async fn mark_notification_read(&self, notification_id: Uuid) -> ClientResult<Notification> {
        let mut world = self.server.world.lock().unwrap();
        let notification = world
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.recipient_id == self.actor.user_id)
            .ok_or_else(|| ClientError::NotFound("Notification not found".into()))?;
        notification.is_read = true;
        Ok(notification.clone())
    }
}

fn sign_in(server: &Arc<Server>, actor: Actor) -> LoanFacade<Session> {
    LoanFacade::new(
        Session {
            server: server.clone(),
            actor: actor.clone(),
        },
        actor,
    )
}

fn user(server: &Arc<Server>) -> (Uuid, LoanFacade<Session>) {
    let id = Uuid::new_v4();
    (id, sign_in(server, Actor::new(id)))
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_lend_and_return_scenario() {
    let server = Arc::new(Server::default());
    let (u1, owner) = user(&server);
    let (_u2, borrower) = user(&server);
    let item_x = server.add_item(Item::personal(Uuid::new_v4(), "Camping stove", [(u1, true)]));

    let loan = borrower
        .request_loan(item_x, date(2024, 1, 1), date(2024, 1, 10))
        .await
        .unwrap();
    assert_eq!(loan.status, LoanStatus::Pending);
    assert_eq!(loan.lender, Lender::Owner(u1));

    let notifications = owner.notifications().await.unwrap();
    assert_eq!(notifications.unread_count, 1);
    assert_eq!(notifications.data[0].title, "New Loan Request");
    assert!(owner.mark_notification_read(notifications.data[0].id).await.unwrap().is_read);

    let loan = owner.respond_to_request(loan.id, true).await.unwrap();
    assert_eq!(loan.status, LoanStatus::Accepted);
    // Accepting does not take the copy off the shelf.
    assert!(owner.availability(item_x, None).await.unwrap().is_available());

    // No push reaches either side; the facades must still act on current state.
    let loan = borrower.ratify(loan.id).await.unwrap();
    assert_eq!(loan.status, LoanStatus::Active);
    let view = owner.availability(item_x, None).await.unwrap();
    assert_eq!(view.status, CopyStatus::OnLoan);
    assert_eq!(view.context, OwnerContext::Viewer(u1));

    let loan = borrower.signal_return(loan.id).await.unwrap();
    assert_eq!(loan.status, LoanStatus::ReturnPending);
    assert_eq!(
        owner.availability(item_x, None).await.unwrap().status,
        CopyStatus::OnLoan
    );

    let loan = owner.confirm_return(loan.id).await.unwrap();
    assert_eq!(loan.status, LoanStatus::Returned);
    let view = owner.availability(item_x, None).await.unwrap();
    assert_eq!(view.status_of(CopyHolder::User(u1)), Some(CopyStatus::Available));
}

#[tokio::test]
async fn test_only_one_accepted_request_can_be_ratified() {
    let server = Arc::new(Server::default());
    let (u1, owner) = user(&server);
    let (_, first) = user(&server);
    let (_, second) = user(&server);
    let item = server.add_item(Item::personal(Uuid::new_v4(), "Projector", [(u1, true)]));

    let l1 = first.request_loan(item, date(2024, 2, 1), date(2024, 2, 3)).await.unwrap();
    let l2 = second.request_loan(item, date(2024, 2, 5), date(2024, 2, 7)).await.unwrap();
    assert_ok!(owner.respond_to_request(l1.id, true).await);
    assert_ok!(owner.respond_to_request(l2.id, true).await);

    assert_ok!(first.ratify(l1.id).await);
    let err = assert_err!(second.ratify(l2.id).await);
    assert_eq!(err.loan_kind(), Some(LoanErrorKind::CopyNoLongerAvailable));
    assert_eq!(second.loan(l2.id).await.unwrap().status, LoanStatus::Accepted);

    // Once the first borrower is done, the second can take the copy.
    assert_ok!(first.signal_return(l1.id).await);
    assert_ok!(owner.confirm_return(l1.id).await);
    assert_eq!(second.ratify(l2.id).await.unwrap().status, LoanStatus::Active);
}

#[tokio::test]
async fn test_outgoing_round_trip() {
    let server = Arc::new(Server::default());
    let (u1, owner) = user(&server);
    let (_, borrower) = user(&server);
    let item = server.add_item(Item::personal(Uuid::new_v4(), "Kayak", [(u1, true)]));

    let requested = borrower
        .request_loan(item, date(2024, 6, 1), date(2024, 6, 14))
        .await
        .unwrap();

    let outgoing = borrower.loans(LoanDirection::Outgoing).await.unwrap();
    assert_eq!(outgoing.len(), 1);
    assert_eq!(outgoing[0].item_id, item);
    assert_eq!(outgoing[0].start_date, requested.start_date);
    assert_eq!(outgoing[0].end_date, requested.end_date);
    assert_eq!(outgoing[0].status, LoanStatus::Pending);

    assert_eq!(owner.loans(LoanDirection::Incoming).await.unwrap().len(), 1);
    assert!(owner.loans(LoanDirection::Outgoing).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_multi_owner_projection() {
    let server = Arc::new(Server::default());
    let (a, viewer_a) = user(&server);
    let (b, viewer_b) = user(&server);
    let (_, stranger) = user(&server);
    let item = server.add_item(Item::personal(Uuid::new_v4(), "Board game", [(a, true), (b, false)]));

    assert!(viewer_a.availability(item, None).await.unwrap().is_available());
    assert_eq!(
        viewer_b.availability(item, None).await.unwrap().status,
        CopyStatus::OnLoan
    );

    let view = stranger.availability(item, None).await.unwrap();
    assert_eq!(view.status, CopyStatus::Available);
    assert_eq!(view.context, OwnerContext::AnyOwner);
    assert_eq!(view.status_of(CopyHolder::User(a)), Some(CopyStatus::Available));
    assert_eq!(view.status_of(CopyHolder::User(b)), Some(CopyStatus::OnLoan));

    // Browsing B's collection shows B's copy.
    let view = stranger.availability(item, Some(b)).await.unwrap();
    assert_eq!(view.status, CopyStatus::OnLoan);

    // The free copy is the one requested.
    let loan = stranger.request_loan(item, date(2024, 3, 1), date(2024, 3, 2)).await.unwrap();
    assert_eq!(loan.lender, Lender::Owner(a));
    let err = assert_err!(
        stranger
            .request_loan_from(item, b, date(2024, 3, 1), date(2024, 3, 2))
            .await
    );
    assert_eq!(err.loan_kind(), Some(LoanErrorKind::NotAvailable));
}

#[tokio::test]
async fn test_request_checks_do_not_depend_on_availability() {
    let server = Arc::new(Server::default());
    let (u1, owner) = user(&server);
    let (_, borrower) = user(&server);
    let item = server.add_item(Item::personal(Uuid::new_v4(), "Saw", [(u1, false)]));

    let err = assert_err!(borrower.request_loan(item, date(2024, 5, 2), date(2024, 5, 1)).await);
    assert_eq!(err.loan_kind(), Some(LoanErrorKind::InvalidDateRange));

    let err = assert_err!(owner.request_loan(item, date(2024, 5, 1), date(2024, 5, 2)).await);
    assert_eq!(err.loan_kind(), Some(LoanErrorKind::SelfLoan));

    let err = assert_err!(borrower.request_loan(item, date(2024, 5, 1), date(2024, 5, 1)).await);
    assert_eq!(err.loan_kind(), Some(LoanErrorKind::NotAvailable));
}

#[tokio::test]
async fn test_community_loan_needs_an_admin() {
    let server = Arc::new(Server::default());
    let community = Uuid::new_v4();
    let admin_id = Uuid::new_v4();
    let admin = sign_in(&server, Actor::new(admin_id).administering([community]));
    let (_, member) = user(&server);
    let (_, borrower) = user(&server);
    let item = server.add_item(Item::community(Uuid::new_v4(), "Pressure washer", community, true));

    let loan = borrower.request_loan(item, date(2024, 7, 1), date(2024, 7, 2)).await.unwrap();
    assert_eq!(loan.lender, Lender::Community(community));

    let err = assert_err!(member.respond_to_request(loan.id, true).await);
    assert_eq!(err.loan_kind(), Some(LoanErrorKind::NotAuthorized));

    assert_eq!(admin.loans(LoanDirection::Incoming).await.unwrap().len(), 1);
    assert_ok!(admin.respond_to_request(loan.id, true).await);
    assert_ok!(borrower.ratify(loan.id).await);

    let view = member.availability(item, None).await.unwrap();
    assert_eq!(view.status, CopyStatus::OnLoan);
    assert_eq!(view.context, OwnerContext::Community(community));

    // Only the lender side may confirm.
    let err = assert_err!(borrower.confirm_return(loan.id).await);
    assert_eq!(err.loan_kind(), Some(LoanErrorKind::NotAuthorized));

    assert_ok!(admin.confirm_return(loan.id).await);
    assert!(member.availability(item, None).await.unwrap().is_available());
}

#[tokio::test]
async fn test_lifecycle_without_push_events() {
    let server = Arc::new(Server::default());
    let (u1, owner) = user(&server);
    let (_, borrower) = user(&server);
    let item_x = server.add_item(Item::personal(Uuid::new_v4(), "Pressure cooker", [(u1, true)]));

    // Both sides read the loan early and keep it cached throughout.
    let loan = borrower
        .request_loan(item_x, date(2024, 1, 1), date(2024, 1, 10))
        .await
        .unwrap();
    assert_eq!(owner.loan(loan.id).await.unwrap().status, LoanStatus::Pending);
    let changes = borrower.changes();
    let seen = *changes.borrow();

    assert_ok!(owner.respond_to_request(loan.id, true).await);
    assert_eq!(borrower.ratify(loan.id).await.unwrap().status, LoanStatus::Active);
    assert!(*changes.borrow() > seen);
    assert_eq!(owner.availability(item_x, None).await.unwrap().status, CopyStatus::OnLoan);

    assert_eq!(borrower.signal_return(loan.id).await.unwrap().status, LoanStatus::ReturnPending);
    assert_eq!(owner.confirm_return(loan.id).await.unwrap().status, LoanStatus::Returned);
    assert!(owner.availability(item_x, None).await.unwrap().is_available());
    assert_eq!(owner.loan(loan.id).await.unwrap().status, LoanStatus::Returned);
}

#[tokio::test]
async fn test_stale_view_is_refreshed_before_refusing() {
    let server = Arc::new(Server::default());
    let (u1, owner) = user(&server);
    let (_, borrower) = user(&server);
    let item = server.add_item(Item::personal(Uuid::new_v4(), "Ladder", [(u1, true)]));

    let loan = borrower.request_loan(item, date(2024, 8, 1), date(2024, 8, 2)).await.unwrap();
    owner.loan(loan.id).await.unwrap();
    assert_ok!(owner.respond_to_request(loan.id, false).await);

    // The borrower's cached copy is still pending; the refusal comes from the re-read loan.
    let err = assert_err!(borrower.ratify(loan.id).await);
    assert!(matches!(
        err,
        ClientError::Loan(LoanError::InvalidState {
            status: LoanStatus::Rejected,
            ..
        })
    ));
    assert_eq!(borrower.loan(loan.id).await.unwrap().status, LoanStatus::Rejected);

    // With nothing cached the server decides.
    borrower.invalidate().await;
    let err = assert_err!(borrower.ratify(loan.id).await);
    assert!(matches!(
        err,
        ClientError::Rejected {
            kind: LoanErrorKind::InvalidState,
            ..
        }
    ));

    // A rejected loan is terminal.
    let err = assert_err!(owner.respond_to_request(loan.id, true).await);
    assert!(matches!(
        err,
        ClientError::Loan(LoanError::InvalidState {
            status: LoanStatus::Rejected,
            ..
        })
    ));
}
