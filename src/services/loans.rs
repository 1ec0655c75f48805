//! Loan lifecycle service

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    lending::{validate_request, Actor, LoanAction},
    models::{
        notification::NewNotification, CreateLoan, Lender, Loan, LoanDirection, LoansPage,
        NotificationKind,
    },
    repository::Repository,
};

use super::notifications::NotificationsService;

const LOANS_LINK: &str = "/loans";

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    notifications: NotificationsService,
}

impl LoansService {
    pub fn new(repository: Repository, notifications: NotificationsService) -> Self {
        Self {
            repository,
            notifications,
        }
    }

    /// Resolve the user and the communities they administer
    pub async fn actor_for(&self, user_id: Uuid) -> AppResult<Actor> {
        let communities = self.repository.communities.administered_by(user_id).await?;
        Ok(Actor::new(user_id).administering(communities))
    }

    /// Get a loan visible to the actor
    pub async fn get(&self, id: Uuid, actor: &Actor) -> AppResult<Loan> {
        let loan = self.repository.loans.get_by_id(id).await?;
        if !actor.is_party_to(&loan) {
            return Err(AppError::Authorization(
                "Only the borrower or the lender can view this loan".to_string(),
            ));
        }
        Ok(loan)
    }

    pub async fn list(
        &self,
        actor: &Actor,
        direction: LoanDirection,
        skip: i64,
        limit: i64,
    ) -> AppResult<LoansPage> {
        let (loans, count) = self.repository.loans.list(actor, direction, skip, limit).await?;
        Ok(LoansPage {
            data: loans.into_iter().map(Into::into).collect(),
            count,
        })
    }

    /// Create a pending request and tell the lender
    pub async fn request(&self, actor: &Actor, request: CreateLoan) -> AppResult<Loan> {
        let item = self.repository.items.get_by_id(request.item_id).await?;
        let lender = validate_request(&item, actor.user_id, &request)?;

        let loan = self.repository.loans.create(&request, actor.user_id, lender).await?;
        tracing::info!(
            loan_id = %loan.id,
            item_id = %item.id,
            requester = %actor.user_id,
            "Loan requested"
        );

        let name = self.display_name(actor.user_id).await;
        self.notify_lender(
            &loan.lender,
            NewNotification {
                title: "New Loan Request".to_string(),
                message: format!("{} wants to borrow '{}'.", name, item.title),
                kind: NotificationKind::Info,
                link: Some(LOANS_LINK.to_string()),
            },
        )
        .await;

        Ok(loan)
    }

    /// Lender accepts or rejects a pending request
    pub async fn respond(&self, id: Uuid, actor: &Actor, accept: bool) -> AppResult<Loan> {
        let loan = self.transition(id, actor, LoanAction::Respond { accept }).await?;
        let title = self.item_title(loan.item_id).await;

        let (verdict, kind) = if accept {
            ("Accepted", NotificationKind::Success)
        } else {
            ("Rejected", NotificationKind::Warning)
        };
        self.notifications
            .notify(
                &[loan.requester_id],
                NewNotification {
                    title: format!("Loan Request {}", verdict),
                    message: format!(
                        "Your request for '{}' has been {}.",
                        title,
                        verdict.to_lowercase()
                    ),
                    kind,
                    link: Some(LOANS_LINK.to_string()),
                },
            )
            .await;

        Ok(loan)
    }

    /// Borrower confirms they received the item
    pub async fn ratify(&self, id: Uuid, actor: &Actor) -> AppResult<Loan> {
        let loan = self.transition(id, actor, LoanAction::Ratify).await?;
        let title = self.item_title(loan.item_id).await;
        let name = self.display_name(actor.user_id).await;

        self.notify_lender(
            &loan.lender,
            NewNotification {
                title: "Loan Ratified".to_string(),
                message: format!("{} confirmed they have received '{}'.", name, title),
                kind: NotificationKind::Info,
                link: Some(LOANS_LINK.to_string()),
            },
        )
        .await;

        Ok(loan)
    }

    /// Borrower says the item is back
    pub async fn signal_return(&self, id: Uuid, actor: &Actor) -> AppResult<Loan> {
        let loan = self.transition(id, actor, LoanAction::SignalReturn).await?;
        let title = self.item_title(loan.item_id).await;
        let name = self.display_name(actor.user_id).await;

        self.notify_lender(
            &loan.lender,
            NewNotification {
                title: "Return Signaled".to_string(),
                message: format!(
                    "{} signaled that they have returned '{}'. Please confirm receipt.",
                    name, title
                ),
                kind: NotificationKind::Info,
                link: Some(LOANS_LINK.to_string()),
            },
        )
        .await;

        Ok(loan)
    }

    /// Lender confirms the item is back; the copy becomes available again
    pub async fn confirm_return(&self, id: Uuid, actor: &Actor) -> AppResult<Loan> {
        let loan = self.transition(id, actor, LoanAction::ConfirmReturn).await?;
        let title = self.item_title(loan.item_id).await;
        let name = self.display_name(actor.user_id).await;

        self.notifications
            .notify(
                &[loan.requester_id],
                NewNotification {
                    title: "Return Confirmed".to_string(),
                    message: format!("{} confirmed receipt of '{}'.", name, title),
                    kind: NotificationKind::Success,
                    link: Some(LOANS_LINK.to_string()),
                },
            )
            .await;

        Ok(loan)
    }

    async fn transition(&self, id: Uuid, actor: &Actor, action: LoanAction) -> AppResult<Loan> {
        let (loan, transition) = match self.repository.loans.transition(id, actor, action).await {
            Ok(done) => done,
            Err(e) => {
                tracing::warn!(loan_id = %id, actor = %actor.user_id, action = action.name(), "Loan action refused: {}", e);
                return Err(e);
            }
        };
        tracing::info!(
            loan_id = %loan.id,
            actor = %actor.user_id,
            from = %transition.from,
            to = %transition.to,
            "Loan transitioned"
        );
        Ok(loan)
    }

    /// The owner in person, or every admin of the lending community
    async fn notify_lender(&self, lender: &Lender, notification: NewNotification) {
        let recipients = match *lender {
            Lender::Owner(owner) => vec![owner],
            Lender::Community(community) => match self.repository.communities.admins(community).await {
                Ok(admins) => admins,
                Err(e) => {
                    tracing::warn!(community = %community, "Failed to load community admins: {}", e);
                    return;
                }
            },
        };
        self.notifications.notify(&recipients, notification).await;
    }

    // The transition is already committed; a missing name or title only degrades the message.
    async fn display_name(&self, user_id: Uuid) -> String {
        self.repository
            .users
            .display_name(user_id)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(user_id = %user_id, "Failed to load display name: {}", e);
                "Someone".to_string()
            })
    }

    async fn item_title(&self, item_id: Uuid) -> String {
        match self.repository.items.get_by_id(item_id).await {
            Ok(item) => item.title,
            Err(e) => {
                tracing::warn!(item_id = %item_id, "Failed to load item title: {}", e);
                "an item".to_string()
            }
        }
    }
}
