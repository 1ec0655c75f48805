//! Loan lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        loan::{LoanQuery, RespondLoan},
        CreateLoan, LoanRecord, LoansPage,
    },
    AppState,
};

use super::{AuthenticatedUser, DEFAULT_PAGE_SIZE};

/// Request to borrow an item
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan requested", body = LoanRecord),
        (status = 400, description = "Invalid date range or own item", body = crate::error::ErrorResponse),
        (status = 404, description = "Item not found"),
        (status = 409, description = "Item not available", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateLoan>,
) -> AppResult<(StatusCode, Json<LoanRecord>)> {
    let actor = state.services.loans.actor_for(claims.user_id()).await?;
    let loan = state.services.loans.request(&actor, request).await?;

    Ok((StatusCode::CREATED, Json(loan.into())))
}

/// List the caller's loans, as lender (incoming) or borrower (outgoing)
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(LoanQuery),
    responses(
        (status = 200, description = "Loans, newest first", body = LoansPage)
    )
)]
pub async fn list_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<LoansPage>> {
    query.validate()?;

    let actor = state.services.loans.actor_for(claims.user_id()).await?;
    let page = state
        .services
        .loans
        .list(
            &actor,
            query.direction,
            query.skip.unwrap_or(0),
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;

    Ok(Json(page))
}

/// Get a loan the caller is party to
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan", body = LoanRecord),
        (status = 403, description = "Not a party to this loan"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<LoanRecord>> {
    let actor = state.services.loans.actor_for(claims.user_id()).await?;
    let loan = state.services.loans.get(id, &actor).await?;
    Ok(Json(loan.into()))
}

/// Accept or reject a pending request (lender)
#[utoipa::path(
    post,
    path = "/loans/{id}/respond",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Loan ID")
    ),
    request_body = RespondLoan,
    responses(
        (status = 200, description = "Loan accepted or rejected", body = LoanRecord),
        (status = 403, description = "Caller is not the lender", body = crate::error::ErrorResponse),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan is not pending", body = crate::error::ErrorResponse)
    )
)]
pub async fn respond_to_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<RespondLoan>,
) -> AppResult<Json<LoanRecord>> {
    let actor = state.services.loans.actor_for(claims.user_id()).await?;
    let loan = state.services.loans.respond(id, &actor, body.accept).await?;
    Ok(Json(loan.into()))
}

/// Confirm receipt of the item (borrower)
#[utoipa::path(
    post,
    path = "/loans/{id}/ratify",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan is active", body = LoanRecord),
        (status = 403, description = "Caller is not the borrower", body = crate::error::ErrorResponse),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan not accepted or copy already lent", body = crate::error::ErrorResponse)
    )
)]
pub async fn ratify_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<LoanRecord>> {
    let actor = state.services.loans.actor_for(claims.user_id()).await?;
    let loan = state.services.loans.ratify(id, &actor).await?;
    Ok(Json(loan.into()))
}

/// Signal the item has been handed back (borrower)
#[utoipa::path(
    post,
    path = "/loans/{id}/signal-return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Return pending", body = LoanRecord),
        (status = 403, description = "Caller is not the borrower", body = crate::error::ErrorResponse),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan is not active", body = crate::error::ErrorResponse)
    )
)]
pub async fn signal_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<LoanRecord>> {
    let actor = state.services.loans.actor_for(claims.user_id()).await?;
    let loan = state.services.loans.signal_return(id, &actor).await?;
    Ok(Json(loan.into()))
}

/// Confirm the item is back (lender)
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan returned", body = LoanRecord),
        (status = 403, description = "Caller is not the lender", body = crate::error::ErrorResponse),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan is not out", body = crate::error::ErrorResponse)
    )
)]
pub async fn confirm_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<LoanRecord>> {
    let actor = state.services.loans.actor_for(claims.user_id()).await?;
    let loan = state.services.loans.confirm_return(id, &actor).await?;
    Ok(Json(loan.into()))
}
