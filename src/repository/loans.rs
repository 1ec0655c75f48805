//! Loans repository for database operations

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, Pool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    lending::{Actor, CopyEffect, LoanAction, LoanError, Transition},
    models::{
        loan::{CreateLoan, LoanRecord},
        Lender, Loan, LoanDirection, RecordError,
    },
};

const LOAN_COLUMNS: &str =
    "id, item_id, requester_id, owner_id, community_id, status, start_date, end_date, created_at";

/// Loan row from database
#[derive(Debug, FromRow)]
struct LoanRow {
    id: Uuid,
    item_id: Uuid,
    requester_id: Uuid,
    owner_id: Option<Uuid>,
    community_id: Option<Uuid>,
    status: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    created_at: DateTime<Utc>,
}

impl TryFrom<LoanRow> for Loan {
    type Error = RecordError;

    fn try_from(row: LoanRow) -> Result<Self, Self::Error> {
        Loan::try_from(LoanRecord {
            id: row.id,
            item_id: row.item_id,
            requester_id: row.requester_id,
            owner_id: row.owner_id,
            community_id: row.community_id,
            status: row.status.parse()?,
            start_date: row.start_date,
            end_date: row.end_date,
            created_at: row.created_at,
        })
    }
}

/// A second handed-over loan for one copy trips the partial unique index
fn copy_conflict(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => LoanError::CopyNoLongerAvailable.into(),
        _ => e.into(),
    }
}

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Loan> {
        let row = sqlx::query_as::<_, LoanRow>(&format!("SELECT {LOAN_COLUMNS} FROM loans WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;
        Ok(Loan::try_from(row)?)
    }

    /// Insert a pending loan
    pub async fn create(&self, request: &CreateLoan, requester_id: Uuid, lender: Lender) -> AppResult<Loan> {
        let row = sqlx::query_as::<_, LoanRow>(&format!(
            r#"
            INSERT INTO loans (id, item_id, requester_id, owner_id, community_id, status, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7)
            RETURNING {LOAN_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(request.item_id)
        .bind(requester_id)
        .bind(lender.owner_id())
        .bind(lender.community_id())
        .bind(request.start_date)
        .bind(request.end_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(Loan::try_from(row)?)
    }

    /// Loans where the actor is the lender (incoming) or the borrower (outgoing), newest first
    pub async fn list(
        &self,
        actor: &Actor,
        direction: LoanDirection,
        skip: i64,
        limit: i64,
    ) -> AppResult<(Vec<Loan>, i64)> {
        let communities: Vec<Uuid> = actor.administered_communities.iter().copied().collect();
        let filter = match direction {
            LoanDirection::Incoming => "owner_id = $1 OR community_id = ANY($2)",
            LoanDirection::Outgoing => "requester_id = $1",
        };

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM loans WHERE {filter}"))
            .bind(actor.user_id)
            .bind(&communities)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, LoanRow>(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE {filter} ORDER BY created_at DESC OFFSET $3 LIMIT $4"
        ))
        .bind(actor.user_id)
        .bind(&communities)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let loans = rows
            .into_iter()
            .map(Loan::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((loans, total))
    }

    /// Apply `action` to a loan atomically.
    ///
    /// The loan row is locked for the whole transaction so concurrent actions on
    /// the same loan are serialized; the loser sees the new status and gets
    /// `InvalidState`.
    pub async fn transition(
        &self,
        id: Uuid,
        actor: &Actor,
        action: LoanAction,
    ) -> AppResult<(Loan, Transition)> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, LoanRow>(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;

        let mut loan = Loan::try_from(row)?;
        let transition = loan.apply(actor, action)?;

        match transition.effect {
            CopyEffect::MarkOnLoan => claim_copy(&mut tx, &loan).await?,
            CopyEffect::MarkAvailable => release_copy(&mut tx, &loan).await?,
            CopyEffect::Unchanged => {}
        }

        sqlx::query("UPDATE loans SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(loan.status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(copy_conflict)?;

        tx.commit().await?;

        Ok((loan, transition))
    }
}

/// Take the lent copy off the shelf, failing if another loan already holds it
async fn claim_copy(tx: &mut Transaction<'_, Postgres>, loan: &Loan) -> AppResult<()> {
    match loan.lender {
        Lender::Owner(owner) => {
            let claimed = sqlx::query(
                "UPDATE item_owners SET is_available = FALSE WHERE item_id = $1 AND user_id = $2 AND is_available",
            )
            .bind(loan.item_id)
            .bind(owner)
            .execute(&mut **tx)
            .await?
            .rows_affected();

            if claimed == 0 {
                return Err(LoanError::CopyNoLongerAvailable.into());
            }
        }
        Lender::Community(community) => {
            // The pooled copy has no flag row; lock the item to serialize ratifications.
            sqlx::query("SELECT id FROM items WHERE id = $1 FOR UPDATE")
                .bind(loan.item_id)
                .fetch_optional(&mut **tx)
                .await?;

            let handed_over: bool = sqlx::query_scalar(
                r#"
                SELECT EXISTS(
                    SELECT 1 FROM loans
                    WHERE item_id = $1 AND community_id = $2 AND id <> $3
                      AND status IN ('active', 'return_pending')
                )
                "#,
            )
            .bind(loan.item_id)
            .bind(community)
            .bind(loan.id)
            .fetch_one(&mut **tx)
            .await?;

            if handed_over {
                return Err(LoanError::CopyNoLongerAvailable.into());
            }
        }
    }
    Ok(())
}

/// Put the lent copy back on the shelf
async fn release_copy(tx: &mut Transaction<'_, Postgres>, loan: &Loan) -> AppResult<()> {
    if let Lender::Owner(owner) = loan.lender {
        sqlx::query("UPDATE item_owners SET is_available = TRUE WHERE item_id = $1 AND user_id = $2")
            .bind(loan.item_id)
            .bind(owner)
            .execute(&mut **tx)
            .await?;
    }
    // Community availability is derived from loan statuses.
    Ok(())
}
