/// Atomic multi-statement writes
///
/// [`with_transaction`] runs a closure against a single transaction
/// connection. The closure performs its writes in order; if it returns `Ok`
/// the transaction commits, otherwise it is rolled back and the closure's
/// error is returned unchanged. There is no observable state between the
/// two outcomes:
///
/// ```text
/// pending ──Ok──▶ committed
///    └────Err──▶ rolled_back
/// ```
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::db::transaction::with_transaction;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let inserted: u64 = with_transaction(&pool, |conn| {
///     Box::pin(async move {
///         let a = sqlx::query("INSERT INTO tags (name) VALUES ('a')")
///             .execute(&mut *conn)
///             .await?;
///         let b = sqlx::query("INSERT INTO tags (name) VALUES ('b')")
///             .execute(&mut *conn)
///             .await?;
///         Ok::<_, sqlx::Error>(a.rows_affected() + b.rows_affected())
///     })
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```

use futures::future::BoxFuture;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, warn};

/// Final state of a transaction run by [`with_transaction`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    Committed,
    RolledBack,
}

impl TransactionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionOutcome::Committed => "committed",
            TransactionOutcome::RolledBack => "rolled_back",
        }
    }
}

/// Runs `operations` inside one transaction
///
/// # Errors
///
/// Returns the closure's error after rolling back, or the database error if
/// `BEGIN`/`COMMIT` fails. A failed `ROLLBACK` is logged and the original
/// error still returned; the server discards the transaction when the
/// connection is dropped.
pub async fn with_transaction<T, E, F>(pool: &PgPool, operations: F) -> Result<T, E>
where
    F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T, E>>,
    E: From<sqlx::Error> + std::fmt::Display,
    T: Send,
{
    let mut tx = pool.begin().await?;
    debug!("Transaction started");

    match operations(&mut *tx).await {
        Ok(value) => {
            tx.commit().await?;
            debug!(outcome = TransactionOutcome::Committed.as_str(), "Transaction finished");
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            warn!(
                outcome = TransactionOutcome::RolledBack.as_str(),
                error = %err,
                "Transaction finished"
            );
            Err(err)
        }
    }
}
