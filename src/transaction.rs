//! Transaction wrapper for multi-step writes.
//!
//! The closure receives a transactional handle; an `Ok` commits, any `Err`
//! rolls the whole sequence back and propagates to the caller, so partial
//! cascades are never observable. Nesting is not supported.

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionError, TransactionTrait};
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use crate::errors::ApiError;

/// Boxed future returned by transaction bodies.
pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Run `body` inside a transaction, logging the operation name, duration,
/// and outcome.
///
/// # Errors
///
/// Propagates the body's `ApiError` on rollback; connection-level failures
/// surface as store errors.
pub async fn with_transaction<F, T>(
    db: &DatabaseConnection,
    operation: &'static str,
    body: F,
) -> Result<T, ApiError>
where
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> TxFuture<'c, T> + Send,
    T: Send,
{
    let started = Instant::now();
    let result = db.transaction::<_, T, ApiError>(body).await;
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match result {
        Ok(value) => {
            tracing::info!(operation, duration_ms, "transaction committed");
            Ok(value)
        }
        Err(TransactionError::Connection(err)) => {
            tracing::error!(operation, duration_ms, error = %err, "transaction failed");
            Err(ApiError::store(err))
        }
        Err(TransactionError::Transaction(err)) => {
            tracing::error!(operation, duration_ms, error = %err, "transaction rolled back");
            Err(err)
        }
    }
}
