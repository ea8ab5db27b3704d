// crates/tspend-core/src/cancel.rs
//
// Racing chain requests against a cancellation token.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::TspendError;

/// Await `fut` unless `token` is cancelled first, in which case the future is
/// dropped and `TspendError::Cancelled` is returned.
pub async fn cancellable<T, F>(token: &CancellationToken, fut: F) -> Result<T, TspendError>
where
    F: Future<Output = Result<T, TspendError>>,
{
    if token.is_cancelled() {
        return Err(TspendError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(TspendError::Cancelled),
        res = fut => res,
    }
}
