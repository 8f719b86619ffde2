use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// The wrapped call did not resolve before its deadline.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("deadline of {0:?} elapsed")]
pub struct Elapsed(pub Duration);

/// Run `fut` under a client-side deadline.
///
/// Every network suspension point in the core goes through this single
/// wrapper; callers map `Elapsed` to their own timeout outcome instead of
/// hanging the caller indefinitely.
pub async fn with_deadline<F, T>(limit: Duration, fut: F) -> Result<T, Elapsed>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(limit, fut).await.map_err(|_| Elapsed(limit))
}
