//! The one race-against-timeout primitive used by every network wait.
//!
//! When the deadline wins, the raced future is dropped, which stops whatever
//! polling it was doing. Callers decide what an elapsed deadline means; for a
//! sent transaction it is an ambiguous outcome, not a failure.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{label}' did not complete within {limit:?}")]
pub struct DeadlineElapsed {
    pub label: String,
    pub limit: Duration,
}

/// Await `future`, giving up after `limit`
pub async fn with_deadline<F>(label: &str, limit: Duration, future: F) -> Result<F::Output, DeadlineElapsed>
where
    F: Future,
{
    match tokio::time::timeout(limit, future).await {
        Ok(output) => Ok(output),
        Err(_) => {
            warn!("'{}' hit its {:?} deadline", label, limit);
            Err(DeadlineElapsed {
                label: label.to_string(),
                limit,
            })
        }
    }
}
