use std::time::Duration;

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::errors::CanaryError;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Polls `fetch_status` until `still_waiting` over the fetched status
/// turns false, or `deadline` elapses.
///
/// The waiter knows nothing about what the status means; the policy is
/// entirely in the caller-supplied predicate. A predicate that is false
/// on the very first fetch returns without sleeping at all. Deadline
/// expiry is a [`CanaryError::WaitTimeout`] carrying `label` and the
/// elapsed time, meant to abort the enclosing canary cycle rather than
/// be retried silently. Accessor failures propagate as-is; wrap the
/// accessor with [`crate::retry::retry_until_success`] if they should
/// be retried instead.
pub async fn wait_while<S, A, Fut, P>(
    mut fetch_status: A,
    still_waiting: P,
    label: &str,
    deadline: Duration,
    cancel: &CancellationToken,
) -> Result<(), CanaryError>
where
    A: FnMut() -> Fut,
    Fut: Future<Output = Result<S, CanaryError>>,
    P: Fn(&S) -> bool,
    S: std::fmt::Debug,
{
    let start = Instant::now();
    let mut status = fetch_status().await?;
    if !still_waiting(&status) {
        debug!(operation = label, status = ?status, "wait not required");
        return Ok(());
    }

    loop {
        if start.elapsed() > deadline {
            return Err(CanaryError::WaitTimeout {
                label: label.to_string(),
                elapsed: start.elapsed(),
            });
        }
        info!(operation = label, status = ?status, "still waiting");
        tokio::select! {
            _ = cancel.cancelled() => return Err(CanaryError::Cancelled),
            _ = sleep(POLL_INTERVAL) => {}
        }
        status = fetch_status().await?;
        if !still_waiting(&status) {
            return Ok(());
        }
    }
}
