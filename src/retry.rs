use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::errors::FailureRecorder;

const RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Runs `action` until it succeeds, pausing a fixed second between
/// attempts. Every failure is routed through the injected
/// [`FailureRecorder`]. There is no attempt cap and no backoff growth;
/// this is meant for idempotent control-plane calls that are expected
/// to eventually succeed once a transient condition clears.
///
/// Returns `None` without retrying further once `cancel` fires; the
/// token is only observed between attempts, never mid-call.
pub async fn retry_until_success<T, E, F, Fut>(
    label: &str,
    recorder: &dyn FailureRecorder,
    cancel: &CancellationToken,
    mut action: F,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    loop {
        if cancel.is_cancelled() {
            return None;
        }
        match action().await {
            Ok(value) => return Some(value),
            Err(e) => {
                warn!(action = label, error = %e, "failed to run the action, retrying");
                recorder.capture(label, &e.to_string()).await;
            }
        }
        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = sleep(RETRY_PAUSE) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::test_support::MemoryRecorder;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn returns_on_first_success_without_sleeping() {
        let recorder = MemoryRecorder::default();
        let cancel = CancellationToken::new();
        let start = Instant::now();

        let got = retry_until_success("noop", &recorder, &cancel, || async {
            Ok::<_, String>(42)
        })
        .await;

        assert_eq!(got, Some(42));
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(recorder.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_the_action_succeeds() {
        let recorder = MemoryRecorder::default();
        let cancel = CancellationToken::new();
        let attempts = AtomicUsize::new(0);
        let start = Instant::now();

        let got = retry_until_success("flaky", &recorder, &cancel, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(format!("transient failure {n}"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(got, Some(2));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // Two failures, one fixed pause each.
        assert_eq!(start.elapsed(), RETRY_PAUSE * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_routed_through_the_recorder() {
        let recorder = MemoryRecorder::default();
        let cancel = CancellationToken::new();
        let attempts = AtomicUsize::new(0);

        retry_until_success("flaky", &recorder, &cancel, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(format!("distinct failure {n}"))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, "flaky");
        assert_eq!(events[0].1, "distinct failure 0");
        assert_eq!(events[1].1, "distinct failure 1");
    }

    #[tokio::test(start_paused = true)]
    async fn a_cancelled_token_stops_the_loop_between_attempts() {
        let recorder = MemoryRecorder::default();
        let cancel = CancellationToken::new();
        let attempts = AtomicUsize::new(0);

        let task = retry_until_success("doomed", &recorder, &cancel, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>("always fails") }
        });
        tokio::pin!(task);

        tokio::select! {
            _ = &mut task => panic!("retry loop ended on its own"),
            _ = sleep(Duration::from_millis(2500)) => cancel.cancel(),
        }

        assert_eq!(task.await, None);
        // Attempts at t=0s, 1s, 2s; the cancel lands during the third pause.
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn an_already_cancelled_token_runs_nothing() {
        let recorder = MemoryRecorder::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let got = retry_until_success("never", &recorder, &cancel, || async {
            Ok::<_, String>(1)
        })
        .await;

        assert_eq!(got, None);
    }
}
