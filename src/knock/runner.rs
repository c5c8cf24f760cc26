use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::DatabaseKnock;
use crate::errors::FailureRecorder;
use crate::outcome::ResumeOutcome;

/// Extra time the coordinator grants a runner past its own deadline
/// before giving up on its result. Covers an attempt that was already
/// in flight when the deadline passed.
pub const JOIN_GRACE: Duration = Duration::from_secs(5);

/// Knocks on the database until the first success or until `deadline`
/// elapses, whichever comes first.
///
/// There is no pause between attempts; the knock's own timeout paces
/// the loop. Attempt failures are never fatal, they only set the
/// connection-drop flag and go to the recorder for diagnostics. The
/// cancellation token is observed at iteration boundaries; an attempt
/// already in flight runs to its own timeout first.
pub async fn run_knock_loop(
    knock: Arc<dyn DatabaseKnock>,
    recorder: Arc<dyn FailureRecorder>,
    deadline: Duration,
    cancel: CancellationToken,
) -> ResumeOutcome {
    let start = Instant::now();
    let mut drop_seen = false;

    while start.elapsed() < deadline {
        if cancel.is_cancelled() {
            return ResumeOutcome::interrupted(start.elapsed());
        }
        match knock.knock().await {
            Ok(()) => return ResumeOutcome::success(drop_seen, start.elapsed()),
            Err(e) => {
                drop_seen = true;
                debug!(error = %e, "door knock failed");
                recorder.capture("door knock failed", &e.to_string()).await;
            }
        }
    }

    ResumeOutcome::timed_out(start.elapsed())
}

/// Runs a single knock loop to completion and reports whether the
/// endpoint answered in time. Used to confirm the database is awake
/// before a measurement cycle begins; a hung or cancelled runner counts
/// as not ready.
pub async fn knock_until_ready(
    knock: Arc<dyn DatabaseKnock>,
    recorder: &Arc<dyn FailureRecorder>,
    deadline: Duration,
    cancel: &CancellationToken,
) -> bool {
    let runner_cancel = cancel.child_token();
    let task = tokio::spawn(run_knock_loop(
        knock,
        recorder.clone(),
        deadline,
        runner_cancel.clone(),
    ));

    match timeout(deadline + JOIN_GRACE, task).await {
        Ok(Ok(outcome)) => !outcome.is_failure() && !outcome.client_interrupt,
        Ok(Err(e)) => {
            warn!(error = %e, "readiness knock runner failed to join");
            false
        }
        Err(_) => {
            runner_cancel.cancel();
            false
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::errors::test_support::MemoryRecorder;
    use crate::knock::KnockError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    /// Scripted knock: fails (taking `attempt_timeout` per attempt,
    /// like a real connect timing out) until `failures` attempts have
    /// been burned, then succeeds instantly.
    pub(crate) struct ScriptedKnock {
        pub failures: usize,
        pub attempt_timeout: Duration,
        pub attempts: AtomicUsize,
    }

    impl ScriptedKnock {
        pub fn failing_n_times(failures: usize, attempt_timeout: Duration) -> Self {
            Self {
                failures,
                attempt_timeout,
                attempts: AtomicUsize::new(0),
            }
        }

        pub fn always_failing(attempt_timeout: Duration) -> Self {
            Self::failing_n_times(usize::MAX, attempt_timeout)
        }

        pub fn always_ok() -> Self {
            Self::failing_n_times(0, Duration::ZERO)
        }
    }

    #[async_trait]
    impl DatabaseKnock for ScriptedKnock {
        async fn knock(&self) -> Result<(), KnockError> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                sleep(self.attempt_timeout).await;
                Err(KnockError::Timeout(self.attempt_timeout))
            } else {
                Ok(())
            }
        }
    }

    /// A knock stuck in a connect that never returns. Models a probe
    /// blocked past its runner's deadline.
    pub(crate) struct HungKnock;

    #[async_trait]
    impl DatabaseKnock for HungKnock {
        async fn knock(&self) -> Result<(), KnockError> {
            sleep(Duration::from_secs(3600)).await;
            Err(KnockError::Timeout(Duration::from_secs(3600)))
        }
    }

    pub(crate) fn recorder() -> Arc<dyn FailureRecorder> {
        Arc::new(MemoryRecorder::default())
    }

    #[tokio::test(start_paused = true)]
    async fn a_knock_that_never_succeeds_times_out_at_the_deadline() {
        let knock = Arc::new(ScriptedKnock::always_failing(Duration::from_millis(500)));

        let outcome = run_knock_loop(
            knock.clone(),
            recorder(),
            Duration::from_millis(5000),
            CancellationToken::new(),
        )
        .await;

        assert!(outcome.timed_out);
        assert!(outcome.connection_drop);
        assert!(!outcome.client_interrupt);
        assert_eq!(outcome.duration, Duration::from_millis(5000));
        assert_eq!(knock.attempts.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn first_attempt_success_reports_no_drop_and_no_elapsed_time() {
        let knock = Arc::new(ScriptedKnock::always_ok());

        let outcome = run_knock_loop(
            knock,
            recorder(),
            Duration::from_millis(5000),
            CancellationToken::new(),
        )
        .await;

        assert!(!outcome.timed_out);
        assert!(!outcome.connection_drop);
        assert_eq!(outcome.duration, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_before_the_eventual_success_mark_a_connection_drop() {
        let knock = Arc::new(ScriptedKnock::failing_n_times(3, Duration::from_millis(500)));
        let recorder = Arc::new(MemoryRecorder::default());

        let outcome = run_knock_loop(
            knock.clone(),
            recorder.clone(),
            Duration::from_millis(5000),
            CancellationToken::new(),
        )
        .await;

        assert!(!outcome.timed_out);
        assert!(outcome.connection_drop);
        assert!(outcome.duration >= Duration::from_millis(1500));
        assert_eq!(knock.attempts.load(Ordering::SeqCst), 4);
        assert_eq!(recorder.count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_is_observed_at_the_loop_boundary() {
        let knock = Arc::new(ScriptedKnock::always_failing(Duration::from_millis(500)));
        let cancel = CancellationToken::new();

        let loop_fut = run_knock_loop(knock, recorder(), Duration::from_secs(60), cancel.clone());
        tokio::pin!(loop_fut);

        let outcome = tokio::select! {
            outcome = &mut loop_fut => outcome,
            _ = sleep(Duration::from_millis(1250)) => {
                cancel.cancel();
                loop_fut.await
            }
        };

        assert!(outcome.client_interrupt);
        assert!(!outcome.timed_out);
        // The in-flight attempt ran to its own timeout before the loop
        // noticed the cancellation.
        assert_eq!(outcome.duration, Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn ready_when_the_endpoint_answers_within_the_deadline() {
        let knock = Arc::new(ScriptedKnock::failing_n_times(2, Duration::from_millis(500)));

        let ready = knock_until_ready(
            knock,
            &recorder(),
            Duration::from_millis(5000),
            &CancellationToken::new(),
        )
        .await;

        assert!(ready);
    }

    #[tokio::test(start_paused = true)]
    async fn not_ready_when_every_knock_fails() {
        let knock = Arc::new(ScriptedKnock::always_failing(Duration::from_millis(500)));

        let ready = knock_until_ready(
            knock,
            &recorder(),
            Duration::from_millis(3000),
            &CancellationToken::new(),
        )
        .await;

        assert!(!ready);
    }

    #[tokio::test(start_paused = true)]
    async fn not_ready_when_the_runner_hangs_past_the_grace_period() {
        let ready = knock_until_ready(
            Arc::new(HungKnock),
            &recorder(),
            Duration::from_millis(3000),
            &CancellationToken::new(),
        )
        .await;

        assert!(!ready);
    }
}
