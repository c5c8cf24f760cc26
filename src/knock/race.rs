use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::DatabaseKnock;
use super::runner::{JOIN_GRACE, run_knock_loop};
use crate::errors::FailureRecorder;
use crate::outcome::{ResumeOutcome, ResumeStats};

/// Races the standard-cadence and high-frequency runners against the
/// same resume event and merges their outcomes.
///
/// Both runners start concurrently with the same deadline, so a single
/// real occurrence yields both the realistic client-observed resume
/// time and the tight high-resolution bound. The coordinator waits for
/// both up to `deadline` plus a grace margin:
///
/// - a standard runner still going after that is cancelled and its
///   slot filled with a timed-out outcome at the full deadline;
/// - a high-frequency runner that never delivered leaves `None`, which
///   means "no high-resolution sample", not failure;
/// - if `cancel` fires while waiting, the result is a client-interrupt
///   stats value, returned rather than raised.
pub async fn race_to_resume(
    standard: Arc<dyn DatabaseKnock>,
    high_frequency: Arc<dyn DatabaseKnock>,
    recorder: &Arc<dyn FailureRecorder>,
    deadline: Duration,
    cancel: &CancellationToken,
) -> ResumeStats {
    let start = Instant::now();
    let runner_cancel = cancel.child_token();

    let standard_task = tokio::spawn(run_knock_loop(
        standard,
        recorder.clone(),
        deadline,
        runner_cancel.clone(),
    ));
    let high_frequency_task = tokio::spawn(run_knock_loop(
        high_frequency,
        recorder.clone(),
        deadline,
        runner_cancel.clone(),
    ));

    let bounded_wait = deadline + JOIN_GRACE;
    let joined = async {
        tokio::join!(
            timeout(bounded_wait, standard_task),
            timeout(bounded_wait, high_frequency_task),
        )
    };

    tokio::select! {
        _ = cancel.cancelled() => {
            info!("resume race interrupted by shutdown");
            ResumeStats::new(ResumeOutcome::interrupted(start.elapsed()), None)
        }
        (standard_slot, high_frequency_slot) = joined => {
            let normal = match standard_slot {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    warn!(error = %e, "standard knock runner failed to join");
                    recorder.capture("standard knock runner failed to join", &e.to_string()).await;
                    ResumeOutcome::timed_out(deadline)
                }
                Err(_) => {
                    // Still running past the grace margin; tell it to
                    // stop and report the deadline as the duration.
                    runner_cancel.cancel();
                    ResumeOutcome::timed_out(deadline)
                }
            };
            let high_res = match high_frequency_slot {
                Ok(Ok(outcome)) if !outcome.client_interrupt => Some(outcome),
                _ => None,
            };
            ResumeStats::new(normal, high_res)
        }
    }
}
