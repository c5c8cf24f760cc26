use std::time::Duration;

/// A standard probe run that finishes faster than this was hitting a
/// database that never actually went to sleep.
const SLEEP_THRESHOLD: Duration = Duration::from_millis(250);

/// Terminal result of a single door-knock run against the database.
///
/// Exactly one of success and `timed_out` holds when a runner
/// terminates; `duration` is the elapsed wall-clock time at that
/// moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeOutcome {
    /// At least one attempt failed before the run ended.
    pub connection_drop: bool,
    /// The overall deadline elapsed without a successful attempt.
    pub timed_out: bool,
    /// Time from run start to first success, or to deadline expiry.
    pub duration: Duration,
    /// The run was cancelled externally rather than finishing.
    pub client_interrupt: bool,
}

impl ResumeOutcome {
    pub fn success(connection_drop: bool, duration: Duration) -> Self {
        Self {
            connection_drop,
            timed_out: false,
            duration,
            client_interrupt: false,
        }
    }

    pub fn timed_out(duration: Duration) -> Self {
        Self {
            connection_drop: true,
            timed_out: true,
            duration,
            client_interrupt: false,
        }
    }

    pub fn interrupted(duration: Duration) -> Self {
        Self {
            connection_drop: false,
            timed_out: false,
            duration,
            client_interrupt: true,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.timed_out
    }
}

/// Measurement of one resume event: the standard-cadence outcome paired
/// with the high-frequency outcome taken concurrently against the same
/// event. The high-frequency sample is absent when its runner never
/// delivered a result, which callers must treat as "no high-resolution
/// sample", not as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeStats {
    normal: ResumeOutcome,
    high_res: Option<ResumeOutcome>,
}

impl ResumeStats {
    pub fn new(normal: ResumeOutcome, high_res: Option<ResumeOutcome>) -> Self {
        Self { normal, high_res }
    }

    pub fn is_failure(&self) -> bool {
        self.normal.is_failure() || self.high_res.is_some_and(|o| o.is_failure())
    }

    pub fn is_client_interrupt(&self) -> bool {
        self.normal.client_interrupt || self.high_res.is_some_and(|o| o.client_interrupt)
    }

    pub fn is_connection_drop(&self) -> bool {
        self.normal.connection_drop
    }

    /// Whether the database was actually asleep when the race started.
    pub fn did_sleep(&self) -> bool {
        self.normal.duration > SLEEP_THRESHOLD
    }

    pub fn resume_duration(&self) -> Duration {
        self.normal.duration
    }

    pub fn resume_duration_high_res(&self) -> Option<Duration> {
        self.high_res.map(|o| o.duration)
    }
}
