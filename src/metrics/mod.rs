pub mod client;

use chrono::Utc;
use client::create_time_series;
use client::prometheus::prompb;

use crate::outcome::ResumeStats;

const INSTANCE_LABEL: &str = "instance";
const JOB_LABEL: &str = "job";
const CANARY_JOB: &str = "resume-canary";

const SUCCESS_METRIC: &str = "resume_canary_success";
const FAILURE_METRIC: &str = "resume_canary_failure";
const CONNECTION_DROP_METRIC: &str = "resume_canary_connection_drop";
const CLIENT_INTERRUPT_METRIC: &str = "resume_canary_client_interrupt";
const RESUME_DURATION_METRIC: &str = "resume_canary_resume_duration_ms";
const RESUME_DURATION_HIGH_RES_METRIC: &str = "resume_canary_resume_duration_high_res_ms";

fn bool_value(flag: bool) -> f64 {
    if flag { 1.0 } else { 0.0 }
}

/// Maps one resume measurement onto the canary's metric set, all
/// sharing a single sample timestamp. The high-resolution duration
/// series is only emitted when the race produced a high-frequency
/// sample.
pub fn create_resume_metrics(stats: &ResumeStats, instance: &str) -> Vec<prompb::TimeSeries> {
    let now = Utc::now().timestamp_millis();
    let labels = [(INSTANCE_LABEL, instance), (JOB_LABEL, CANARY_JOB)];

    let mut metrics = vec![
        create_time_series(
            SUCCESS_METRIC,
            &labels,
            bool_value(!stats.is_failure()),
            Some(now),
        ),
        create_time_series(
            FAILURE_METRIC,
            &labels,
            bool_value(stats.is_failure()),
            Some(now),
        ),
        create_time_series(
            CONNECTION_DROP_METRIC,
            &labels,
            bool_value(stats.is_connection_drop()),
            Some(now),
        ),
        create_time_series(
            CLIENT_INTERRUPT_METRIC,
            &labels,
            bool_value(stats.is_client_interrupt()),
            Some(now),
        ),
        create_time_series(
            RESUME_DURATION_METRIC,
            &labels,
            stats.resume_duration().as_millis() as f64,
            Some(now),
        ),
    ];

    if let Some(high_res) = stats.resume_duration_high_res() {
        metrics.push(create_time_series(
            RESUME_DURATION_HIGH_RES_METRIC,
            &labels,
            high_res.as_millis() as f64,
            Some(now),
        ));
    }

    metrics
}
