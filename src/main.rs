use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod errors;
pub mod knock;
pub mod metrics;
pub mod outcome;
pub mod retry;
pub mod waiter;

use config::app_config::load_config;
use config::model::Config;
use errors::{ErrorCapture, FailureRecorder};
use knock::race::race_to_resume;
use knock::runner::knock_until_ready;
use knock::sql::SqlKnock;
use knock::{DatabaseTarget, KnockCadence};
use metrics::client::send_remote_write;
use metrics::create_resume_metrics;
use outcome::ResumeStats;
use retry::retry_until_success;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    sqlx::any::install_default_drivers();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let recorder: Arc<dyn FailureRecorder> = Arc::new(ErrorCapture::new(
        &config.capture.dir,
        config.capture.retention_cap,
    ));
    let cancel = CancellationToken::new();

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            shutdown.cancel();
        }
    });

    run_canary(&config, &recorder, &cancel).await;
    info!("canary stopped");
}

/// The canary cycle, forever: make sure the endpoint answers, let the
/// database idle itself to sleep, race the probes against the resume
/// and publish what they measured. A cycle that never gets a ready
/// endpoint simply starts over.
async fn run_canary(
    config: &Config,
    recorder: &Arc<dyn FailureRecorder>,
    cancel: &CancellationToken,
) {
    let target = DatabaseTarget {
        engine: config.canary.engine.clone(),
        host: config.canary.endpoint.clone(),
        port: config.canary.port,
        database: config.canary.database.clone(),
        username: config.canary.username.clone(),
        password: config.canary.password.clone(),
    };
    let deadline = Duration::from_millis(config.canary.max_resume_wait_millis);

    let mut run: u64 = 0;
    while !cancel.is_cancelled() {
        info!(run, endpoint = %target.host, "starting canary run");
        run += 1;

        let high_frequency = Arc::new(SqlKnock::new(&target, KnockCadence::high_frequency()));
        if !knock_until_ready(high_frequency.clone(), recorder, deadline, cancel).await {
            warn!("endpoint not ready in time, starting over");
            continue;
        }

        stay_idle(config.canary.idle_seconds, cancel).await;
        if cancel.is_cancelled() {
            break;
        }

        info!("starting resume measurement");
        let standard = Arc::new(SqlKnock::new(&target, KnockCadence::standard()));
        let stats = race_to_resume(standard, high_frequency, recorder, deadline, cancel).await;
        info!(
            success = !stats.is_failure(),
            connection_drop = stats.is_connection_drop(),
            client_interrupt = stats.is_client_interrupt(),
            did_sleep = stats.did_sleep(),
            duration_ms = stats.resume_duration().as_millis() as u64,
            high_res_duration_ms = ?stats.resume_duration_high_res().map(|d| d.as_millis()),
            "resume measured"
        );

        report_metrics(config, &target, &stats, recorder.as_ref(), cancel).await;
    }
}

async fn stay_idle(idle_seconds: u64, cancel: &CancellationToken) {
    for i in 0..idle_seconds {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = sleep(Duration::from_secs(1)) => {}
        }
        if (i + 1) % 30 == 0 {
            info!(elapsed_seconds = i + 1, "letting the database idle");
        }
    }
}

/// Hands the measurement to the remote-write receiver. Publishing is
/// wrapped in the infinite retry executor: a receiver that is briefly
/// down must not lose the sample, and only a shutdown stops the
/// attempts.
async fn report_metrics(
    config: &Config,
    target: &DatabaseTarget,
    stats: &ResumeStats,
    recorder: &dyn FailureRecorder,
    cancel: &CancellationToken,
) {
    let series = create_resume_metrics(stats, &target.host);
    let remote_write = &config.remote_write;

    let posted = retry_until_success("push resume metrics", recorder, cancel, || {
        send_remote_write(
            &remote_write.endpoint,
            remote_write.tenant.as_deref(),
            series.clone(),
        )
    })
    .await;

    if posted.is_some() {
        info!(endpoint = %remote_write.endpoint, "posted resume metrics");
    }
}
