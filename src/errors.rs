use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

/// Errors surfaced by the canary core. Probe attempt failures never end
/// up here; they are consumed by the runner loop and only recorded for
/// diagnostics.
#[derive(Debug, Error)]
pub enum CanaryError {
    /// A status wait did not complete in time. Aborts the current
    /// canary cycle; the outer loop starts the next one.
    #[error("operation [{label}] didn't complete for more than {elapsed:?}, aborting wait")]
    WaitTimeout { label: String, elapsed: Duration },

    #[error("cancelled by shutdown signal")]
    Cancelled,

    #[error("status accessor failed: {0}")]
    Status(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Sink for failure diagnostics. Injected into the retry executor and
/// the probe runners rather than reached through process-wide state,
/// so tests can substitute an in-memory recorder.
///
/// Recording must never fail the caller.
#[async_trait]
pub trait FailureRecorder: Send + Sync {
    async fn capture(&self, context: &str, detail: &str);
}

const RECORD_PREFIX: &str = "failure-";
const RECORD_SUFFIX: &str = ".txt";

/// File-backed record of failures, one file per distinct failure text.
///
/// An infinite retry loop hitting the same error produces the same hash
/// over and over, so repeated failures cost a single file no matter how
/// often they recur. The population is trimmed to `retention_cap`
/// before every write by deleting the first surplus entries in sorted
/// filename order.
///
/// Capturing never fails the caller: all I/O problems are logged and
/// swallowed. Concurrent writers to the same hash resolve as first
/// writer wins; the check-then-write race is tolerated.
#[derive(Debug, Clone)]
pub struct ErrorCapture {
    dir: Arc<PathBuf>,
    retention_cap: usize,
}

impl ErrorCapture {
    pub fn new(dir: impl Into<PathBuf>, retention_cap: usize) -> Self {
        Self {
            dir: Arc::new(dir.into()),
            retention_cap,
        }
    }

    /// Records a failure under its content hash. `context` says what
    /// was being attempted; `detail` is the full diagnostic text and is
    /// what the hash is computed over.
    pub async fn capture(&self, context: &str, detail: &str) {
        if let Err(e) = self.try_capture(context, detail).await {
            warn!(error = %e, "failed to persist failure record");
        }
    }

    async fn try_capture(&self, context: &str, detail: &str) -> std::io::Result<()> {
        fs::create_dir_all(self.dir.as_ref()).await?;
        self.trim_to_cap().await?;

        let hash = short_hash(detail);
        let path = self.dir.join(format!("{RECORD_PREFIX}{hash}{RECORD_SUFFIX}"));
        if fs::try_exists(&path).await? {
            debug!(%hash, "not capturing failure to a file, already exists");
            return Ok(());
        }

        let body = format!("{} | {}\n{}\n", Utc::now().to_rfc3339(), context, detail);
        fs::write(&path, body).await
    }

    /// Deletes the oldest surplus records so that one more write stays
    /// within the retention cap. "Oldest" means first in sorted
    /// filename order, which is stable across restarts, unlike mtime.
    async fn trim_to_cap(&self) -> std::io::Result<()> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(self.dir.as_ref()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(RECORD_PREFIX) && name.ends_with(RECORD_SUFFIX) {
                names.push(name);
            }
        }

        let surplus = (names.len() + 1).saturating_sub(self.retention_cap);
        if surplus == 0 {
            return Ok(());
        }

        names.sort_unstable();
        for name in names.into_iter().take(surplus) {
            debug!(record = %name, "dropping old failure record over retention cap");
            fs::remove_file(self.dir.join(name)).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl FailureRecorder for ErrorCapture {
    async fn capture(&self, context: &str, detail: &str) {
        ErrorCapture::capture(self, context, detail).await
    }
}

/// Short fixed-width content key: first four bytes of the SHA-256
/// digest as uppercase hex.
fn short_hash(detail: &str) -> String {
    let digest = Sha256::digest(detail.as_bytes());
    digest[..4].iter().map(|b| format!("{b:02X}")).collect()
}
