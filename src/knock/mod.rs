pub mod race;
pub mod runner;
pub mod sql;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Coordinates of the database under test.
#[derive(Debug, Clone)]
pub struct DatabaseTarget {
    /// Engine identifier, doubles as the connection URL scheme
    /// ("mysql" or "postgres").
    pub engine: String,
    pub host: String,
    pub port: u16,
    /// Logical database name; engines accept a connection without one.
    pub database: Option<String>,
    pub username: String,
    pub password: String,
}

/// Per-attempt timing of a door-knock loop. The attempt timeout is also
/// the pacing mechanism: the loop never sleeps between attempts.
#[derive(Debug, Clone, Copy)]
pub struct KnockCadence {
    pub attempt_timeout: Duration,
}

impl KnockCadence {
    /// Long per-attempt timeout matching normal application reconnect
    /// behavior; yields the realistic client-observed resume time.
    pub fn standard() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(45),
        }
    }

    /// Short per-attempt timeout to get many samples per second, for a
    /// tight bound on the moment the endpoint becomes reachable.
    pub fn high_frequency() -> Self {
        Self {
            attempt_timeout: Duration::from_millis(500),
        }
    }
}

/// A failed door-knock attempt. Never fatal to a runner; recorded for
/// diagnostics and retried until the run deadline.
#[derive(Debug, Error)]
pub enum KnockError {
    #[error("connect attempt timed out after {0:?}")]
    Timeout(Duration),
    #[error("{message}")]
    Transport { message: String },
}

impl From<sqlx::Error> for KnockError {
    fn from(e: sqlx::Error) -> Self {
        let message = match e.as_database_error() {
            Some(db) => match db.code() {
                Some(code) => format!("{} (code: {code})", db.message()),
                None => db.message().to_string(),
            },
            None => e.to_string(),
        };
        KnockError::Transport { message }
    }
}

/// One-shot "is the endpoint reachable and query-able" check. A single
/// attempt only; looping, deadlines and retries belong to the caller.
#[async_trait]
pub trait DatabaseKnock: Send + Sync {
    async fn knock(&self) -> Result<(), KnockError>;
}
