use serde::Deserialize;

/// Top-level configuration for the resume canary, loaded from YAML.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// The database under test and the measurement cadence.
    pub canary: CanaryConfig,

    /// Where captured failure records go.
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Prometheus remote-write receiver for the resume metrics.
    #[serde(default)]
    pub remote_write: RemoteWriteConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CanaryConfig {
    /// Hostname of the database endpoint to knock on.
    pub endpoint: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Engine identifier; also the connection URL scheme.
    #[serde(default = "default_engine")]
    pub engine: String,

    /// Logical database name. Optional; engines accept a connection
    /// without one.
    #[serde(default)]
    pub database: Option<String>,

    pub username: String,

    /// Usually left empty here and supplied via the CANARY_PASSWORD
    /// environment variable instead.
    #[serde(default)]
    pub password: String,

    /// How long the database is left idle so it can pause itself.
    #[serde(default = "default_idle_seconds")]
    pub idle_seconds: u64,

    /// Overall deadline for one resume measurement, in milliseconds.
    #[serde(default = "default_max_resume_wait_millis")]
    pub max_resume_wait_millis: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_capture_dir")]
    pub dir: String,

    #[serde(default = "default_retention_cap")]
    pub retention_cap: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            dir: default_capture_dir(),
            retention_cap: default_retention_cap(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteWriteConfig {
    #[serde(default = "default_remote_write_endpoint")]
    pub endpoint: String,

    /// Translates to the 'X-Scope-OrgID' header for multi-tenant
    /// receivers.
    #[serde(default)]
    pub tenant: Option<String>,
}

impl Default for RemoteWriteConfig {
    fn default() -> Self {
        Self {
            endpoint: default_remote_write_endpoint(),
            tenant: None,
        }
    }
}

fn default_port() -> u16 {
    3306
}

fn default_engine() -> String {
    "mysql".to_string()
}

fn default_idle_seconds() -> u64 {
    360
}

fn default_max_resume_wait_millis() -> u64 {
    90_000
}

fn default_capture_dir() -> String {
    "captured-failures".to_string()
}

fn default_retention_cap() -> usize {
    100
}

fn default_remote_write_endpoint() -> String {
    "http://localhost:9009".to_string()
}
