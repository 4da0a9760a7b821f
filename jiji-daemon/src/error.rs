//! Error kinds (spec.md §7). Each component returns the kind relevant to
//! its own failure modes rather than funnelling everything through one
//! enum.

use thiserror::Error;

/// Fatal: missing or invalid environment at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Parse(#[from] clap::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// The store's transactional HTTP endpoint failed or returned a non-2xx
/// status.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("store transaction request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("store transaction returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// The store's CLI query failed or returned a shape the reader couldn't
/// parse.
#[derive(Debug, Error)]
pub enum StoreQueryError {
    #[error("store query process failed: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("store query exited with status {status}: {stderr}")]
    NonZeroExit { status: i32, stderr: String },
}

/// A `wg` invocation failed.
#[derive(Debug, Error)]
#[error("mesh control command failed: {stderr}")]
pub struct MeshError {
    pub stderr: String,
}

/// A liveness or TCP probe failed or was aborted.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("process liveness probe failed: {0}")]
    Liveness(#[source] std::io::Error),
    #[error("tcp probe failed: {0}")]
    Tcp(#[source] std::io::Error),
    #[error("tcp probe timed out")]
    Timeout,
}

/// A store-sourced string failed its validator. The specific operation is
/// skipped with a warning; this is never propagated as a tick failure.
#[derive(Debug, Error)]
#[error("validation failed for {field}: {value:?}")]
pub struct ValidationError {
    pub field: &'static str,
    pub value: String,
}
