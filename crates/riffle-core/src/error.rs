use thiserror::Error;

/// Canonical result for the compiler.
pub type Result<T> = std::result::Result<T, Error>;

/// The single compiler error kind. All fatal conditions surface through one
/// of these variants; the message carries the wrapped cause. The compiler
/// performs no retries on its own.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Empty plan: {0}")]
    EmptyPlan(String),

    #[error("Cluster information unavailable: {0}")]
    ClusterInfo(String),

    // Indicates a bug in the optimizer itself, never a user mistake.
    #[error("Internal compiler inconsistency: {0}")]
    Inconsistency(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Inconsistency(format!("plan serialization failed: {e}"))
    }
}
